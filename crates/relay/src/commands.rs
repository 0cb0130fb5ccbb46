//! Operator text commands.
//!
//! The same commands are accepted over the admin API, the Telegram bot and
//! the CLI:
//!
//! | Command | Effect |
//! |---|---|
//! | `set_schedule <start> <end> <number> [...]` | append one or more entries, all or nothing |
//! | `<number> - HH:MM-HH:MM` | append one entry |
//! | `mute [minutes]` | suppress calls |
//! | `unmute` | lift the mute |
//! | `schedule` | list entries |
//! | `status` | mute state and current responder |
//!
//! A leading `/` and a Telegram `@bot` suffix on the command word are ignored.

use std::sync::Arc;

use chrono::Duration;
use oncall::{EscalationError, EscalationScheduler};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::format::ReferenceZone;

/// Largest accepted mute, one week.
const MAX_MUTE_MINUTES: i64 = 7 * 24 * 60;

const USAGE: &str = "Commands:\n\
    set_schedule <HH:MM> <HH:MM> <number> [...]\n\
    <number> - HH:MM-HH:MM\n\
    mute [minutes]\n\
    unmute\n\
    schedule\n\
    status";

/// Parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Append `(start, end, number)` triples
    SetSchedule(Vec<(String, String, String)>),
    /// Mute for the given minutes, or the configured default
    Mute(Option<i64>),
    Unmute,
    Schedule,
    Status,
    Help,
}

/// Why a command could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command {0:?}")]
    Unknown(String),

    #[error("set_schedule takes <start> <end> <number> triples, got {0} argument(s)")]
    ArgumentCount(usize),

    #[error("invalid mute duration {0:?}, expected minutes between 1 and 10080")]
    InvalidMinutes(String),

    #[error("invalid format, use <number> - HH:MM-HH:MM")]
    InvalidEntryFormat,
}

impl Command {
    /// Parse command text.
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let text = text.trim();
        if text.contains(" - ") {
            return parse_entry_line(text);
        }

        let mut words = text.split_whitespace();
        let Some(head) = words.next() else {
            return Err(CommandError::Empty);
        };
        let args: Vec<&str> = words.collect();

        let name = head.trim_start_matches('/');
        let name = name.split_once('@').map_or(name, |(name, _bot)| name);

        match name.to_ascii_lowercase().as_str() {
            "set_schedule" => {
                if args.is_empty() || args.len() % 3 != 0 {
                    return Err(CommandError::ArgumentCount(args.len()));
                }
                let triples = args
                    .chunks_exact(3)
                    .map(|t| (t[0].to_string(), t[1].to_string(), t[2].to_string()))
                    .collect();
                Ok(Self::SetSchedule(triples))
            }
            "mute" => match args.as_slice() {
                [] => Ok(Self::Mute(None)),
                [minutes] => minutes
                    .parse::<i64>()
                    .ok()
                    .filter(|m| (1..=MAX_MUTE_MINUTES).contains(m))
                    .map(|m| Self::Mute(Some(m)))
                    .ok_or_else(|| CommandError::InvalidMinutes((*minutes).to_string())),
                _ => Err(CommandError::InvalidMinutes(args.join(" "))),
            },
            "unmute" => Ok(Self::Unmute),
            "schedule" => Ok(Self::Schedule),
            "status" => Ok(Self::Status),
            "help" | "start" => Ok(Self::Help),
            _ => Err(CommandError::Unknown(head.to_string())),
        }
    }
}

/// `+79990000001 - 09:00-17:00`
fn parse_entry_line(text: &str) -> Result<Command, CommandError> {
    let (number, range) = text
        .split_once(" - ")
        .ok_or(CommandError::InvalidEntryFormat)?;
    let (start, end) = range
        .trim()
        .split_once('-')
        .ok_or(CommandError::InvalidEntryFormat)?;

    let number = number.trim();
    if number.is_empty() || number.contains(char::is_whitespace) {
        return Err(CommandError::InvalidEntryFormat);
    }

    Ok(Command::SetSchedule(vec![(
        start.trim().to_string(),
        end.trim().to_string(),
        number.to_string(),
    )]))
}

/// Result of running a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandReply {
    pub ok: bool,
    pub reply: String,
}

impl CommandReply {
    fn ok(reply: impl Into<String>) -> Self {
        Self {
            ok: true,
            reply: reply.into(),
        }
    }

    fn error(reply: impl Into<String>) -> Self {
        Self {
            ok: false,
            reply: reply.into(),
        }
    }
}

/// Runs operator commands against the scheduler.
pub struct CommandHandler {
    scheduler: Arc<EscalationScheduler>,
    zone: ReferenceZone,
}

impl CommandHandler {
    pub fn new(scheduler: Arc<EscalationScheduler>, zone: ReferenceZone) -> Self {
        Self { scheduler, zone }
    }

    /// Parse and run `text`.
    pub async fn handle(&self, text: &str) -> CommandReply {
        match Command::parse(text) {
            Ok(command) => self.execute(command).await,
            Err(e) => {
                warn!(command = %text, error = %e, "Rejected operator command");
                CommandReply::error(format!("{e}\n\n{USAGE}"))
            }
        }
    }

    /// Run an already parsed command.
    pub async fn execute(&self, command: Command) -> CommandReply {
        info!(command = ?command, "Running operator command");

        let result = match command {
            Command::SetSchedule(triples) => self.set_schedule(&triples).await,
            Command::Mute(minutes) => self.mute(minutes).await,
            Command::Unmute => self
                .scheduler
                .unmute()
                .await
                .map(|()| "Calls unmuted.".to_string()),
            Command::Schedule => self.schedule().await,
            Command::Status => self.status().await,
            Command::Help => Ok(USAGE.to_string()),
        };

        match result {
            Ok(reply) => CommandReply::ok(reply),
            Err(e) => CommandReply::error(format!("Error: {e}")),
        }
    }

    async fn set_schedule(
        &self,
        triples: &[(String, String, String)],
    ) -> Result<String, EscalationError> {
        let borrowed: Vec<(&str, &str, &str)> = triples
            .iter()
            .map(|(s, e, n)| (s.as_str(), e.as_str(), n.as_str()))
            .collect();

        let added = self.scheduler.add_schedules(&borrowed).await?;
        Ok(match added.as_slice() {
            [entry] => format!(
                "Schedule saved: {}-{} {}",
                entry.start.format("%H:%M"),
                entry.end.format("%H:%M"),
                entry.responder
            ),
            entries => format!("Schedule saved: {} entries added.", entries.len()),
        })
    }

    async fn mute(&self, minutes: Option<i64>) -> Result<String, EscalationError> {
        let until = match minutes {
            Some(m) => self.scheduler.set_mute(Duration::minutes(m)).await?,
            None => self.scheduler.mute().await?,
        };
        Ok(format!("Calls muted until {}.", self.zone.render_clock(until)))
    }

    async fn schedule(&self) -> Result<String, EscalationError> {
        let entries = self.scheduler.list_schedule().await?;
        if entries.is_empty() {
            return Ok("Schedule is empty.".to_string());
        }

        let lines: Vec<String> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                format!(
                    "{}. {}-{} {}",
                    i + 1,
                    e.start.format("%H:%M"),
                    e.end.format("%H:%M"),
                    e.responder
                )
            })
            .collect();
        Ok(lines.join("\n"))
    }

    async fn status(&self) -> Result<String, EscalationError> {
        let mute = match self.scheduler.muted_until().await? {
            Some(until) => format!("Calls muted until {}.", self.zone.render_clock(until)),
            None => "Calls active.".to_string(),
        };

        let on_call = match self.scheduler.resolve_current_responder().await {
            Ok(number) => format!("On call: {number}"),
            Err(EscalationError::NoResponderFound) => "On call: nobody".to_string(),
            Err(e) => return Err(e),
        };

        Ok(format!("{mute}\n{on_call}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use oncall::{InMemoryCallState, ManualClock, MemoryScheduleStore, SchedulerConfig};

    fn triple(s: &str, e: &str, n: &str) -> (String, String, String) {
        (s.to_string(), e.to_string(), n.to_string())
    }

    fn handler() -> (CommandHandler, Arc<EscalationScheduler>) {
        // 18:00 Moscow time
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap());
        let scheduler = Arc::new(EscalationScheduler::new(
            Arc::new(MemoryScheduleStore::new()),
            Arc::new(InMemoryCallState::new()),
            Arc::new(clock),
            SchedulerConfig::default(),
        ));
        (
            CommandHandler::new(scheduler.clone(), ReferenceZone::default()),
            scheduler,
        )
    }

    #[test]
    fn test_parse_set_schedule_triples() {
        assert_eq!(
            Command::parse("/set_schedule 09:00 17:00 +1 17:00 23:00 +2").unwrap(),
            Command::SetSchedule(vec![
                triple("09:00", "17:00", "+1"),
                triple("17:00", "23:00", "+2")
            ])
        );
        assert_eq!(
            Command::parse("set_schedule@relay_bot 09:00 17:00 +1").unwrap(),
            Command::SetSchedule(vec![triple("09:00", "17:00", "+1")])
        );
    }

    #[test]
    fn test_parse_set_schedule_argument_count() {
        assert_eq!(
            Command::parse("set_schedule 09:00 17:00"),
            Err(CommandError::ArgumentCount(2))
        );
        assert_eq!(
            Command::parse("set_schedule"),
            Err(CommandError::ArgumentCount(0))
        );
    }

    #[test]
    fn test_parse_entry_line() {
        assert_eq!(
            Command::parse("+79990000001 - 09:00-17:00").unwrap(),
            Command::SetSchedule(vec![triple("09:00", "17:00", "+79990000001")])
        );
        assert_eq!(
            Command::parse("+7999 - 0900"),
            Err(CommandError::InvalidEntryFormat)
        );
    }

    #[test]
    fn test_parse_mute() {
        assert_eq!(Command::parse("mute").unwrap(), Command::Mute(None));
        assert_eq!(Command::parse("/mute 30").unwrap(), Command::Mute(Some(30)));
        assert!(matches!(
            Command::parse("mute soon"),
            Err(CommandError::InvalidMinutes(_))
        ));
        assert!(matches!(
            Command::parse("mute 0"),
            Err(CommandError::InvalidMinutes(_))
        ));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(Command::parse("   "), Err(CommandError::Empty));
        assert!(matches!(
            Command::parse("reboot now"),
            Err(CommandError::Unknown(_))
        ));
    }

    #[tokio::test]
    async fn test_set_schedule_and_list() {
        let (handler, _) = handler();

        let reply = handler
            .handle("set_schedule 09:00 17:00 +1 17:00 23:00 +2")
            .await;
        assert!(reply.ok, "{}", reply.reply);

        let reply = handler.handle("schedule").await;
        assert_eq!(reply.reply, "1. 09:00-17:00 +1\n2. 17:00-23:00 +2");
    }

    #[tokio::test]
    async fn test_bad_triple_leaves_schedule_unchanged() {
        let (handler, scheduler) = handler();

        let reply = handler
            .handle("set_schedule 09:00 17:00 +1 17:00 25:00 +2")
            .await;

        assert!(!reply.ok);
        assert!(reply.reply.contains("#2"), "{}", reply.reply);
        assert!(scheduler.list_schedule().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mute_and_status() {
        let (handler, scheduler) = handler();
        handler.handle("+1 - 17:00-23:00").await;

        let reply = handler.handle("status").await;
        assert_eq!(reply.reply, "Calls active.\nOn call: +1");

        let reply = handler.handle("mute 30").await;
        assert_eq!(reply.reply, "Calls muted until 18:30 MSK.");
        assert!(scheduler.is_muted().await.unwrap());

        let reply = handler.handle("status").await;
        assert_eq!(reply.reply, "Calls muted until 18:30 MSK.\nOn call: +1");

        handler.handle("unmute").await;
        assert!(!scheduler.is_muted().await.unwrap());
    }

    #[tokio::test]
    async fn test_default_mute_uses_scheduler_config() {
        let (handler, _) = handler();
        let reply = handler.handle("/mute").await;
        assert_eq!(reply.reply, "Calls muted until 20:00 MSK.");
    }

    #[tokio::test]
    async fn test_status_without_responder() {
        let (handler, _) = handler();
        let reply = handler.handle("status").await;
        assert!(reply.ok);
        assert!(reply.reply.ends_with("On call: nobody"));
    }

    #[tokio::test]
    async fn test_parse_error_includes_usage() {
        let (handler, _) = handler();
        let reply = handler.handle("hello").await;
        assert!(!reply.ok);
        assert!(reply.reply.contains("Commands:"));
    }
}
