//! Configuration for the alert relay.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use oncall::{ControllerConfig, SchedulerConfig, MOSCOW_UTC_OFFSET_HOURS};

use crate::format::ReferenceZone;

/// Default quick-call API host.
pub const DEFAULT_CALL_API_URL: &str = "https://restapi.plusofon.ru";

/// Alert relay configuration.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Schedule JSON file.
    pub schedule_path: PathBuf,
    /// Worker tasks; 0 processes batches inline.
    pub workers: usize,
    /// Batches buffered ahead of the workers.
    pub queue_capacity: usize,
    /// Default mute length in minutes.
    pub mute_minutes: i64,
    /// Reference timezone offset in whole hours.
    pub utc_offset_hours: i32,
    /// Emit JSON log lines.
    pub json_logs: bool,
    pub telegram: TelegramConfig,
    pub call: CallConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: env::var("RELAY_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8082),
            schedule_path: env::var("RELAY_SCHEDULE_PATH")
                .ok()
                .filter(|s| !s.is_empty())
                .map_or_else(|| PathBuf::from("config/schedule.json"), PathBuf::from),
            workers: env::var("RELAY_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            queue_capacity: env::var("RELAY_QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            mute_minutes: env::var("RELAY_MUTE_MINUTES")
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .filter(|m| *m > 0)
                .unwrap_or(120),
            utc_offset_hours: env::var("RELAY_UTC_OFFSET_HOURS")
                .ok()
                .and_then(|s| s.parse::<i32>().ok())
                .filter(|h| (-23..=23).contains(h))
                .unwrap_or(MOSCOW_UTC_OFFSET_HOURS),
            json_logs: env::var("RELAY_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")),
            telegram: TelegramConfig::default(),
            call: CallConfig::default(),
        }
    }
}

impl Config {
    /// Reference timezone for schedules and messages.
    pub fn reference_zone(&self) -> ReferenceZone {
        ReferenceZone::from_hours(self.utc_offset_hours).unwrap_or_default()
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            reference_offset: self.reference_zone().offset(),
            default_mute: chrono::Duration::minutes(self.mute_minutes),
            ..SchedulerConfig::default()
        }
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            line_number: self.call.line_number.clone(),
            sip_id: self.call.sip_id.clone(),
            max_attempts: self.call.max_attempts,
            retry_delay: Duration::from_secs(self.call.retry_delay_secs),
        }
    }
}

/// Telegram delivery and bot settings.
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot API token; messages are dropped without one.
    pub bot_token: Option<String>,
    /// Chat receiving `Warning` alerts.
    pub warning_chat_id: Option<i64>,
    /// Chat receiving `Critical` alerts.
    pub critical_chat_id: Option<i64>,
    /// Whether to long-poll the bot for operator commands.
    pub commands_enabled: bool,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: env::var("TELEGRAM_BOT_TOKEN").ok().filter(|s| !s.is_empty()),
            warning_chat_id: env::var("TELEGRAM_WARNING_CHAT_ID")
                .ok()
                .and_then(|s| s.trim().parse().ok()),
            critical_chat_id: env::var("TELEGRAM_CRITICAL_CHAT_ID")
                .ok()
                .and_then(|s| s.trim().parse().ok()),
            commands_enabled: env::var("TELEGRAM_COMMANDS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

impl TelegramConfig {
    /// Chats allowed to issue bot commands.
    pub fn command_chats(&self) -> Vec<i64> {
        self.warning_chat_id
            .into_iter()
            .chain(self.critical_chat_id)
            .collect()
    }
}

/// Quick-call provider settings.
#[derive(Clone)]
pub struct CallConfig {
    /// Provider base URL.
    pub api_url: String,
    /// Bearer token.
    pub api_token: Option<String>,
    /// Value of the `Client` header.
    pub client_id: Option<String>,
    /// Outgoing line number sent with every call.
    pub line_number: String,
    /// SIP account sent with every call.
    pub sip_id: String,
    /// Attempts per responder before rotating.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub retry_delay_secs: u64,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            api_url: env::var("CALL_API_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_CALL_API_URL.to_string()),
            api_token: env::var("CALL_API_TOKEN").ok().filter(|s| !s.is_empty()),
            client_id: env::var("CALL_CLIENT_ID").ok().filter(|s| !s.is_empty()),
            line_number: env::var("CALL_LINE_NUMBER").unwrap_or_default(),
            sip_id: env::var("CALL_SIP_ID").unwrap_or_default(),
            max_attempts: env::var("CALL_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(oncall::DEFAULT_MAX_ATTEMPTS),
            retry_delay_secs: env::var("CALL_RETRY_DELAY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            timeout_secs: env::var("CALL_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(30),
        }
    }
}

impl CallConfig {
    /// Whether credentials for placing calls are present.
    pub fn is_configured(&self) -> bool {
        self.api_token.is_some() && self.client_id.is_some()
    }
}
