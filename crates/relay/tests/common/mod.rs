//! Shared fixtures for relay integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use notify::{ChannelError, Notifier, NotifyChannel, SeverityRouter};
use oncall::{
    CallAttemptController, CallData, CallError, CallTransport, ControllerConfig,
    EscalationScheduler, InMemoryCallState, ManualClock, MemoryScheduleStore, ScheduleEntry,
    SchedulerConfig,
};
use relay::{Alert, AlertDispatcher, CommandHandler, ReferenceZone};
use serde_json::{json, Value};

pub const WARNING_CHAT: i64 = -100;
pub const CRITICAL_CHAT: i64 = -200;

/// 18:00 Moscow time.
pub fn evening() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap()
}

/// Channel that records every message.
#[derive(Default)]
pub struct RecordingChannel {
    pub sent: Mutex<Vec<(i64, String)>>,
    pub fail: bool,
}

impl RecordingChannel {
    pub fn messages(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotifyChannel for RecordingChannel {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn enabled(&self) -> bool {
        true
    }

    async fn send(&self, chat_id: i64, text: &str) -> Result<(), ChannelError> {
        if self.fail {
            return Err(ChannelError::Api {
                status: 502,
                body: "channel down".to_string(),
            });
        }
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }
}

/// Transport that records dialed numbers and answers only `answering` numbers.
#[derive(Default)]
pub struct ScriptedTransport {
    pub answering: Vec<String>,
    pub dialed: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn answering(numbers: &[&str]) -> Self {
        Self {
            answering: numbers.iter().map(ToString::to_string).collect(),
            dialed: Mutex::new(Vec::new()),
        }
    }

    pub fn dialed(&self) -> Vec<String> {
        self.dialed.lock().unwrap().clone()
    }
}

#[async_trait]
impl CallTransport for ScriptedTransport {
    async fn place_call(&self, call: &CallData) -> Result<(), CallError> {
        self.dialed.lock().unwrap().push(call.number.clone());
        if self.answering.contains(&call.number) {
            Ok(())
        } else {
            Err(CallError::Rejected {
                status: 500,
                body: "no answer".to_string(),
            })
        }
    }
}

/// Everything a dispatcher test needs.
pub struct Fixture {
    pub channel: Arc<RecordingChannel>,
    pub transport: Arc<ScriptedTransport>,
    pub clock: Arc<ManualClock>,
    pub scheduler: Arc<EscalationScheduler>,
    pub dispatcher: Arc<AlertDispatcher>,
    pub commands: Arc<CommandHandler>,
}

impl Fixture {
    pub fn new(schedule: &[(&str, &str, &str)], transport: ScriptedTransport) -> Self {
        Self::with_channel(schedule, transport, RecordingChannel::default())
    }

    pub fn with_channel(
        schedule: &[(&str, &str, &str)],
        transport: ScriptedTransport,
        channel: RecordingChannel,
    ) -> Self {
        let entries = schedule
            .iter()
            .map(|(s, e, n)| ScheduleEntry::parse(s, e, n).unwrap())
            .collect();

        let clock = Arc::new(ManualClock::new(evening()));
        let scheduler = Arc::new(EscalationScheduler::new(
            Arc::new(MemoryScheduleStore::with_entries(entries)),
            Arc::new(InMemoryCallState::new()),
            clock.clone(),
            SchedulerConfig::default(),
        ));

        let channel = Arc::new(channel);
        let transport = Arc::new(transport);

        let notifier = Arc::new(Notifier::new(
            channel.clone(),
            SeverityRouter::new(WARNING_CHAT, CRITICAL_CHAT),
        ));
        let controller = Arc::new(CallAttemptController::new(
            scheduler.clone(),
            transport.clone(),
            ControllerConfig::default(),
        ));
        let dispatcher = Arc::new(AlertDispatcher::new(
            notifier,
            Some(controller),
            ReferenceZone::default(),
        ));
        let commands = Arc::new(CommandHandler::new(
            scheduler.clone(),
            ReferenceZone::default(),
        ));

        Self {
            channel,
            transport,
            clock,
            scheduler,
            dispatcher,
            commands,
        }
    }
}

/// Alertmanager-shaped alert JSON.
pub fn alert_json(status: &str, severity: &str, group: &str, summary: &str) -> Value {
    json!({
        "status": status,
        "labels": {
            "alertname": summary,
            "severity": severity,
            "alertgroup": group
        },
        "annotations": {
            "summary": summary,
            "description": format!("{summary} details")
        },
        "startsAt": "2024-05-01T15:00:00Z",
        "endsAt": if status == "resolved" { "2024-05-01T15:10:00Z" } else { "0001-01-01T00:00:00Z" }
    })
}

pub fn alert(status: &str, severity: &str, group: &str, summary: &str) -> Alert {
    serde_json::from_value(alert_json(status, severity, group, summary)).unwrap()
}
