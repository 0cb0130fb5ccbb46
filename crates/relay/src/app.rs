//! Component wiring shared by the server and the CLI.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Notifier, SeverityRouter, TelegramChannel};
use oncall::{
    CallAttemptController, EscalationScheduler, FileScheduleStore, InMemoryCallState,
    QuickCallClient, SystemClock,
};
use tracing::info;

use crate::commands::CommandHandler;
use crate::config::Config;
use crate::dispatch::AlertDispatcher;
use crate::server::AppState;
use crate::worker::AlertSink;

/// Fully wired relay components.
pub struct Relay {
    pub scheduler: Arc<EscalationScheduler>,
    pub telegram: Arc<TelegramChannel>,
    pub dispatcher: Arc<AlertDispatcher>,
    pub commands: Arc<CommandHandler>,
}

impl Relay {
    /// Build every component from `config`.
    ///
    /// Phone escalation is enabled only when call credentials are present.
    pub fn from_config(config: &Config) -> Result<Self> {
        let zone = config.reference_zone();

        let scheduler = Arc::new(EscalationScheduler::new(
            Arc::new(FileScheduleStore::new(&config.schedule_path)),
            Arc::new(InMemoryCallState::new()),
            Arc::new(SystemClock),
            config.scheduler_config(),
        ));

        let telegram = Arc::new(TelegramChannel::new(
            config.telegram.bot_token.clone().unwrap_or_default(),
        ));
        let router = SeverityRouter::with_optional(
            config.telegram.warning_chat_id,
            config.telegram.critical_chat_id,
        );
        let notifier = Arc::new(Notifier::new(telegram.clone(), router));

        let escalation = match (&config.call.api_token, &config.call.client_id) {
            (Some(token), Some(client_id)) => {
                let client = QuickCallClient::new(
                    &config.call.api_url,
                    token.clone(),
                    client_id.clone(),
                    Duration::from_secs(config.call.timeout_secs),
                )
                .context("Failed to create quick-call client")?;
                info!(api_url = %config.call.api_url, "Phone escalation enabled");
                Some(Arc::new(CallAttemptController::new(
                    scheduler.clone(),
                    Arc::new(client),
                    config.controller_config(),
                )))
            }
            _ => {
                info!("No CALL_API_TOKEN/CALL_CLIENT_ID configured - phone escalation disabled");
                None
            }
        };

        let dispatcher = Arc::new(AlertDispatcher::new(notifier, escalation, zone.clone()));
        let commands = Arc::new(CommandHandler::new(scheduler.clone(), zone));

        Ok(Self {
            scheduler,
            telegram,
            dispatcher,
            commands,
        })
    }

    /// HTTP state feeding alert batches into `sink`.
    pub fn app_state(&self, sink: AlertSink) -> AppState {
        AppState {
            sink,
            scheduler: self.scheduler.clone(),
            commands: self.commands.clone(),
        }
    }
}
