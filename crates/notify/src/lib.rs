//! Chat notifications for the alert relay.
//!
//! This crate delivers formatted alert text to a chat destination chosen by
//! the alert's severity label.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use notify::{Notifier, SeverityRouter, TelegramChannel};
//!
//! # async fn example() -> Result<(), notify::ChannelError> {
//! let channel = TelegramChannel::new("123456:bot-token");
//! let notifier = Notifier::new(Arc::new(channel), SeverityRouter::new(-1001, -1002));
//!
//! notifier.deliver("Critical", "❗️ FIRING\n🔔 Summary: disk full").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`NotifyChannel`] trait defines the interface for chat channels
//! - [`TelegramChannel`] implements the Telegram Bot API
//! - [`SeverityRouter`] maps `Warning`/`Critical` to destination chats
//! - [`Notifier`] combines the two

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod channels;
pub mod error;
pub mod severity;

pub use channels::telegram::{split_message, TelegramChannel, Update, MAX_MESSAGE_LENGTH};
pub use channels::NotifyChannel;
pub use error::ChannelError;
pub use severity::{Severity, SeverityRouter};

use std::sync::Arc;
use tracing::{debug, info};

/// Routes text to the chat configured for its severity.
pub struct Notifier {
    channel: Arc<dyn NotifyChannel>,
    router: SeverityRouter,
    disabled: bool,
}

impl Notifier {
    /// Create a notifier over a channel and a routing table.
    #[must_use]
    pub fn new(channel: Arc<dyn NotifyChannel>, router: SeverityRouter) -> Self {
        let disabled = !channel.enabled();
        if disabled {
            info!(
                channel = channel.name(),
                "Notification channel not configured, messages will be dropped"
            );
        }

        Self {
            channel,
            router,
            disabled,
        }
    }

    /// Check if messages will actually be sent.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    /// Send `text` to the chat selected by `severity`.
    ///
    /// Resolves the destination first so routing errors surface even when the
    /// channel is disabled.
    pub async fn deliver(&self, severity: &str, text: &str) -> Result<(), ChannelError> {
        let chat_id = self.router.chat_for(severity)?;

        if self.disabled {
            debug!(chat_id, "Notifications disabled, skipping message");
            return Ok(());
        }

        self.channel.send(chat_id, text).await
    }
}
