//! Telegram bot command loop.
//!
//! Long-polls `getUpdates` and answers operator commands in the chat they came
//! from. Messages from chats outside the allow-list are ignored.

use std::sync::Arc;
use std::time::Duration;

use notify::{NotifyChannel, TelegramChannel, Update};
use tracing::{debug, info, warn};

use crate::commands::CommandHandler;

/// Long-poll timeout passed to `getUpdates`.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Pause after a failed poll.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Bot that turns chat messages into operator commands.
pub struct CommandBot {
    channel: Arc<TelegramChannel>,
    commands: Arc<CommandHandler>,
    allowed_chats: Vec<i64>,
    offset: i64,
}

impl CommandBot {
    pub fn new(
        channel: Arc<TelegramChannel>,
        commands: Arc<CommandHandler>,
        allowed_chats: Vec<i64>,
    ) -> Self {
        Self {
            channel,
            commands,
            allowed_chats,
            offset: 0,
        }
    }

    /// Poll forever.
    pub async fn run(mut self) {
        info!(chats = ?self.allowed_chats, "Telegram command bot started");
        loop {
            if let Err(e) = self.poll_once(POLL_TIMEOUT_SECS).await {
                warn!(error = %e, "Telegram poll failed, backing off");
                tokio::time::sleep(ERROR_BACKOFF).await;
            }
        }
    }

    /// Fetch one batch of updates and answer each. Returns how many commands ran.
    pub async fn poll_once(&mut self, timeout_secs: u64) -> Result<usize, notify::ChannelError> {
        let updates = self.channel.get_updates(self.offset, timeout_secs).await?;

        let mut handled = 0;
        for update in updates {
            self.offset = self.offset.max(update.update_id + 1);
            if self.handle_update(update).await {
                handled += 1;
            }
        }
        Ok(handled)
    }

    /// Next `getUpdates` offset.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    async fn handle_update(&self, update: Update) -> bool {
        let Some(message) = update.message else {
            return false;
        };
        let Some(text) = message.text.filter(|t| !t.trim().is_empty()) else {
            return false;
        };

        let chat_id = message.chat.id;
        if !self.allowed_chats.contains(&chat_id) {
            debug!(chat_id, "Ignoring message from chat outside the allow-list");
            return false;
        }

        let reply = self.commands.handle(&text).await;
        if let Err(e) = self.channel.send(chat_id, &reply.reply).await {
            warn!(chat_id, error = %e, "Failed to send command reply");
        }
        true
    }
}
