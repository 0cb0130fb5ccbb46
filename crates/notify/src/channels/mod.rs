//! Notification channel implementations.

pub mod telegram;

use async_trait::async_trait;

use crate::error::ChannelError;

/// Trait for chat channels that can deliver plain text to a destination.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Get the name of this channel.
    fn name(&self) -> &'static str;

    /// Check if this channel is enabled/configured.
    fn enabled(&self) -> bool;

    /// Send a text message to the given chat.
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), ChannelError>;
}
