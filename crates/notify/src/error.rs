//! Error types for the notification system.

use thiserror::Error;

/// Errors that can occur when sending notifications.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Channel is not configured
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Severity label has no destination chat
    #[error("unknown severity level: {0:?}")]
    UnknownSeverity(String),

    /// The chat API answered with an error
    #[error("chat API returned {status}: {body}")]
    Api { status: u16, body: String },
}
