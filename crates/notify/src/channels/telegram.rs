//! Telegram Bot API notification channel.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ChannelError;
use crate::NotifyChannel;

/// Default Bot API endpoint.
const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Telegram rejects messages longer than this many bytes.
pub const MAX_MESSAGE_LENGTH: usize = 4096;

/// Telegram Bot API channel.
#[derive(Debug, Clone)]
pub struct TelegramChannel {
    token: Option<String>,
    api_url: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    /// Create a Telegram channel for the given bot token.
    ///
    /// An empty token yields a disabled channel.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        let token = Some(token.into()).filter(|t| !t.is_empty());
        if token.is_none() {
            debug!("Telegram notifications disabled (empty bot token)");
        }

        Self {
            token,
            api_url: DEFAULT_API_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the channel at a different Bot API host.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    fn method_url(&self, method: &str) -> Result<String, ChannelError> {
        let token = self
            .token
            .as_ref()
            .ok_or_else(|| ChannelError::NotConfigured("TELEGRAM_BOT_TOKEN".to_string()))?;
        Ok(format!("{}/bot{token}/{method}", self.api_url))
    }

    /// Long-poll the Bot API for new updates.
    ///
    /// `offset` should be one past the last processed `update_id`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, ChannelError> {
        let url = self.method_url("getUpdates")?;
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout_secs,
            allowed_updates: &["message"],
        };

        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(timeout_secs + 10))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ChannelError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ApiResponse<Vec<Update>> = serde_json::from_str(&body)?;
        if !parsed.ok {
            return Err(ChannelError::Api {
                status: status.as_u16(),
                body: parsed.description.unwrap_or_default(),
            });
        }

        Ok(parsed.result.unwrap_or_default())
    }

    async fn send_chunk(&self, url: &str, chat_id: i64, text: &str) -> Result<(), ChannelError> {
        let payload = SendMessageRequest { chat_id, text };
        let response = self.client.post(url).json(&payload).send().await?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        warn!(
            channel = "telegram",
            status = %status,
            body = %body,
            "Telegram sendMessage request failed"
        );

        Err(ChannelError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl NotifyChannel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    fn enabled(&self) -> bool {
        self.token.is_some()
    }

    async fn send(&self, chat_id: i64, text: &str) -> Result<(), ChannelError> {
        let url = self.method_url("sendMessage")?;
        let chunks = split_message(text, MAX_MESSAGE_LENGTH);

        debug!(
            channel = "telegram",
            chat_id,
            chunks = chunks.len(),
            "Sending message"
        );

        for chunk in chunks {
            self.send_chunk(&url, chat_id, chunk).await?;
        }

        Ok(())
    }
}

/// Split a message into chunks of at most `limit` bytes.
///
/// Cuts at the last newline inside the limit; falls back to a hard cut on a
/// character boundary. Newlines at a cut are dropped from the next chunk, and
/// chunks left blank by long newline runs are skipped since the Bot API
/// rejects empty text.
#[must_use]
pub fn split_message(text: &str, limit: usize) -> Vec<&str> {
    if text.len() <= limit {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.len() > limit {
        let newline = rest.as_bytes()[..=limit]
            .iter()
            .rposition(|&b| b == b'\n')
            .filter(|&idx| idx > 0);

        let cut = newline.unwrap_or_else(|| {
            let mut cut = limit;
            while !rest.is_char_boundary(cut) {
                cut -= 1;
            }
            if cut == 0 {
                cut = rest.chars().next().map_or(rest.len(), char::len_utf8);
            }
            cut
        });

        let chunk = &rest[..cut];
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
        rest = rest[cut..].trim_start_matches('\n');
    }

    if !rest.trim().is_empty() {
        chunks.push(rest);
    }

    chunks
}

// =============================================================================
// Telegram API types
// =============================================================================

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

/// Incoming update from `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update identifier
    pub update_id: i64,
    /// New incoming message, if this update carries one
    #[serde(default)]
    pub message: Option<Message>,
}

/// Chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

/// Chat a message belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}
