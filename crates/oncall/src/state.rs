//! Process-wide call outcome and mute state.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::EscalationResult;

/// Call outcome bookkeeping for one responder number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CallAttemptState {
    /// When a call to this number was last accepted
    pub last_success_at: Option<DateTime<Utc>>,
    /// Failed attempts in the escalation currently dialing this number
    pub pending_attempts: u32,
}

/// Backend for call and mute state.
///
/// Implementations must be safe to share between concurrently running
/// escalations.
#[async_trait]
pub trait CallStateStore: Send + Sync {
    /// State for `number`; unknown numbers yield the default state.
    async fn get(&self, number: &str) -> EscalationResult<CallAttemptState>;

    /// Replace the state for `number`.
    async fn set(&self, number: &str, state: CallAttemptState) -> EscalationResult<()>;

    /// Store the pending attempt count for `number` in one atomic step,
    /// leaving its success stamp untouched.
    async fn set_pending_attempts(&self, number: &str, attempts: u32) -> EscalationResult<()>;

    /// Current mute deadline, if any.
    async fn mute_until(&self) -> EscalationResult<Option<DateTime<Utc>>>;

    /// Set or clear the mute deadline.
    async fn set_mute_until(&self, until: Option<DateTime<Utc>>) -> EscalationResult<()>;
}

/// In-memory state store. Entries are never evicted.
#[derive(Debug, Default)]
pub struct InMemoryCallState {
    calls: RwLock<HashMap<String, CallAttemptState>>,
    mute_until: RwLock<Option<DateTime<Utc>>>,
}

impl InMemoryCallState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CallStateStore for InMemoryCallState {
    async fn get(&self, number: &str) -> EscalationResult<CallAttemptState> {
        Ok(self
            .calls
            .read()
            .await
            .get(number)
            .copied()
            .unwrap_or_default())
    }

    async fn set(&self, number: &str, state: CallAttemptState) -> EscalationResult<()> {
        self.calls.write().await.insert(number.to_string(), state);
        Ok(())
    }

    async fn set_pending_attempts(&self, number: &str, attempts: u32) -> EscalationResult<()> {
        self.calls
            .write()
            .await
            .entry(number.to_string())
            .or_default()
            .pending_attempts = attempts;
        Ok(())
    }

    async fn mute_until(&self) -> EscalationResult<Option<DateTime<Utc>>> {
        Ok(*self.mute_until.read().await)
    }

    async fn set_mute_until(&self, until: Option<DateTime<Utc>>) -> EscalationResult<()> {
        *self.mute_until.write().await = until;
        Ok(())
    }
}
