//! Call attempt controller.
//!
//! Drives one escalation: pick the on-call responder, dial with bounded
//! retries, rotate to the next responder when retries run out.
//!
//! ```text
//! SELECT_RESPONDER -> DIAL -> {SUCCESS, RETRY, ROTATE} -> DIAL | TERMINAL_FAILURE | TERMINAL_SUCCESS
//! ```
//!
//! Total attempts are capped at `max_attempts x schedule length`, so a
//! schedule that lists the same number twice cannot rotate forever.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{EscalationError, EscalationResult};
use crate::scheduler::EscalationScheduler;
use crate::transport::{CallData, CallTransport};

/// Default attempts per responder before rotating.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Controller settings.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Line the calls are placed from
    pub line_number: String,
    /// SIP account placing the calls
    pub sip_id: String,
    /// Attempts per responder before rotating
    pub max_attempts: u32,
    /// Pause between consecutive attempts
    pub retry_delay: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            line_number: String::new(),
            sip_id: String::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::ZERO,
        }
    }
}

/// How an escalation ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationOutcome {
    /// A call to `number` was accepted after `attempts` total attempts
    Connected { number: String, attempts: u32 },
    /// Calls are muted; nothing was dialed
    Muted,
}

/// Places escalation calls with retry and rotation.
pub struct CallAttemptController {
    scheduler: Arc<EscalationScheduler>,
    transport: Arc<dyn CallTransport>,
    config: ControllerConfig,
}

impl CallAttemptController {
    pub fn new(
        scheduler: Arc<EscalationScheduler>,
        transport: Arc<dyn CallTransport>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            scheduler,
            transport,
            config,
        }
    }

    /// The scheduler this controller rotates through.
    pub fn scheduler(&self) -> &Arc<EscalationScheduler> {
        &self.scheduler
    }

    /// Run one escalation to completion.
    pub async fn escalate(&self) -> EscalationResult<EscalationOutcome> {
        let span = info_span!("escalation", id = %Uuid::new_v4());
        async {
            let result = self.run().await;
            match &result {
                Ok(EscalationOutcome::Connected { number, attempts }) => {
                    info!(number = %number, attempts, "Escalation call connected");
                }
                Ok(EscalationOutcome::Muted) => {}
                Err(e) => error!(error = %e, "Escalation failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self) -> EscalationResult<EscalationOutcome> {
        if self.scheduler.is_muted().await? {
            info!("Calls are muted, skipping escalation");
            return Ok(EscalationOutcome::Muted);
        }

        let mut number = self.scheduler.resolve_current_responder().await?;

        let max_attempts = self.config.max_attempts.max(1);
        let chain_len = self.scheduler.list_schedule().await?.len().max(1);
        let budget = max_attempts.saturating_mul(u32::try_from(chain_len).unwrap_or(u32::MAX));

        let mut total = 0u32;
        let mut attempts = 0u32;

        loop {
            if total >= budget {
                return Err(EscalationError::AttemptBudgetExhausted { attempts: total });
            }
            if total > 0 && !self.config.retry_delay.is_zero() {
                tokio::time::sleep(self.config.retry_delay).await;
            }

            total += 1;
            attempts += 1;

            let call = CallData {
                number: number.clone(),
                line_number: self.config.line_number.clone(),
                sip_id: self.config.sip_id.clone(),
            };

            match self.transport.place_call(&call).await {
                Ok(()) => {
                    self.scheduler.record_call_success(&number).await?;
                    return Ok(EscalationOutcome::Connected {
                        number,
                        attempts: total,
                    });
                }
                Err(e) => {
                    warn!(
                        number = %number,
                        attempt = attempts,
                        max_attempts,
                        error = %e,
                        "Call attempt failed"
                    );
                    self.scheduler.record_call_failure(&number, attempts).await?;

                    if attempts < max_attempts {
                        continue;
                    }

                    let next = self.scheduler.next_responder(&number).await?;
                    info!(from = %number, to = %next, "Rotating to next responder");
                    number = next;
                    attempts = 0;
                }
            }
        }
    }
}
