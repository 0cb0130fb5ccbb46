//! Escalation scheduler: who is on call now, and who is next.

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{EscalationError, EscalationResult};
use crate::schedule::ScheduleEntry;
use crate::state::{CallAttemptState, CallStateStore};
use crate::store::ScheduleStore;

/// Offset of the default reference timezone (Moscow, no DST).
pub const MOSCOW_UTC_OFFSET_HOURS: i32 = 3;

/// Build a fixed offset from whole hours.
#[must_use]
pub fn utc_offset_hours(hours: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(hours * 3600)
}

/// Scheduler tuning.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Timezone all schedule windows are expressed in
    pub reference_offset: FixedOffset,
    /// How long a successful call keeps its responder out of lookup
    pub success_window: Duration,
    /// Mute length used by [`EscalationScheduler::mute`]
    pub default_mute: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reference_offset: utc_offset_hours(MOSCOW_UTC_OFFSET_HOURS)
                .unwrap_or_else(|| Utc.fix()),
            success_window: Duration::hours(1),
            default_mute: Duration::hours(2),
        }
    }
}

/// Resolves the current responder and the rotation order.
pub struct EscalationScheduler {
    store: Arc<dyn ScheduleStore>,
    state: Arc<dyn CallStateStore>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    /// Serializes load-modify-save cycles on the store
    write_lock: Mutex<()>,
}

impl EscalationScheduler {
    /// Create a scheduler over the given stores.
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        state: Arc<dyn CallStateStore>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            state,
            clock,
            config,
            write_lock: Mutex::new(()),
        }
    }

    /// Scheduler configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Current time in the reference timezone.
    pub fn local_now(&self) -> DateTime<FixedOffset> {
        self.clock.now().with_timezone(&self.config.reference_offset)
    }

    /// Validate and append one entry.
    pub async fn add_schedule(
        &self,
        start: &str,
        end: &str,
        number: &str,
    ) -> EscalationResult<ScheduleEntry> {
        info!(start, end, number, "Adding schedule");

        let entry = ScheduleEntry::parse(start, end, number).inspect_err(|e| {
            warn!(start, end, number, error = %e, "Rejected schedule entry");
        })?;

        self.append(std::slice::from_ref(&entry)).await?;
        Ok(entry)
    }

    /// Validate every `(start, end, number)` triple, then append them all.
    ///
    /// The first invalid triple aborts the batch and nothing is saved.
    pub async fn add_schedules(
        &self,
        triples: &[(&str, &str, &str)],
    ) -> EscalationResult<Vec<ScheduleEntry>> {
        let entries = triples
            .iter()
            .enumerate()
            .map(|(i, (start, end, number))| {
                ScheduleEntry::parse(start, end, number).map_err(|e| {
                    EscalationError::InvalidEntry {
                        index: i + 1,
                        source: Box::new(e),
                    }
                })
            })
            .collect::<EscalationResult<Vec<_>>>()
            .inspect_err(|e| warn!(error = %e, "Rejected schedule batch"))?;

        self.append(&entries).await?;
        info!(count = entries.len(), "Schedule entries added");
        Ok(entries)
    }

    async fn append(&self, entries: &[ScheduleEntry]) -> EscalationResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut schedule = self.store.load().await?;
        schedule.extend_from_slice(entries);
        self.store.save(&schedule).await
    }

    /// All entries in rotation order.
    pub async fn list_schedule(&self) -> EscalationResult<Vec<ScheduleEntry>> {
        self.store.load().await
    }

    /// First responder whose window strictly contains the current minute and
    /// who has not answered a call within the success window.
    pub async fn resolve_current_responder(&self) -> EscalationResult<String> {
        let schedule = self.store.load().await?;
        let now = self.clock.now();
        let local = now.with_timezone(&self.config.reference_offset);

        debug!(time = %local.format("%H:%M"), entries = schedule.len(), "Resolving responder");

        for entry in schedule.iter().filter(|e| e.contains(local.time())) {
            let state = self.state.get(&entry.responder).await?;
            if let Some(last) = state.last_success_at {
                if now - last < self.config.success_window {
                    debug!(
                        number = %entry.responder,
                        last_success = %last,
                        "Skipping responder with a recent successful call"
                    );
                    continue;
                }
            }

            info!(number = %entry.responder, "Responder found");
            return Ok(entry.responder.clone());
        }

        info!(time = %local.format("%H:%M"), "No responder found for the current time");
        Err(EscalationError::NoResponderFound)
    }

    /// Stamp a successful call and clear its pending attempt count.
    pub async fn record_call_success(&self, number: &str) -> EscalationResult<()> {
        let now = self.clock.now();
        self.state
            .set(
                number,
                CallAttemptState {
                    last_success_at: Some(now),
                    pending_attempts: 0,
                },
            )
            .await?;
        info!(number, at = %now, "Call marked successful");
        Ok(())
    }

    /// Record how many attempts the running escalation has spent on `number`.
    ///
    /// Only the attempt count is written, so a success recorded concurrently
    /// by another escalation or the provider callback is kept.
    pub async fn record_call_failure(&self, number: &str, attempts: u32) -> EscalationResult<()> {
        self.state.set_pending_attempts(number, attempts).await
    }

    /// Call bookkeeping for `number`.
    pub async fn call_state(&self, number: &str) -> EscalationResult<CallAttemptState> {
        self.state.get(number).await
    }

    /// Responder stored right after the first occurrence of `current`.
    pub async fn next_responder(&self, current: &str) -> EscalationResult<String> {
        let schedule = self.store.load().await?;

        schedule
            .iter()
            .position(|e| e.responder == current)
            .and_then(|i| schedule.get(i + 1))
            .map(|e| e.responder.clone())
            .ok_or_else(|| EscalationError::ExhaustedRotation {
                number: current.to_string(),
            })
    }

    /// Whether outbound calls are currently suppressed.
    pub async fn is_muted(&self) -> EscalationResult<bool> {
        let until = self.state.mute_until().await?;
        Ok(until.is_some_and(|until| self.clock.now() < until))
    }

    /// Active mute deadline, if calls are muted right now.
    pub async fn muted_until(&self) -> EscalationResult<Option<DateTime<Utc>>> {
        let now = self.clock.now();
        Ok(self.state.mute_until().await?.filter(|until| now < *until))
    }

    /// Suppress calls for `duration` from now.
    pub async fn set_mute(&self, duration: Duration) -> EscalationResult<DateTime<Utc>> {
        let until = self.clock.now() + duration;
        self.state.set_mute_until(Some(until)).await?;
        info!(until = %until, "Calls muted");
        Ok(until)
    }

    /// Suppress calls for the configured default duration.
    pub async fn mute(&self) -> EscalationResult<DateTime<Utc>> {
        self.set_mute(self.config.default_mute).await
    }

    /// Lift any active mute.
    pub async fn unmute(&self) -> EscalationResult<()> {
        self.state.set_mute_until(None).await?;
        info!("Calls unmuted");
        Ok(())
    }
}
