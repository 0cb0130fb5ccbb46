//! On-call escalation engine.
//!
//! Keeps an ordered schedule of responder windows, resolves who is on call
//! right now and places phone calls to them with bounded retries, rotating
//! through the schedule until someone picks up.
//!
//! # Architecture
//!
//! - [`ScheduleStore`] persists the ordered schedule ([`FileScheduleStore`], [`MemoryScheduleStore`])
//! - [`CallStateStore`] keeps call outcomes and the mute deadline
//! - [`EscalationScheduler`] answers "who is on call" and "who is next"
//! - [`CallTransport`] places one call ([`QuickCallClient`])
//! - [`CallAttemptController`] drives retries and rotation for one escalation

pub mod clock;
pub mod controller;
pub mod error;
pub mod schedule;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{CallAttemptController, ControllerConfig, EscalationOutcome, DEFAULT_MAX_ATTEMPTS};
pub use error::{EscalationError, EscalationResult};
pub use schedule::{parse_time_of_day, ScheduleEntry};
pub use scheduler::{utc_offset_hours, EscalationScheduler, SchedulerConfig, MOSCOW_UTC_OFFSET_HOURS};
pub use state::{CallAttemptState, CallStateStore, InMemoryCallState};
pub use store::{FileScheduleStore, MemoryScheduleStore, ScheduleStore};
pub use transport::{CallData, CallError, CallTransport, QuickCallClient};
