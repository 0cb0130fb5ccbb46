//! Error types for the escalation engine.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the schedule store, the scheduler and the call controller.
#[derive(Debug, Error)]
pub enum EscalationError {
    /// A schedule time is not a valid 24-hour `HH:MM` value
    #[error("invalid time format {value:?}, use HH:MM")]
    InvalidTimeFormat { value: String },

    /// A schedule entry has no responder number
    #[error("responder number must not be empty")]
    EmptyResponder,

    /// One entry of a batch failed validation; nothing was saved
    #[error("schedule entry #{index}: {source}")]
    InvalidEntry {
        /// 1-based position in the batch
        index: usize,
        source: Box<EscalationError>,
    },

    /// The schedule file could not be read or written
    #[error("schedule I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The schedule file exists but is not a valid schedule
    #[error("malformed schedule in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The schedule could not be encoded
    #[error("failed to encode schedule: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Call state backend failure
    #[error("call state store failed: {0}")]
    State(String),

    /// No schedule window covers the current time, or every match is suppressed
    #[error("no responder found for the current time")]
    NoResponderFound,

    /// Rotation reached the end of the schedule
    #[error("no responder after {number} in the schedule")]
    ExhaustedRotation { number: String },

    /// The attempt budget for the whole rotation chain ran out
    #[error("gave up after {attempts} call attempts")]
    AttemptBudgetExhausted { attempts: u32 },
}

impl EscalationError {
    /// Whether this is a persistence failure (`Io` or `Malformed`).
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Malformed { .. })
    }
}

/// Result alias for escalation operations.
pub type EscalationResult<T> = Result<T, EscalationError>;
