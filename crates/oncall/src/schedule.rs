//! Schedule entries and time-of-day windows.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{EscalationError, EscalationResult};

/// One on-call window: `responder` is on call strictly between `start` and `end`.
///
/// Serialized as `{"start_time": "HH:MM", "end_time": "HH:MM", "phone_number": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    #[serde(rename = "start_time", with = "hhmm")]
    pub start: NaiveTime,
    #[serde(rename = "end_time", with = "hhmm")]
    pub end: NaiveTime,
    #[serde(rename = "phone_number")]
    pub responder: String,
}

impl ScheduleEntry {
    /// Validate raw operator input into an entry.
    pub fn parse(start: &str, end: &str, responder: &str) -> EscalationResult<Self> {
        let start = parse_time_of_day(start)?;
        let end = parse_time_of_day(end)?;
        let responder = responder.trim();
        if responder.is_empty() {
            return Err(EscalationError::EmptyResponder);
        }

        Ok(Self {
            start,
            end,
            responder: responder.to_string(),
        })
    }

    /// Whether `time` falls strictly inside this window, at minute resolution.
    ///
    /// The boundary minutes themselves never match, and a window whose start
    /// is not before its end matches nothing.
    #[must_use]
    pub fn contains(&self, time: NaiveTime) -> bool {
        let now = minute_of_day(time);
        minute_of_day(self.start) < now && now < minute_of_day(self.end)
    }
}

/// Parse a 24-hour `HH:MM` time.
pub fn parse_time_of_day(value: &str) -> EscalationResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| {
        EscalationError::InvalidTimeFormat {
            value: value.to_string(),
        }
    })
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time_of_day(&raw).map_err(D::Error::custom)
    }
}
