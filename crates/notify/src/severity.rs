//! Alert severity levels and destination routing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// Severity levels that have a destination chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Warning - something needs attention
    Warning,
    /// Critical - immediate action required, may page the on-call responder
    Critical,
}

impl Severity {
    /// Get display name for this severity.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "Warning",
            Self::Critical => "Critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("warning") {
            Ok(Self::Warning)
        } else if s.eq_ignore_ascii_case("critical") {
            Ok(Self::Critical)
        } else {
            Err(ChannelError::UnknownSeverity(s.to_string()))
        }
    }
}

/// Maps a severity label to the chat that receives it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityRouter {
    warning_chat_id: Option<i64>,
    critical_chat_id: Option<i64>,
}

impl SeverityRouter {
    /// Create a router with both destinations configured.
    #[must_use]
    pub const fn new(warning_chat_id: i64, critical_chat_id: i64) -> Self {
        Self {
            warning_chat_id: Some(warning_chat_id),
            critical_chat_id: Some(critical_chat_id),
        }
    }

    /// Create a router where either destination may be missing.
    #[must_use]
    pub const fn with_optional(warning_chat_id: Option<i64>, critical_chat_id: Option<i64>) -> Self {
        Self {
            warning_chat_id,
            critical_chat_id,
        }
    }

    /// Resolve the chat for a raw `severity` label.
    pub fn chat_for(&self, severity: &str) -> Result<i64, ChannelError> {
        let severity: Severity = severity.parse()?;
        let chat = match severity {
            Severity::Warning => self.warning_chat_id,
            Severity::Critical => self.critical_chat_id,
        };
        chat.ok_or_else(|| ChannelError::NotConfigured(format!("{severity} chat id")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_severity_labels() {
        assert_eq!("Critical".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("warning".parse::<Severity>().unwrap(), Severity::Warning);
        assert!("info".parse::<Severity>().is_err());
        assert!("".parse::<Severity>().is_err());
    }

    #[test]
    fn test_router_picks_chat_by_severity() {
        let router = SeverityRouter::new(-100, -200);
        assert_eq!(router.chat_for("Warning").unwrap(), -100);
        assert_eq!(router.chat_for("Critical").unwrap(), -200);

        let err = router.chat_for("Info").unwrap_err();
        assert!(matches!(err, ChannelError::UnknownSeverity(ref s) if s == "Info"));
    }

    #[test]
    fn test_router_missing_destination() {
        let router = SeverityRouter::with_optional(Some(1), None);
        assert_eq!(router.chat_for("Warning").unwrap(), 1);
        assert!(matches!(
            router.chat_for("Critical"),
            Err(ChannelError::NotConfigured(_))
        ));
    }
}
