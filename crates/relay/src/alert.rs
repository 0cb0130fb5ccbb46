//! Alertmanager webhook types.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use notify::Severity;

/// Group key used when an alert carries no `alertgroup` label.
pub const DEFAULT_GROUP: &str = "NoAlertGroup";

/// Webhook body. Top-level Alertmanager fields other than `alerts` are ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AlertBatch {
    /// Alerts in this notification
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

/// Individual alert.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// "firing" or "resolved"
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub labels: AlertLabels,
    #[serde(default)]
    pub annotations: AlertAnnotations,
    /// When the alert started firing
    #[serde(default, deserialize_with = "non_zero_time")]
    pub starts_at: Option<DateTime<Utc>>,
    /// When the alert was resolved; open alerts carry the zero time
    #[serde(default, deserialize_with = "non_zero_time")]
    pub ends_at: Option<DateTime<Utc>>,
}

/// Labels the relay reads. Unknown labels are ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AlertLabels {
    #[serde(default)]
    pub alertname: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default, rename = "errorMessage")]
    pub error_message: String,
    #[serde(default, rename = "strategyName")]
    pub strategy_name: String,
    #[serde(default)]
    pub alertgroup: String,
    #[serde(default)]
    pub name: String,
}

/// Annotations the relay reads.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AlertAnnotations {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
}

/// Alert lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertStatus {
    Firing,
    Resolved,
}

impl AlertStatus {
    /// Parse the webhook status. Anything but exactly `firing`/`resolved` is unsupported.
    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "firing" => Some(Self::Firing),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }

    /// Heading emoji.
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Firing => "❗️",
            Self::Resolved => "✅",
        }
    }

    /// Upper-case heading label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Firing => "FIRING",
            Self::Resolved => "RESOLVED",
        }
    }
}

impl Alert {
    /// Parsed status, if supported.
    pub fn state(&self) -> Option<AlertStatus> {
        AlertStatus::parse(&self.status)
    }

    /// Check if this is a firing alert.
    pub fn is_firing(&self) -> bool {
        self.state() == Some(AlertStatus::Firing)
    }

    /// Grouping key: the `alertgroup` label or [`DEFAULT_GROUP`].
    pub fn group_key(&self) -> &str {
        if self.labels.alertgroup.is_empty() {
            DEFAULT_GROUP
        } else {
            &self.labels.alertgroup
        }
    }

    /// Firing with `Critical` severity, which triggers a phone escalation.
    pub fn needs_escalation(&self) -> bool {
        self.is_firing()
            && self
                .labels
                .severity
                .parse::<Severity>()
                .is_ok_and(|s| s == Severity::Critical)
    }
}

/// Alertmanager sends `0001-01-01T00:00:00Z` for unset timestamps.
fn non_zero_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(value.filter(|t| t.year() > 1))
}
