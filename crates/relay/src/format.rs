//! Human-readable alert messages.

use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::alert::{Alert, AlertStatus};

/// Timestamp layout used in messages, e.g. `May 01, 18:00:00`.
const TIME_FORMAT: &str = "%b %d, %H:%M:%S";

/// Timezone alert times are rendered in, with its display label.
#[derive(Debug, Clone)]
pub struct ReferenceZone {
    offset: FixedOffset,
    label: String,
}

impl ReferenceZone {
    pub fn new(offset: FixedOffset, label: impl Into<String>) -> Self {
        Self {
            offset,
            label: label.into(),
        }
    }

    /// Zone for a whole-hour offset. UTC+3 is labelled `MSK`, others `UTC+N`.
    pub fn from_hours(hours: i32) -> Option<Self> {
        let offset = oncall::utc_offset_hours(hours)?;
        let label = if hours == oncall::MOSCOW_UTC_OFFSET_HOURS {
            "MSK".to_string()
        } else {
            format!("UTC{hours:+}")
        };
        Some(Self::new(offset, label))
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Render `time` as `Mon DD, HH:MM:SS <label>`.
    pub fn render(&self, time: DateTime<Utc>) -> String {
        format!(
            "{} {}",
            time.with_timezone(&self.offset).format(TIME_FORMAT),
            self.label
        )
    }

    /// Render `time` as `HH:MM <label>`.
    pub fn render_clock(&self, time: DateTime<Utc>) -> String {
        format!(
            "{} {}",
            time.with_timezone(&self.offset).format("%H:%M"),
            self.label
        )
    }
}

impl Default for ReferenceZone {
    fn default() -> Self {
        Self::from_hours(oncall::MOSCOW_UTC_OFFSET_HOURS)
            .unwrap_or_else(|| Self::new(Utc.fix(), "UTC"))
    }
}

/// Format one alert as a paragraph. `None` for unsupported statuses.
pub fn format_alert(alert: &Alert, zone: &ReferenceZone) -> Option<String> {
    let status = alert.state()?;
    let started = alert
        .starts_at
        .map_or_else(|| "unknown".to_string(), |t| zone.render(t));

    let mut text = format!(
        "{} {}\n🔔 Summary: {}\n📝 Description: {}\n⚠️ Severity: {}\n🕒 Started at: {started}",
        status.emoji(),
        status.label(),
        alert.annotations.summary,
        alert.annotations.description,
        alert.labels.severity,
    );

    if status == AlertStatus::Resolved {
        if let Some(ended) = alert.ends_at {
            text.push_str("\n🕒 Resolved at: ");
            text.push_str(&zone.render(ended));
        }
    }

    Some(text)
}

/// Format a group of alerts into one message, paragraphs separated by a blank line.
pub fn format_group<'a, I>(alerts: I, zone: &ReferenceZone) -> String
where
    I: IntoIterator<Item = &'a Alert>,
{
    alerts
        .into_iter()
        .filter_map(|alert| format_alert(alert, zone))
        .collect::<Vec<_>>()
        .join("\n\n")
}
