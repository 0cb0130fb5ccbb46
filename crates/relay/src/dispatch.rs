//! Alert grouping, delivery and escalation.
//!
//! A batch is grouped by `alertgroup` in first-seen order and each group is
//! split into firing and resolved subsets. Every firing subset is delivered
//! before any resolved one. Each firing `Critical` alert then triggers one
//! phone escalation, run sequentially.

use std::collections::HashMap;
use std::sync::Arc;

use notify::Notifier;
use oncall::{CallAttemptController, EscalationOutcome};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::alert::{Alert, AlertStatus};
use crate::format::{format_group, ReferenceZone};

/// Alerts sharing one group key, split by status.
#[derive(Debug, Default)]
pub struct AlertGroup<'a> {
    pub key: &'a str,
    pub firing: Vec<&'a Alert>,
    pub resolved: Vec<&'a Alert>,
}

/// Outcome counters for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Messages accepted by the channel
    pub messages_sent: usize,
    /// Messages that could not be routed or sent
    pub messages_failed: usize,
    /// Alerts with an unsupported status
    pub alerts_dropped: usize,
    /// Escalations that reached a responder
    pub calls_connected: usize,
    /// Escalations suppressed by an active mute
    pub calls_muted: usize,
    /// Escalations that ended without a connected call
    pub calls_failed: usize,
    /// Escalations skipped because calling is not configured
    pub calls_skipped: usize,
}

/// Group `alerts` by key in first-seen order. Alerts with an unsupported
/// status are left out and counted in the second value.
pub fn group_alerts(alerts: &[Alert]) -> (Vec<AlertGroup<'_>>, usize) {
    let mut groups: Vec<AlertGroup<'_>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut dropped = 0;

    for alert in alerts {
        let key = alert.group_key();
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(AlertGroup {
                key,
                ..AlertGroup::default()
            });
            groups.len() - 1
        });

        match alert.state() {
            Some(AlertStatus::Firing) => groups[slot].firing.push(alert),
            Some(AlertStatus::Resolved) => groups[slot].resolved.push(alert),
            None => {
                warn!(
                    group = key,
                    alertname = %alert.labels.alertname,
                    status = %alert.status,
                    "Unsupported alert status, dropping alert"
                );
                dropped += 1;
            }
        }
    }

    (groups, dropped)
}

/// Delivers alert batches and triggers escalations.
pub struct AlertDispatcher {
    notifier: Arc<Notifier>,
    escalation: Option<Arc<CallAttemptController>>,
    zone: ReferenceZone,
}

impl AlertDispatcher {
    /// Create a dispatcher. Without a controller, critical alerts are only delivered.
    pub fn new(
        notifier: Arc<Notifier>,
        escalation: Option<Arc<CallAttemptController>>,
        zone: ReferenceZone,
    ) -> Self {
        Self {
            notifier,
            escalation,
            zone,
        }
    }

    /// Process one webhook batch to completion.
    pub async fn dispatch(&self, alerts: &[Alert]) -> DispatchReport {
        info!(alerts = alerts.len(), "Dispatching alert batch");

        let (groups, dropped) = group_alerts(alerts);
        let mut report = DispatchReport {
            alerts_dropped: dropped,
            ..DispatchReport::default()
        };

        for group in &groups {
            self.deliver(group.key, &group.firing, &mut report).await;
        }
        for group in &groups {
            self.deliver(group.key, &group.resolved, &mut report).await;
        }

        let critical: Vec<&Alert> = groups
            .iter()
            .flat_map(|g| g.firing.iter().copied())
            .filter(|a| a.needs_escalation())
            .collect();
        for alert in critical {
            self.escalate(alert, &mut report).await;
        }

        info!(
            sent = report.messages_sent,
            failed = report.messages_failed,
            calls_connected = report.calls_connected,
            calls_failed = report.calls_failed,
            "Alert batch dispatched"
        );
        report
    }

    async fn deliver(&self, group: &str, subset: &[&Alert], report: &mut DispatchReport) {
        let Some(first) = subset.first() else {
            return;
        };

        let text = format_group(subset.iter().copied(), &self.zone);
        let severity = first.labels.severity.as_str();

        match self.notifier.deliver(severity, &text).await {
            Ok(()) => {
                debug!(group, severity, alerts = subset.len(), "Alert message delivered");
                report.messages_sent += 1;
            }
            Err(e) => {
                error!(group, severity, error = %e, "Failed to deliver alert message");
                report.messages_failed += 1;
            }
        }
    }

    async fn escalate(&self, alert: &Alert, report: &mut DispatchReport) {
        let Some(controller) = &self.escalation else {
            warn!(
                alertname = %alert.labels.alertname,
                "Critical alert fired but phone escalation is not configured"
            );
            report.calls_skipped += 1;
            return;
        };

        match controller.escalate().await {
            Ok(EscalationOutcome::Connected { .. }) => report.calls_connected += 1,
            Ok(EscalationOutcome::Muted) => report.calls_muted += 1,
            Err(e) => {
                error!(
                    alertname = %alert.labels.alertname,
                    error = %e,
                    "Escalation call failed"
                );
                report.calls_failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(group: &str, status: &str) -> Alert {
        let mut alert = Alert {
            status: status.to_string(),
            ..Alert::default()
        };
        alert.labels.alertgroup = group.to_string();
        alert
    }

    #[test]
    fn test_groups_keep_first_seen_order() {
        let alerts = vec![
            alert("b", "firing"),
            alert("a", "resolved"),
            alert("", "firing"),
            alert("b", "resolved"),
            alert("a", "firing"),
        ];

        let (groups, dropped) = group_alerts(&alerts);
        let keys: Vec<_> = groups.iter().map(|g| g.key).collect();

        assert_eq!(keys, vec!["b", "a", "NoAlertGroup"]);
        assert_eq!(dropped, 0);
        assert_eq!(groups[0].firing.len(), 1);
        assert_eq!(groups[0].resolved.len(), 1);
        assert_eq!(groups[1].firing.len(), 1);
        assert_eq!(groups[2].resolved.len(), 0);
    }

    #[test]
    fn test_unsupported_status_is_dropped() {
        let alerts = vec![alert("a", "pending"), alert("a", "firing")];
        let (groups, dropped) = group_alerts(&alerts);

        assert_eq!(dropped, 1);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].firing.len(), 1);
    }
}
