//! Concurrent fan-out of a routing decision
//!
//! Each action runs in its own task under its own timeout. A failed or slow
//! sink never affects the others.

use super::{Notification, Notifier};
use crate::routing::engine::{Action, ActionKind, RoutingDecision, RoutingReason};
use crate::routing::secrets::SecretResolver;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Sent,
    Skipped { reason: String },
    Failed { error: String },
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub team: Option<String>,
    pub channel: Option<String>,
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
}

impl DispatchReport {
    fn new(action: &Action, outcome: DeliveryOutcome) -> Self {
        Self {
            kind: action.kind,
            team: action.team.clone(),
            channel: action.channel.clone(),
            outcome,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    pub reports: Vec<DispatchReport>,
    /// Safety-net Opsgenie send, when one was attempted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<DispatchReport>,
}

impl DispatchSummary {
    pub fn delivered(&self) -> usize {
        self.reports
            .iter()
            .chain(self.fallback.iter())
            .filter(|r| r.outcome == DeliveryOutcome::Sent)
            .count()
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    slack: Arc<dyn Notifier>,
    opsgenie: Arc<dyn Notifier>,
    secrets: Arc<dyn SecretResolver>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        slack: Arc<dyn Notifier>,
        opsgenie: Arc<dyn Notifier>,
        secrets: Arc<dyn SecretResolver>,
        timeout: Duration,
    ) -> Self {
        Self { slack, opsgenie, secrets, timeout }
    }

    fn notifier(&self, kind: ActionKind) -> Arc<dyn Notifier> {
        match kind {
            ActionKind::Slack => self.slack.clone(),
            ActionKind::Opsgenie => self.opsgenie.clone(),
        }
    }

    pub async fn dispatch(&self, decision: &RoutingDecision, notification: &Notification) -> DispatchSummary {
        let exec_id = notification.exec_id.as_str();
        let mut reports: Vec<Option<DispatchReport>> = vec![None; decision.actions.len()];
        let mut set = JoinSet::new();

        for (idx, action) in decision.actions.iter().enumerate() {
            if !action.has_credentials() {
                warn!("[{}] Skipping {:?} action for team {:?}: missing credentials", exec_id, action.kind, action.team);
                reports[idx] = Some(DispatchReport::new(
                    action,
                    DeliveryOutcome::Skipped { reason: "missing credentials".to_string() },
                ));
                continue;
            }

            let notifier = self.notifier(action.kind);
            let action = action.clone();
            let notification = notification.clone();
            let timeout = self.timeout;
            set.spawn(async move {
                let outcome = deliver(notifier.as_ref(), &action, &notification, timeout).await;
                (idx, DispatchReport::new(&action, outcome))
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, report)) => reports[idx] = Some(report),
                Err(e) => error!("[{}] Notification task aborted: {}", exec_id, e),
            }
        }

        let reports: Vec<DispatchReport> = reports
            .into_iter()
            .zip(decision.actions.iter())
            .map(|(report, action)| {
                report.unwrap_or_else(|| {
                    DispatchReport::new(action, DeliveryOutcome::Failed { error: "task aborted".to_string() })
                })
            })
            .collect();

        let any_sent = reports.iter().any(|r| r.outcome == DeliveryOutcome::Sent);
        let fallback = if !any_sent && decision.reason != RoutingReason::NoActionNonFinal {
            self.safety_net(notification, decision.reason).await
        } else {
            None
        };

        info!(
            "[{}] Escalation finished: {}/{} delivered{}",
            exec_id,
            reports.iter().filter(|r| r.outcome == DeliveryOutcome::Sent).count(),
            reports.len(),
            if fallback.is_some() { ", safety net attempted" } else { "" }
        );
        DispatchSummary { reports, fallback }
    }

    async fn safety_net(&self, notification: &Notification, reason: RoutingReason) -> Option<DispatchReport> {
        let exec_id = notification.exec_id.as_str();
        let Some(api_key) = self.secrets.opsgenie_api_key(None) else {
            error!("[{}] Final fallback skipped: OPSGENIE_API_KEY not set", exec_id);
            return None;
        };

        info!("[{}] Attempting final Opsgenie fallback (reason={:?})", exec_id, reason);
        let action = Action::opsgenie(None, Some(api_key));
        let outcome = deliver(self.opsgenie.as_ref(), &action, notification, self.timeout).await;
        if outcome != DeliveryOutcome::Sent {
            error!("[{}] Final Opsgenie fallback did not confirm success", exec_id);
        }
        Some(DispatchReport::new(&action, outcome))
    }
}

async fn deliver(notifier: &dyn Notifier, action: &Action, notification: &Notification, timeout: Duration) -> DeliveryOutcome {
    match tokio::time::timeout(timeout, notifier.send(action, notification)).await {
        Ok(Ok(())) => DeliveryOutcome::Sent,
        Ok(Err(e)) => {
            error!(
                "[{}] Routing action failed (type={:?}, team={:?}): {}",
                notification.exec_id, notifier.kind(), action.team, e
            );
            DeliveryOutcome::Failed { error: e.to_string() }
        }
        Err(_) => {
            error!("[{}] Routing action timed out after {:?} (type={:?})", notification.exec_id, timeout, notifier.kind());
            DeliveryOutcome::TimedOut
        }
    }
}
