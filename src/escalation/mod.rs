//! Escalation: delivering routed notifications
//!
//! Sinks are behind the `Notifier` trait; the `Dispatcher` fans a routing
//! decision out to them.

pub mod dispatch;
pub mod opsgenie;
pub mod slack;

pub use dispatch::{DispatchSummary, Dispatcher};
pub use opsgenie::OpsgenieNotifier;
pub use slack::SlackNotifier;

use crate::error::AppError;
use crate::governance::approval::ApprovalLinks;
use crate::models::ExecutionEvent;
use crate::routing::engine::{parse_severity, Action, ActionKind};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

const MAX_LOG_CHARS: usize = 1500;

/// Sink-agnostic message about one execution
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub exec_id: String,
    pub title: String,
    pub body: String,
    pub severity: Option<String>,
    /// Opsgenie priority, `P1`..`P5`
    pub priority: String,
    pub monitor_condition: Option<String>,
    pub tags: Vec<String>,
    pub details: BTreeMap<String, String>,
}

impl Notification {
    pub fn from_event(event: &ExecutionEvent, links: &ApprovalLinks) -> Self {
        let status = event.status.trim().to_lowercase();
        let name = event.name.clone().unwrap_or_else(|| "runbook".to_string());
        let severity = event
            .severity
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| links.payload.as_ref().and_then(|p| p.severity.clone()));
        let monitor_condition = event
            .monitor_condition
            .clone()
            .or_else(|| links.payload.as_ref().and_then(|p| p.monitor_condition.clone()));

        let mut details = BTreeMap::new();
        details.insert("execId".to_string(), event.exec_id.clone());
        details.insert("status".to_string(), status.clone());
        let optional = [
            ("name", event.name.as_ref()),
            ("runbook", event.runbook.as_ref()),
            ("args", event.run_args.as_ref()),
            ("worker", event.worker.as_ref()),
            ("severity", severity.as_ref()),
        ];
        for (key, value) in optional {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                details.insert(key.to_string(), value.clone());
            }
        }
        for (key, value) in &links.resource_info {
            if let Some(text) = value.as_str() {
                details.insert(key.clone(), text.to_string());
            }
        }

        let mut lines = vec![
            format!("*Status:* {}", status),
            format!("*Name:* {}", name),
            format!("*ExecId:* {}", event.exec_id),
            format!("*Severity:* {}", severity.as_deref().unwrap_or("-")),
            format!("*Runbook:* {}", event.runbook.as_deref().unwrap_or("-")),
            format!("*Args:* {}", event.run_args.as_deref().unwrap_or("-")),
        ];
        if let Some(log) = links.message.clone().or_else(|| event.log_text()) {
            lines.push(format!("*Log:* {}", truncate(&log, MAX_LOG_CHARS)));
        }

        let mut tags = vec!["cloudo".to_string(), status.clone()];
        if let Some(sev) = &severity {
            tags.push(sev.clone());
        }

        Self {
            exec_id: event.exec_id.clone(),
            title: format!("[ClouDO] {} {} ({})", name, status, event.exec_id),
            body: lines.join("\n"),
            priority: opsgenie_priority(severity.as_deref()),
            severity,
            monitor_condition,
            tags,
            details,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.monitor_condition
            .as_deref()
            .is_some_and(|c| c.trim().eq_ignore_ascii_case("resolved"))
    }
}

/// `Sev0` -> `P1` ... `Sev4` -> `P5`; unknown severity is `P3`
pub fn opsgenie_priority(severity: Option<&str>) -> String {
    match severity.and_then(parse_severity) {
        Some(n) => format!("P{}", n.min(4) + 1),
        None => "P3".to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut)
}

/// One notification sink
#[async_trait]
pub trait Notifier: Send + Sync {
    fn kind(&self) -> ActionKind;

    async fn send(&self, action: &Action, notification: &Notification) -> Result<(), AppError>;
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};

    #[test]
    fn test_priority_from_severity() {
        assert_eq!(opsgenie_priority(Some("Sev0")), "P1");
        assert_eq!(opsgenie_priority(Some("Sev3")), "P4");
        assert_eq!(opsgenie_priority(Some("Sev9")), "P5");
        assert_eq!(opsgenie_priority(None), "P3");
        assert_eq!(opsgenie_priority(Some("high")), "P3");
    }

    #[test]
    fn test_from_event() {
        let mut resource_info = Map::new();
        resource_info.insert("resource_rg".into(), Value::String("rg-a".into()));
        let links = ApprovalLinks { resource_info, ..Default::default() };
        let event = ExecutionEvent {
            exec_id: "e1".into(),
            status: "Failed".into(),
            name: Some("restart-pod".into()),
            severity: Some("Sev1".into()),
            runbook: Some("restart.sh".into()),
            log: Some(Value::String("x".repeat(2000))),
            monitor_condition: Some("Resolved".into()),
            ..Default::default()
        };

        let n = Notification::from_event(&event, &links);
        assert_eq!(n.title, "[ClouDO] restart-pod failed (e1)");
        assert_eq!(n.priority, "P2");
        assert!(n.is_resolved());
        assert!(n.body.contains("*Runbook:* restart.sh"));
        assert!(n.body.chars().count() < 1700);
        assert_eq!(n.details["resource_rg"], "rg-a");
        assert_eq!(n.details["severity"], "Sev1");
        assert!(!n.details.contains_key("args"));
        assert_eq!(n.tags, vec!["cloudo", "failed", "Sev1"]);
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("ééé", 2), "éé…");
        assert_eq!(truncate("abc", 5), "abc");
    }
}
