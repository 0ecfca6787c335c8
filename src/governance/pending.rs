//! Pending Approval View
//!
//! Answers "what requires a human decision right now" for one snapshot of
//! events. Terminal exclusion is computed from the raw records, not from the
//! reconciled states, so one terminal record anywhere in the snapshot removes
//! the execution for good.

use crate::governance::approval::{ApprovalCodec, ApprovalLinks, ApprovalPayload};
use crate::governance::reconciler::{sort_by_requested_at, StateReconciler};
use crate::models::{ExecStatus, ExecutionEvent};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Default attention window for approvals
pub const DEFAULT_APPROVAL_WINDOW_MINUTES: i64 = 60;

/// One execution waiting on (or just past) a human decision
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingApproval {
    pub exec_id: String,
    /// `pending`, or `running` once the execution was accepted
    pub display_status: String,
    /// Status the reconciler settled on for the whole snapshot
    pub reconciled_status: Option<ExecStatus>,
    pub requested_at: DateTime<Utc>,
    pub event: ExecutionEvent,
    pub approve_url: Option<String>,
    pub reject_url: Option<String>,
    pub message: Option<String>,
    /// Decoded payload with secrets removed
    pub payload: Option<ApprovalPayload>,
    pub resource_info: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decode_error: Option<String>,
}

impl PendingApproval {
    /// Full links, as needed to act on this entry
    pub fn links(&self) -> ApprovalLinks {
        ApprovalLinks {
            approve: self.approve_url.clone(),
            reject: self.reject_url.clone(),
            message: self.message.clone(),
            payload: self.payload.clone(),
            resource_info: self.resource_info.clone(),
            decode_error: self.decode_error.clone(),
        }
    }
}

/// Pending approvals projection
#[derive(Debug, Clone)]
pub struct PendingApprovalView {
    window: Duration,
}

impl Default for PendingApprovalView {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_APPROVAL_WINDOW_MINUTES))
    }
}

impl PendingApprovalView {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Executions awaiting a decision, most recent first.
    ///
    /// Records older than the window are ignored (the execution itself is not
    /// cancelled). An execution is approval-gated when any of its records has
    /// `ApprovalRequired`. Among the surviving `pending`/`accepted` records the
    /// latest one wins, with `accepted` shown as `running`.
    pub fn list_pending(&self, events: &[ExecutionEvent], now: DateTime<Utc>) -> Vec<PendingApproval> {
        let terminal_ids: HashSet<&str> = events
            .iter()
            .filter(|e| e.exec_status().is_terminal())
            .map(|e| e.exec_id.as_str())
            .collect();

        let gated_ids: HashSet<&str> = events
            .iter()
            .filter(|e| e.approval_required)
            .map(|e| e.exec_id.as_str())
            .collect();

        let reconciled = StateReconciler::reconcile(events);
        let cutoff = now - self.window;
        let mut pending: HashMap<String, PendingApproval> = HashMap::new();

        for event in sort_by_requested_at(events) {
            let requested_at = event.requested_at_utc();
            if requested_at < cutoff {
                continue;
            }
            if event.exec_id.trim().is_empty() || terminal_ids.contains(event.exec_id.as_str()) {
                continue;
            }
            if !gated_ids.contains(event.exec_id.as_str()) {
                continue;
            }

            let display_status = match event.exec_status() {
                ExecStatus::Pending => "pending",
                ExecStatus::Accepted => "running",
                _ => continue,
            };

            let links = decode_links(event);
            let previous = pending.remove(&event.exec_id);
            let links = match (links, previous) {
                // Keep the URLs of an earlier record when this one carries none
                (links, Some(prev)) if links.approve.is_none() && links.reject.is_none() => prev.links(),
                (links, _) => links,
            };

            pending.insert(
                event.exec_id.clone(),
                PendingApproval {
                    exec_id: event.exec_id.clone(),
                    display_status: display_status.to_string(),
                    reconciled_status: reconciled.get(&event.exec_id).map(|s| s.status.clone()),
                    requested_at,
                    event: event.clone(),
                    approve_url: links.approve,
                    reject_url: links.reject,
                    message: links.message,
                    payload: links.payload.map(|p| p.redacted()),
                    resource_info: links.resource_info,
                    decode_error: links.decode_error,
                },
            );
        }

        let mut result: Vec<PendingApproval> = pending.into_values().collect();
        sort_most_recent_first(&mut result);
        debug!("{} executions pending approval out of {} records", result.len(), events.len());
        result
    }
}

/// Descending by `requested_at`, exec id as a stable tiebreak
pub fn sort_most_recent_first(entries: &mut [PendingApproval]) {
    entries.sort_by(|a, b| {
        b.requested_at
            .cmp(&a.requested_at)
            .then_with(|| a.exec_id.cmp(&b.exec_id))
    });
}

fn decode_links(event: &ExecutionEvent) -> ApprovalLinks {
    if event.log.is_none() {
        return ApprovalLinks::default();
    }
    match ApprovalCodec::decode_event(event) {
        Ok(links) => links,
        Err(e) => {
            warn!("[{}] Log blob not decodable: {}", event.exec_id, e);
            ApprovalLinks {
                resource_info: event.resource_info_column().unwrap_or_default(),
                decode_error: Some(e.to_string()),
                ..Default::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 15, 10, 0, 0).unwrap()
    }

    fn at(minutes: i64) -> String {
        (t0() + Duration::minutes(minutes)).to_rfc3339()
    }

    fn event(exec_id: &str, status: &str, minutes: i64, approval_required: bool) -> ExecutionEvent {
        ExecutionEvent {
            exec_id: exec_id.to_string(),
            status: status.to_string(),
            requested_at: Some(at(minutes)),
            approval_required,
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        t0() + Duration::minutes(5)
    }

    #[test]
    fn test_pending_then_accepted_shows_running() {
        let events = vec![
            event("a", "pending", 0, true),
            event("a", "accepted", 1, false),
        ];

        let pending = PendingApprovalView::default().list_pending(&events, now());
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].exec_id, "a");
        assert_eq!(pending[0].display_status, "running");
        assert_eq!(pending[0].reconciled_status, Some(ExecStatus::Accepted));
    }

    #[test]
    fn test_terminal_record_removes_execution() {
        let events = vec![
            event("a", "pending", 0, true),
            event("a", "accepted", 1, false),
            event("a", "succeeded", 2, false),
        ];

        let pending = PendingApprovalView::default().list_pending(&events, now());
        assert!(pending.iter().all(|p| p.exec_id != "a"));
    }

    #[test]
    fn test_terminal_anywhere_beats_later_duplicates() {
        let events = vec![
            event("a", "rejected", 0, true),
            event("a", "pending", 3, true),
            event("b", "pending", 1, true),
        ];

        let pending = PendingApprovalView::default().list_pending(&events, now());
        let ids: Vec<_> = pending.iter().map(|p| p.exec_id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn test_old_records_fall_out_of_window() {
        let events = vec![
            event("old", "pending", -61, true),
            event("edge", "pending", -55, true),
        ];

        let pending = PendingApprovalView::default().list_pending(&events, now());
        let ids: Vec<_> = pending.iter().map(|p| p.exec_id.as_str()).collect();
        assert_eq!(ids, vec!["edge"]);

        let wide = PendingApprovalView::new(Duration::hours(3)).list_pending(&events, now());
        assert_eq!(wide.len(), 2);
    }

    #[test]
    fn test_window_uses_orchestrator_local_timestamps() {
        // Written at 08:30Z and 09:40Z during CEST
        let stale = ExecutionEvent {
            requested_at: Some("2025-07-15 10:30:00".into()),
            ..event("stale", "pending", 0, true)
        };
        let fresh = ExecutionEvent {
            requested_at: Some("2025-07-15 11:40:00".into()),
            ..event("fresh", "pending", 0, true)
        };
        let now = Utc.with_ymd_and_hms(2025, 7, 15, 10, 0, 0).unwrap();

        let pending = PendingApprovalView::default().list_pending(&[stale, fresh], now);
        let ids: Vec<_> = pending.iter().map(|p| p.exec_id.as_str()).collect();
        assert_eq!(ids, vec!["fresh"]);
        assert_eq!(pending[0].requested_at, Utc.with_ymd_and_hms(2025, 7, 15, 9, 40, 0).unwrap());
    }

    #[test]
    fn test_executions_without_approval_gate_are_skipped() {
        let events = vec![event("a", "pending", 0, false), event("b", "accepted", 0, false)];
        assert!(PendingApprovalView::default().list_pending(&events, now()).is_empty());
    }

    #[test]
    fn test_running_and_other_statuses_are_not_pending() {
        let events = vec![event("a", "running", 0, true), event("b", "routed", 0, true)];
        assert!(PendingApprovalView::default().list_pending(&events, now()).is_empty());
    }

    #[test]
    fn test_sorted_most_recent_first() {
        let events = vec![
            event("first", "pending", 0, true),
            event("third", "pending", 2, true),
            event("second", "pending", 1, true),
        ];

        let pending = PendingApprovalView::default().list_pending(&events, now());
        let ids: Vec<_> = pending.iter().map(|p| p.exec_id.as_str()).collect();
        assert_eq!(ids, vec!["third", "second", "first"]);
    }

    #[test]
    fn test_links_decoded_and_kept_across_accept() {
        let mut pending_event = event("a", "pending", 0, true);
        pending_event.log = Some(json!(
            "{\"message\":\"Awaiting approval\",\"approve\":\"https://o/api/approvals/p/a/approve?p=bad&s=x\",\"reject\":\"https://o/api/approvals/p/a/reject?p=bad&s=x\"}"
        ));
        let mut accepted = event("a", "accepted", 1, true);
        accepted.log = Some(json!("{\"message\":\"Approved and executed\"}"));

        let pending = PendingApprovalView::default().list_pending(&[pending_event.clone()], now());
        assert_eq!(pending[0].message.as_deref(), Some("Awaiting approval"));
        assert!(pending[0].approve_url.as_deref().unwrap().contains("/approve"));
        assert!(pending[0].decode_error.is_some());

        let pending = PendingApprovalView::default().list_pending(&[pending_event, accepted], now());
        assert_eq!(pending[0].display_status, "running");
        assert!(pending[0].reject_url.as_deref().unwrap().contains("/reject"));
    }

    #[test]
    fn test_undecodable_log_does_not_hide_entry() {
        let mut e = event("a", "pending", 0, true);
        e.log = Some(json!("not json at all"));
        let pending = PendingApprovalView::default().list_pending(&[e], now());
        assert_eq!(pending.len(), 1);
        assert!(pending[0].approve_url.is_none());
        assert!(pending[0].decode_error.is_some());
    }
}
