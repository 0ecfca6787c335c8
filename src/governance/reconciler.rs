//! State Reconciler
//!
//! Folds the raw, append-only event stream of a partition into one current
//! state per execution. Statuses only move "forward" by outcome tier; within
//! a tier the most recent record wins.

use crate::models::{ExecStatus, ExecutionEvent};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Current, derived picture of one execution
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionState {
    pub exec_id: String,
    pub status: ExecStatus,
    /// Record whose fields are surfaced for this execution
    pub winning_event: ExecutionEvent,
    pub is_terminal: bool,
    /// Number of log records folded into this state
    pub record_count: usize,
}

/// Event log -> current state fold
pub struct StateReconciler;

impl StateReconciler {
    /// Reconcile a snapshot of events into one state per `ExecId`.
    ///
    /// Events are visited in ascending `RequestedAt` order (stable, so equal
    /// timestamps keep arrival order). A record replaces the current winner
    /// when its priority is higher or equal.
    pub fn reconcile(events: &[ExecutionEvent]) -> HashMap<String, ExecutionState> {
        let mut states: HashMap<String, ExecutionState> = HashMap::new();

        for event in sort_by_requested_at(events) {
            if event.exec_id.trim().is_empty() {
                debug!("Skipping log record {} without ExecId", event.row_key);
                continue;
            }

            let status = event.exec_status();
            match states.get_mut(&event.exec_id) {
                Some(state) => {
                    state.record_count += 1;
                    if status.priority() >= state.status.priority() {
                        state.is_terminal = status.is_terminal();
                        state.status = status;
                        state.winning_event = event.clone();
                    }
                }
                None => {
                    states.insert(
                        event.exec_id.clone(),
                        ExecutionState {
                            exec_id: event.exec_id.clone(),
                            is_terminal: status.is_terminal(),
                            status,
                            winning_event: event.clone(),
                            record_count: 1,
                        },
                    );
                }
            }
        }

        debug!("Reconciled {} events into {} executions", events.len(), states.len());
        states
    }

    /// Reconcile and order the result most recent first
    pub fn reconcile_sorted(events: &[ExecutionEvent]) -> Vec<ExecutionState> {
        let mut states: Vec<ExecutionState> = Self::reconcile(events).into_values().collect();
        states.sort_by(|a, b| {
            b.winning_event
                .requested_at_utc()
                .cmp(&a.winning_event.requested_at_utc())
                .then_with(|| a.exec_id.cmp(&b.exec_id))
        });
        states
    }
}

/// Stable ascending sort by `RequestedAt`; unparseable timestamps come first
pub(crate) fn sort_by_requested_at(events: &[ExecutionEvent]) -> Vec<&ExecutionEvent> {
    let mut keyed: Vec<_> = events.iter().map(|e| (e.requested_at_utc(), e)).collect();
    keyed.sort_by_key(|(at, _)| *at);
    keyed.into_iter().map(|(_, e)| e).collect()
}
