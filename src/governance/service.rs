//! Governance Service
//!
//! Composition root: wires the event store, the pure projections, the
//! action executor and the notification pipeline together.

use crate::error::{conflict_error, not_found_error, validation_error, AppError};
use crate::escalation::{DispatchSummary, Dispatcher, Notification};
use crate::governance::action::{ActionExecutor, ActionOutcome};
use crate::governance::approval::{ApprovalCodec, ApprovalLinks, ApprovalPayload, Decision, IssuedLinks, TokenRejection};
use crate::governance::pending::{PendingApproval, PendingApprovalView};
use crate::governance::reconciler::{ExecutionState, StateReconciler};
use crate::models::{ExecStatus, ExecutionEvent};
use crate::routing::{NormalizedEvent, NotificationRouter, RoutingConfig, RoutingDecision};
use crate::store::{EventStore, LogQuery};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Tunables that come from settings
#[derive(Debug, Clone)]
pub struct GovernanceOptions {
    pub approval_window: Duration,
    pub approval_secret: String,
    pub approval_ttl: Duration,
    /// Base URL used when minting approve/reject links
    pub public_base_url: String,
    pub function_key: Option<String>,
}

impl Default for GovernanceOptions {
    fn default() -> Self {
        Self {
            approval_window: Duration::minutes(60),
            approval_secret: "default".to_string(),
            approval_ttl: Duration::minutes(60),
            public_base_url: "http://localhost:3000".to_string(),
            function_key: None,
        }
    }
}

/// Result of an operator decision
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResult {
    pub exec_id: String,
    pub decision: Decision,
    pub approver: String,
    pub outcome: ActionOutcome,
}

/// Routing plus delivery for one event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyResult {
    pub decision: RoutingDecision,
    pub delivery: DispatchSummary,
}

pub struct GovernanceService {
    store: Arc<dyn EventStore>,
    executor: Arc<dyn ActionExecutor>,
    router: NotificationRouter,
    routing: Arc<RoutingConfig>,
    dispatcher: Dispatcher,
    view: PendingApprovalView,
    options: GovernanceOptions,
}

impl GovernanceService {
    pub fn new(
        store: Arc<dyn EventStore>,
        executor: Arc<dyn ActionExecutor>,
        router: NotificationRouter,
        routing: RoutingConfig,
        dispatcher: Dispatcher,
        options: GovernanceOptions,
    ) -> Self {
        Self {
            store,
            executor,
            router,
            routing: Arc::new(routing),
            dispatcher,
            view: PendingApprovalView::new(options.approval_window),
            options,
        }
    }

    /// Routing document with inline secrets removed
    pub fn routing_config(&self) -> RoutingConfig {
        self.routing.redacted()
    }

    /// Current state of every execution in a partition, most recent first
    pub async fn reconcile(&self, partition_key: &str) -> Result<Vec<ExecutionState>, AppError> {
        let events = self.store.query(&LogQuery::partition(partition_key)).await?;
        Ok(StateReconciler::reconcile_sorted(&events))
    }

    pub async fn list_pending(&self, partition_key: &str, now: DateTime<Utc>) -> Result<Vec<PendingApproval>, AppError> {
        let events = self.store.query(&LogQuery::partition(partition_key)).await?;
        Ok(self.view.list_pending(&events, now))
    }

    /// Pending approvals over several partitions.
    ///
    /// Partitions are fetched concurrently and folded as one snapshot, so an
    /// execution that crosses midnight is excluded by a terminal record in
    /// either day and appears at most once.
    pub async fn list_pending_range(
        &self,
        partition_keys: &[String],
        now: DateTime<Utc>,
    ) -> Result<Vec<PendingApproval>, AppError> {
        let mut set = JoinSet::new();
        for key in partition_keys {
            let store = self.store.clone();
            let query = LogQuery::partition(key.clone());
            set.spawn(async move { store.query(&query).await });
        }

        let mut events = Vec::new();
        while let Some(joined) = set.join_next().await {
            let batch = joined.map_err(|e| AppError::Internal(format!("partition fetch aborted: {}", e)))??;
            events.extend(batch);
        }
        debug!("Fetched {} records across {} partitions", events.len(), partition_keys.len());
        Ok(self.view.list_pending(&events, now))
    }

    /// Approve or reject a pending execution on behalf of `approver`
    pub async fn decide(
        &self,
        partition_key: &str,
        exec_id: &str,
        decision: Decision,
        approver: &str,
        now: DateTime<Utc>,
    ) -> Result<DecisionResult, AppError> {
        let approver = approver.trim();
        if approver.is_empty() {
            return Err(validation_error("Approver identity is required"));
        }

        let events = self
            .store
            .query(&LogQuery::partition(partition_key).with_exec_id(exec_id))
            .await?;

        let entry = self
            .view
            .list_pending(&events, now)
            .into_iter()
            .find(|p| p.exec_id == exec_id)
            .ok_or_else(|| not_found_error(format!("Execution {} is not pending approval", exec_id)))?;

        let decided = events
            .iter()
            .filter(|e| e.exec_id == exec_id)
            .any(|e| e.exec_status() != ExecStatus::Pending);
        if decided {
            warn!("[{}] Decision refused: already decided or executed", exec_id);
            return Err(conflict_error("Already decided or executed for this ExecId"));
        }

        let links = entry.links();
        let url = decision
            .url(&links)
            .ok_or_else(|| not_found_error(format!("No {} link recorded for {}", decision, exec_id)))?;

        info!("[{}] {} requested by {}", exec_id, decision, approver);
        let request = ApprovalCodec::build_action_request(url, approver);
        let outcome = self.executor.execute(&request).await?;
        if let ActionOutcome::Inconclusive { reason } = &outcome {
            warn!("[{}] {} outcome inconclusive: {}", exec_id, decision, reason);
        }

        Ok(DecisionResult {
            exec_id: exec_id.to_string(),
            decision,
            approver: approver.to_string(),
            outcome,
        })
    }

    /// Mint signed approve/reject links for a pending execution
    pub fn issue_links(
        &self,
        partition_key: &str,
        exec_id: &str,
        mut payload: ApprovalPayload,
        now: DateTime<Utc>,
    ) -> Result<IssuedLinks, AppError> {
        payload.exec_id = Some(exec_id.to_string());
        payload.exp = Some((now + self.options.approval_ttl).to_rfc3339());
        ApprovalCodec::issue(
            &payload,
            &self.options.approval_secret,
            &self.options.public_base_url,
            partition_key,
            exec_id,
            self.options.function_key.as_deref(),
        )
    }

    /// Check a signed token; secrets are stripped from the returned payload
    pub fn verify_token(&self, exec_id: &str, p: &str, s: &str, now: DateTime<Utc>) -> Result<ApprovalPayload, TokenRejection> {
        ApprovalCodec::verify(exec_id, p, s, &self.options.approval_secret, now).map(|payload| payload.redacted())
    }

    pub fn route(&self, event: &ExecutionEvent) -> RoutingDecision {
        let normalized = NormalizedEvent::from_event(event, &links_for(event));
        self.router.route(&normalized, &self.routing)
    }

    /// Dry run against an already normalized event
    pub fn route_normalized(&self, event: &NormalizedEvent) -> RoutingDecision {
        self.router.route(event, &self.routing)
    }

    /// Route an event and deliver the resulting notifications
    pub async fn notify(&self, event: &ExecutionEvent) -> NotifyResult {
        let links = links_for(event);
        let decision = self
            .router
            .route(&NormalizedEvent::from_event(event, &links), &self.routing);
        let notification = Notification::from_event(event, &links);
        let delivery = self.dispatcher.dispatch(&decision, &notification).await;
        NotifyResult { decision, delivery }
    }
}

fn links_for(event: &ExecutionEvent) -> ApprovalLinks {
    if event.log.is_none() {
        return ApprovalLinks {
            resource_info: event.resource_info_column().unwrap_or_default(),
            ..Default::default()
        };
    }
    ApprovalCodec::decode_event(event).unwrap_or_else(|e| {
        debug!("[{}] Routing without approval links: {}", event.exec_id, e);
        ApprovalLinks {
            resource_info: event.resource_info_column().unwrap_or_default(),
            decode_error: Some(e.to_string()),
            ..Default::default()
        }
    })
}
