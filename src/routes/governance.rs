//! Governance route handlers
//!
//! Executions, pending approvals and operator decisions.

use crate::error::{validation_error, ApiResult, AppError};
use crate::governance::approval::{IssuedLinks, RoutingInfo, USER_HEADER};
use crate::governance::{ApprovalPayload, Decision, DecisionResult, ExecutionState, PendingApproval};
use crate::models::{format_requested_at, partition_date, partition_key_at, ExecutionEvent, SuccessResponse, PARTITION_FORMAT};
use crate::state::SharedState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use validator::Validate;

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionsQuery {
    #[validate(custom(function = "validate_partition_key"))]
    pub partition_key: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PendingQuery {
    #[validate(custom(function = "validate_partition_key"))]
    pub partition_key: Option<String>,
    /// Number of day partitions to scan, ending at `partitionKey`
    #[validate(range(min = 1, max = 31, message = "days must be between 1 and 31"))]
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionListResponse {
    pub partition_key: String,
    pub executions: Vec<ExecutionState>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingListResponse {
    pub partitions: Vec<String>,
    pub items: Vec<PendingApproval>,
}

/// Fields of a new approval payload
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IssueLinksRequest {
    pub schema_id: Option<String>,
    pub url: Option<String>,
    pub severity: Option<String>,
    pub monitor_condition: Option<String>,
    pub worker: Option<String>,
    #[serde(alias = "resource_info")]
    pub resource_info: Option<Value>,
    #[serde(alias = "routing_info")]
    pub routing_info: Option<RoutingInfo>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTokenRequest {
    #[validate(length(min = 1, message = "execId is required"))]
    pub exec_id: String,
    #[validate(length(min = 1, message = "p is required"))]
    pub p: String,
    #[validate(length(min = 1, message = "s is required"))]
    pub s: String,
}

// =============================================================================
// HANDLERS
// =============================================================================

/// Reconciled executions of one day partition (default: today, orchestrator time)
pub async fn list_executions(
    State(state): State<SharedState>,
    Query(query): Query<ExecutionsQuery>,
) -> ApiResult<Json<SuccessResponse<ExecutionListResponse>>> {
    query.validate().map_err(|e| validation_error(e.to_string()))?;

    let partition_key = query.partition_key.unwrap_or_else(today_partition_key);
    let executions = state.governance.reconcile(&partition_key).await?;

    Ok(Json(SuccessResponse::with_data(
        format!("{} executions", executions.len()),
        ExecutionListResponse { partition_key, executions },
    )))
}

/// Record an execution event (in-memory store only)
pub async fn record_execution(
    State(state): State<SharedState>,
    Json(mut event): Json<ExecutionEvent>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<ExecutionEvent>>)> {
    let store = state
        .local_store
        .as_ref()
        .ok_or_else(|| validation_error("Event log is owned by the orchestrator; records are read-only"))?;

    if event.exec_id.trim().is_empty() {
        return Err(validation_error("ExecId is required"));
    }
    if event.partition_key.trim().is_empty() {
        event.partition_key = today_partition_key();
    }
    if event.requested_at.is_none() {
        event.requested_at = Some(format_requested_at(Utc::now()));
    }

    let stored = store.append(event).await;
    debug!("[{}] Recorded '{}' in {}", stored.exec_id, stored.status, stored.partition_key);

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data("Execution event recorded", stored)),
    ))
}

/// Executions awaiting a decision, most recent first
pub async fn list_pending(
    State(state): State<SharedState>,
    Query(query): Query<PendingQuery>,
) -> ApiResult<Json<SuccessResponse<PendingListResponse>>> {
    query.validate().map_err(|e| validation_error(e.to_string()))?;

    let now = Utc::now();
    let anchor = match &query.partition_key {
        Some(key) => parse_partition_key(key)?,
        None => partition_date(now),
    };
    let partitions = partition_range(anchor, query.days.unwrap_or(1));

    let items = if partitions.len() == 1 {
        state.governance.list_pending(&partitions[0], now).await?
    } else {
        state.governance.list_pending_range(&partitions, now).await?
    };

    Ok(Json(SuccessResponse::with_data(
        format!("{} executions pending approval", items.len()),
        PendingListResponse { partitions, items },
    )))
}

/// Approve or reject on behalf of the dashboard user
pub async fn decide(
    State(state): State<SharedState>,
    Path((partition_key, exec_id, decision)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> ApiResult<Json<SuccessResponse<DecisionResult>>> {
    parse_partition_key(&partition_key)?;
    let decision = Decision::parse(&decision)
        .ok_or_else(|| validation_error(format!("Unknown decision '{}' (expected approve or reject)", decision)))?;
    let approver = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| validation_error(format!("Missing {} header", USER_HEADER)))?;

    let result = state
        .governance
        .decide(&partition_key, &exec_id, decision, approver, Utc::now())
        .await?;

    info!("[{}] {} by {}", exec_id, decision, approver);
    Ok(Json(SuccessResponse::with_data(format!("{} sent", decision), result)))
}

/// Mint signed approve/reject links for an execution
pub async fn issue_links(
    State(state): State<SharedState>,
    Path((partition_key, exec_id)): Path<(String, String)>,
    Json(payload): Json<IssueLinksRequest>,
) -> ApiResult<Json<SuccessResponse<IssuedLinks>>> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;
    parse_partition_key(&partition_key)?;

    let approval = ApprovalPayload {
        schema_id: payload.schema_id,
        url: payload.url,
        severity: payload.severity,
        monitor_condition: payload.monitor_condition,
        worker: payload.worker,
        resource_info: payload.resource_info,
        routing_info: payload.routing_info,
        ..Default::default()
    };
    let links = state
        .governance
        .issue_links(&partition_key, &exec_id, approval, Utc::now())?;

    Ok(Json(SuccessResponse::with_data("Approval links issued", links)))
}

/// Check a signed approval token
pub async fn verify_token(
    State(state): State<SharedState>,
    Json(payload): Json<VerifyTokenRequest>,
) -> ApiResult<Json<SuccessResponse<ApprovalPayload>>> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let verified = state
        .governance
        .verify_token(&payload.exec_id, &payload.p, &payload.s, Utc::now())
        .map_err(|rejection| validation_error(format!("Token rejected: {}", rejection)))?;

    Ok(Json(SuccessResponse::with_data("Token valid", verified)))
}

// =============================================================================
// HELPERS
// =============================================================================

pub fn today_partition_key() -> String {
    partition_key_at(Utc::now())
}

fn parse_partition_key(key: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(key, PARTITION_FORMAT)
        .map_err(|_| validation_error(format!("Invalid partitionKey '{}' (expected YYYYMMDD)", key)))
}

/// `days` partitions ending at `anchor`, newest first
pub fn partition_range(anchor: NaiveDate, days: u32) -> Vec<String> {
    (0..days.max(1))
        .map(|offset| (anchor - Duration::days(offset as i64)).format(PARTITION_FORMAT).to_string())
        .collect()
}

fn validate_partition_key(key: &str) -> Result<(), validator::ValidationError> {
    if NaiveDate::parse_from_str(key, PARTITION_FORMAT).is_err() {
        let mut err = validator::ValidationError::new("invalid_partition_key");
        err.message = Some("partitionKey must be a YYYYMMDD day".into());
        return Err(err);
    }
    Ok(())
}
