//! Notification routing route handlers

use crate::error::{validation_error, ApiResult};
use crate::governance::NotifyResult;
use crate::models::{ExecutionEvent, SuccessResponse};
use crate::routing::{NormalizedEvent, RoutingConfig, RoutingDecision};
use crate::state::SharedState;
use axum::{extract::State, Json};
use tracing::info;

/// Active routing document with credentials masked
pub async fn get_config(State(state): State<SharedState>) -> ApiResult<Json<SuccessResponse<RoutingConfig>>> {
    let config = state.governance.routing_config();
    Ok(Json(SuccessResponse::with_data(
        format!("{} routing rules", config.rules.len()),
        config,
    )))
}

/// Dry-run routing for a normalized event; nothing is sent
pub async fn evaluate(
    State(state): State<SharedState>,
    Json(event): Json<NormalizedEvent>,
) -> ApiResult<Json<SuccessResponse<RoutingDecision>>> {
    let decision = state.governance.route_normalized(&event);
    Ok(Json(SuccessResponse::with_data(
        format!("{} actions", decision.actions.len()),
        decision,
    )))
}

/// Route an execution event and deliver its notifications
pub async fn notify(
    State(state): State<SharedState>,
    Json(event): Json<ExecutionEvent>,
) -> ApiResult<Json<SuccessResponse<NotifyResult>>> {
    if event.exec_id.trim().is_empty() {
        return Err(validation_error("ExecId is required"));
    }

    let result = state.governance.notify(&event).await;
    info!(
        "[{}] Routed to {} actions, {} delivered",
        event.exec_id,
        result.decision.actions.len(),
        result.delivery.delivered()
    );

    Ok(Json(SuccessResponse::with_data("Notifications dispatched", result)))
}
