//! Error handling module
//!
//! Provides unified error types and handling for the governance engine.
//! Only uplink and action errors ever reach a caller; decode and team
//! resolution failures are recorded next to the result and never abort a pass.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Approval payload (`p` parameter) could not be decoded. Non-fatal.
    #[error("Approval payload decode failed: {0}")]
    DecodeFailed(String),

    /// Approve/reject endpoint could not be reached at all.
    #[error("Approval action endpoint unreachable: {0}")]
    ActionUnreachable(String),

    /// Approve/reject endpoint answered with a non-2xx status.
    #[error("Approval action failed with status {status}: {body}")]
    ActionFailed { status: u16, body: String },

    /// Routing action references a team missing from the teams table. Non-fatal.
    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    /// Event store query failed (transport, status or body shape).
    #[error("Uplink failed: {0}")]
    Uplink(String),

    /// Notification sink rejected or failed a send.
    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Stable machine-readable code for API consumers
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DecodeFailed(_) => "ERR_DECODE_FAILED",
            AppError::ActionUnreachable(_) => "ERR_ACTION_UNREACHABLE",
            AppError::ActionFailed { .. } => "ERR_ACTION_FAILED",
            AppError::UnknownTeam(_) => "ERR_UNKNOWN_TEAM",
            AppError::Uplink(_) => "UPLINK_FAILED",
            AppError::Notify(_) => "NOTIFY_FAILED",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_code = self.code();
        let (status, message, details) = match &self {
            AppError::DecodeFailed(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Approval payload could not be decoded".to_string(),
                Some(msg.clone()),
            ),
            AppError::ActionUnreachable(msg) => {
                error!("Approval action unreachable: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Approval endpoint unreachable".to_string(),
                    Some(msg.clone()),
                )
            }
            AppError::ActionFailed { status, body } => (
                StatusCode::BAD_GATEWAY,
                format!("Approval endpoint answered {}", status),
                Some(body.clone()),
            ),
            AppError::UnknownTeam(team) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Unknown team '{}'", team),
                None,
            ),
            AppError::Uplink(msg) => {
                error!("Uplink failed: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Uplink failed".to_string(),
                    Some(msg.clone()),
                )
            }
            AppError::Notify(msg) => (
                StatusCode::BAD_GATEWAY,
                "Notification failed".to_string(),
                Some(msg.clone()),
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone(), None),
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                    Some(msg.clone()),
                )
            }
            AppError::Config(msg) => {
                error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A configuration error occurred".to_string(),
                    Some(msg.clone()),
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            error: details,
            code: Some(error_code.to_string()),
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, AppError>;

/// Helper function to create a validation error
pub fn validation_error(msg: impl Into<String>) -> AppError {
    AppError::Validation(msg.into())
}

/// Helper function to create a not found error
pub fn not_found_error(msg: impl Into<String>) -> AppError {
    AppError::NotFound(msg.into())
}

/// Helper function to create a conflict error
pub fn conflict_error(msg: impl Into<String>) -> AppError {
    AppError::Conflict(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_match_engine_taxonomy() {
        assert_eq!(AppError::DecodeFailed("x".into()).code(), "ERR_DECODE_FAILED");
        assert_eq!(AppError::ActionUnreachable("x".into()).code(), "ERR_ACTION_UNREACHABLE");
        assert_eq!(AppError::UnknownTeam("ops".into()).code(), "ERR_UNKNOWN_TEAM");
        assert_eq!(AppError::Uplink("x".into()).code(), "UPLINK_FAILED");
    }

    #[test]
    fn test_action_failed_surfaces_status() {
        let err = AppError::ActionFailed { status: 409, body: "Already decided".into() };
        assert_eq!(err.to_string(), "Approval action failed with status 409: Already decided");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
