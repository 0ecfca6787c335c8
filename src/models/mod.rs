//! Data models and DTOs (Data Transfer Objects)
//!
//! Execution log records, status vocabulary and the response envelopes
//! used by the API.

pub mod event;
pub mod status;

// Re-export commonly used types
pub use event::*;
pub use status::*;

use serde::Serialize;

/// Generic success response
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}
