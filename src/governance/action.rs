//! Approval action execution
//!
//! Performs the approve/reject GET against the URL embedded in the log. The
//! endpoint owns the state transition; this side only reports what happened.

use crate::error::AppError;
use crate::governance::approval::ActionRequest;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// Result of an approve/reject call that did not fail outright
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Endpoint answered 2xx
    Accepted { status: u16, body: String },
    /// No answer in time; the event store must be re-read to know the result
    Inconclusive { reason: String },
}

/// Executes approve/reject requests
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, request: &ActionRequest) -> Result<ActionOutcome, AppError>;
}

/// reqwest-backed executor with an explicit timeout
pub struct HttpActionExecutor {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpActionExecutor {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("cloudo-governance/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl ActionExecutor for HttpActionExecutor {
    async fn execute(&self, request: &ActionRequest) -> Result<ActionOutcome, AppError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| AppError::Internal(format!("Invalid method {}: {}", request.method, e)))?;

        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(self.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!("Approval action timed out after {:?}", self.timeout);
                return Ok(ActionOutcome::Inconclusive {
                    reason: format!("no response within {}s", self.timeout.as_secs()),
                });
            }
            Err(e) => return Err(AppError::ActionUnreachable(e.without_url().to_string())),
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => {
                return Ok(ActionOutcome::Inconclusive {
                    reason: format!("status {} but body timed out", status),
                });
            }
            Err(e) => format!("<unreadable body: {}>", e),
        };

        if (200..300).contains(&status) {
            info!("Approval action accepted with status {}", status);
            Ok(ActionOutcome::Accepted { status, body })
        } else {
            Err(AppError::ActionFailed { status, body })
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use tokio::sync::Mutex;

    /// Records requests and replays a canned result
    pub struct RecordingExecutor {
        pub requests: Mutex<Vec<ActionRequest>>,
        result: Result<ActionOutcome, (u16, String)>,
    }

    impl RecordingExecutor {
        pub fn accepting() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                result: Ok(ActionOutcome::Accepted { status: 200, body: "ok".into() }),
            }
        }

        pub fn with_outcome(outcome: ActionOutcome) -> Self {
            Self { requests: Mutex::new(Vec::new()), result: Ok(outcome) }
        }

        pub fn failing(status: u16, body: &str) -> Self {
            Self { requests: Mutex::new(Vec::new()), result: Err((status, body.to_string())) }
        }
    }

    #[async_trait]
    impl ActionExecutor for RecordingExecutor {
        async fn execute(&self, request: &ActionRequest) -> Result<ActionOutcome, AppError> {
            self.requests.lock().await.push(request.clone());
            match &self.result {
                Ok(outcome) => Ok(outcome.clone()),
                Err((status, body)) => Err(AppError::ActionFailed { status: *status, body: body.clone() }),
            }
        }
    }
}
