//! Event store access
//!
//! The execution log is an append-only table keyed by day partition. It is
//! owned by the orchestrator; this module only queries it (and, for local
//! runs and tests, keeps an in-memory copy).

use crate::error::AppError;
use crate::models::ExecutionEvent;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// Filter for one partition query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    /// Day partition, `YYYYMMDD`
    pub partition_key: String,
    pub exec_id: Option<String>,
    pub status: Option<String>,
    /// Free-text filter on name, runbook and log
    pub q: Option<String>,
}

impl LogQuery {
    pub fn partition(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            ..Default::default()
        }
    }

    pub fn with_exec_id(mut self, exec_id: impl Into<String>) -> Self {
        self.exec_id = Some(exec_id.into());
        self
    }
}

/// Read side of the execution log
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn query(&self, query: &LogQuery) -> Result<Vec<ExecutionEvent>, AppError>;
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    items: Vec<Value>,
}

/// Orchestrator-backed store (`GET {base}/logs/query`)
pub struct HttpEventStore {
    client: reqwest::Client,
    base_url: String,
    function_key: Option<String>,
    timeout: Duration,
}

impl HttpEventStore {
    pub fn new(base_url: &str, function_key: Option<String>, timeout: Duration) -> Result<Self, AppError> {
        url::Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("Invalid orchestrator URL '{}': {}", base_url, e)))?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("cloudo-governance/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            function_key,
            timeout,
        })
    }

    fn query_params(query: &LogQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![("partitionKey", query.partition_key.clone())];
        if let Some(exec_id) = &query.exec_id {
            params.push(("execId", exec_id.clone()));
        }
        if let Some(status) = &query.status {
            params.push(("status", status.clone()));
        }
        if let Some(q) = &query.q {
            params.push(("q", q.clone()));
        }
        params
    }
}

#[async_trait]
impl EventStore for HttpEventStore {
    async fn query(&self, query: &LogQuery) -> Result<Vec<ExecutionEvent>, AppError> {
        let mut request = self
            .client
            .get(format!("{}/logs/query", self.base_url))
            .query(&Self::query_params(query))
            .timeout(self.timeout);
        if let Some(key) = &self.function_key {
            request = request.header("x-functions-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Uplink(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Uplink(format!("log query answered {}: {}", status.as_u16(), body)));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| AppError::Uplink(format!("malformed log query response: {}", e)))?;

        Ok(parse_items(body.items, &query.partition_key))
    }
}

/// Parse records one by one; a bad record is skipped, not fatal
fn parse_items(items: Vec<Value>, partition_key: &str) -> Vec<ExecutionEvent> {
    let total = items.len();
    let events: Vec<ExecutionEvent> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<ExecutionEvent>(item) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!("Skipping malformed log record in {}: {}", partition_key, e);
                None
            }
        })
        .collect();
    debug!("Fetched {}/{} records for partition {}", events.len(), total, partition_key);
    events
}

/// In-memory store for local runs and tests
#[derive(Clone, Default)]
pub struct MemoryEventStore {
    events: Arc<RwLock<Vec<ExecutionEvent>>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, assigning a row key when missing
    pub async fn append(&self, mut event: ExecutionEvent) -> ExecutionEvent {
        if event.row_key.trim().is_empty() {
            event.row_key = Uuid::new_v4().to_string();
        }
        self.events.write().await.push(event.clone());
        event
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn query(&self, query: &LogQuery) -> Result<Vec<ExecutionEvent>, AppError> {
        let needle = query.q.as_deref().map(str::to_lowercase);
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| e.partition_key == query.partition_key)
            .filter(|e| query.exec_id.as_deref().map_or(true, |id| e.exec_id == id))
            .filter(|e| {
                query
                    .status
                    .as_deref()
                    .map_or(true, |s| e.status.trim().eq_ignore_ascii_case(s.trim()))
            })
            .filter(|e| needle.as_deref().map_or(true, |n| matches_text(e, n)))
            .cloned()
            .collect())
    }
}

fn matches_text(event: &ExecutionEvent, needle: &str) -> bool {
    [
        Some(event.exec_id.clone()),
        event.name.clone(),
        event.runbook.clone(),
        event.log_text(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}
