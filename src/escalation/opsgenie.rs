//! Opsgenie sink
//!
//! Creates an alert aliased by exec id, or closes that alert when the
//! monitor condition is `Resolved`.

use super::{Notification, Notifier};
use crate::error::AppError;
use crate::routing::engine::{Action, ActionKind};
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

pub const DEFAULT_OPSGENIE_API_URL: &str = "https://api.opsgenie.com";

/// Opsgenie caps alert messages at 130 characters
const MAX_MESSAGE_CHARS: usize = 130;

pub struct OpsgenieNotifier {
    client: reqwest::Client,
    api_url: String,
}

impl OpsgenieNotifier {
    pub fn new(client: reqwest::Client, api_url: Option<String>) -> Self {
        Self {
            client,
            api_url: api_url
                .unwrap_or_else(|| DEFAULT_OPSGENIE_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn create_body(notification: &Notification) -> serde_json::Value {
        let message: String = notification.title.chars().take(MAX_MESSAGE_CHARS).collect();
        json!({
            "message": message,
            "description": notification.body,
            "alias": notification.exec_id,
            "priority": notification.priority,
            "tags": notification.tags,
            "details": notification.details,
        })
    }

    fn close_url(&self, alias: &str) -> String {
        format!(
            "{}/v2/alerts/{}/close?identifierType=alias",
            self.api_url,
            urlencoding::encode(alias)
        )
    }
}

#[async_trait]
impl Notifier for OpsgenieNotifier {
    fn kind(&self) -> ActionKind {
        ActionKind::Opsgenie
    }

    async fn send(&self, action: &Action, notification: &Notification) -> Result<(), AppError> {
        let api_key = action
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Notify("missing Opsgenie apiKey".to_string()))?;

        let request = if notification.is_resolved() {
            if notification.exec_id.is_empty() {
                return Err(AppError::Notify("cannot close alert without alias".to_string()));
            }
            self.client
                .post(self.close_url(&notification.exec_id))
                .json(&json!({"user": "cloudo", "note": "Auto-closed on resolve"}))
        } else {
            self.client
                .post(format!("{}/v2/alerts", self.api_url))
                .json(&Self::create_body(notification))
        };

        let response = request
            .header("Authorization", format!("GenieKey {}", api_key))
            .send()
            .await
            .map_err(|e| AppError::Notify(format!("Opsgenie unreachable: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Notify(format!("Opsgenie answered {}: {}", status.as_u16(), body)));
        }

        if notification.is_resolved() {
            info!("[{}] Opsgenie alert closed (team={:?})", notification.exec_id, action.team);
        } else {
            info!("[{}] Opsgenie alert created (team={:?})", notification.exec_id, action.team);
        }
        Ok(())
    }
}
