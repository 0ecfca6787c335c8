//! Slack sink (`chat.postMessage`)

use super::{Notification, Notifier};
use crate::error::AppError;
use crate::routing::engine::{Action, ActionKind};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";

#[derive(Debug, Deserialize)]
struct SlackResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

pub struct SlackNotifier {
    client: reqwest::Client,
    api_url: String,
}

impl SlackNotifier {
    pub fn new(client: reqwest::Client, api_url: Option<String>) -> Self {
        Self {
            client,
            api_url: api_url
                .unwrap_or_else(|| DEFAULT_SLACK_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn kind(&self) -> ActionKind {
        ActionKind::Slack
    }

    async fn send(&self, action: &Action, notification: &Notification) -> Result<(), AppError> {
        let token = action
            .token
            .as_deref()
            .ok_or_else(|| AppError::Notify("missing Slack token".to_string()))?;
        let channel = action
            .channel
            .as_deref()
            .ok_or_else(|| AppError::Notify("missing Slack channel".to_string()))?;

        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.api_url))
            .bearer_auth(token)
            .json(&json!({
                "channel": channel,
                "text": format!("{}\n{}", notification.title, notification.body),
            }))
            .send()
            .await
            .map_err(|e| AppError::Notify(format!("Slack unreachable: {}", e.without_url())))?;

        if !response.status().is_success() {
            return Err(AppError::Notify(format!("Slack answered {}", response.status())));
        }

        let body: SlackResponse = response
            .json()
            .await
            .map_err(|e| AppError::Notify(format!("Slack response unreadable: {}", e)))?;
        if !body.ok {
            return Err(AppError::Notify(format!(
                "Slack rejected message: {}",
                body.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }

        info!("[{}] Slack message posted to {}", notification.exec_id, channel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_token_is_rejected_before_sending() {
        let notifier = SlackNotifier::new(reqwest::Client::new(), Some("http://127.0.0.1:9/".into()));
        let action = Action::slack(Some("ops".into()), Some("#ops".into()), None);
        let err = notifier.send(&action, &Notification::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Notification failed: missing Slack token");
    }

    #[test]
    fn test_api_url_is_normalized() {
        let notifier = SlackNotifier::new(reqwest::Client::new(), Some("https://slack.example/api/".into()));
        assert_eq!(notifier.api_url, "https://slack.example/api");
        let default = SlackNotifier::new(reqwest::Client::new(), None);
        assert_eq!(default.api_url, DEFAULT_SLACK_API_URL);
    }
}
