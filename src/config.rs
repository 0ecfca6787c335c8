//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use crate::routing::RoutingSource;
use serde::Deserialize;
use std::net::Ipv4Addr;
use thiserror::Error;
use tracing::warn;

/// Upper bound for minute-valued settings (one week)
pub const MAX_MINUTES: u64 = 7 * 24 * 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(0, 0, 0, 0), // Bind to 0.0.0.0 for Docker
            port: 3000,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3001".to_string()],
        }
    }
}

/// Orchestrator event query API
#[derive(Debug, Clone)]
pub struct UplinkConfig {
    /// Unset means the in-memory store is used
    pub orchestrator_url: Option<String>,
    pub function_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            orchestrator_url: None,
            function_key: None,
            timeout_secs: 10,
        }
    }
}

/// Approval view and token settings
#[derive(Clone)]
pub struct ApprovalConfig {
    pub window_minutes: i64,
    pub action_timeout_secs: u64,
    pub secret: String,
    pub ttl_minutes: i64,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            window_minutes: 60,
            action_timeout_secs: 15,
            secret: "default".to_string(),
            ttl_minutes: 60,
        }
    }
}

impl std::fmt::Debug for ApprovalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalConfig")
            .field("window_minutes", &self.window_minutes)
            .field("action_timeout_secs", &self.action_timeout_secs)
            .field("secret", &"<redacted>")
            .field("ttl_minutes", &self.ttl_minutes)
            .finish()
    }
}

/// Notification sinks
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub timeout_secs: u64,
    pub slack_api_url: Option<String>,
    pub opsgenie_api_url: Option<String>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            slack_api_url: None,
            opsgenie_api_url: None,
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub uplink: UplinkConfig,
    pub approval: ApprovalConfig,
    pub notify: NotifyConfig,
    pub routing: RoutingSource,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let number = |key: &str, default: u64| -> Result<u64, ConfigError> {
            match non_empty(key) {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(format!("{} must be a positive integer, got '{}'", key, raw))),
                None => Ok(default),
            }
        };
        let minutes = |key: &str, default: u64| -> Result<i64, ConfigError> {
            let value = number(key, default)?;
            if value > MAX_MINUTES {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must be at most {} minutes, got {}",
                    key, MAX_MINUTES, value
                )));
            }
            Ok(value as i64)
        };

        let server = ServerConfig {
            host: non_empty("HOST")
                .and_then(|h| h.parse().ok())
                .unwrap_or_else(|| ServerConfig::default().host),
            port: non_empty("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(|| ServerConfig::default().port),
        };

        let cors = CorsConfig {
            allowed_origins: non_empty("ALLOWED_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|| CorsConfig::default().allowed_origins),
        };

        let orchestrator_url = non_empty("CLOUDO_ORCHESTRATOR_URL");
        if let Some(raw) = &orchestrator_url {
            url::Url::parse(raw)
                .map_err(|e| ConfigError::InvalidValue(format!("CLOUDO_ORCHESTRATOR_URL: {}", e)))?;
        }
        let uplink = UplinkConfig {
            orchestrator_url,
            function_key: non_empty("CLOUDO_FUNCTION_KEY"),
            timeout_secs: number("CLOUDO_UPLINK_TIMEOUT_SECS", 10)?,
        };

        let secret = match non_empty("APPROVAL_SECRET") {
            Some(secret) => secret,
            None => {
                warn!("APPROVAL_SECRET not set, using default (INSECURE - set in production!)");
                "default".to_string()
            }
        };
        let approval = ApprovalConfig {
            window_minutes: minutes("APPROVAL_WINDOW_MINUTES", 60)?,
            action_timeout_secs: number("APPROVAL_ACTION_TIMEOUT_SECS", 15)?,
            secret,
            ttl_minutes: minutes("APPROVAL_TTL_MINUTES", 60)?,
        };

        let notify = NotifyConfig {
            timeout_secs: number("NOTIFY_TIMEOUT_SECS", 10)?,
            slack_api_url: non_empty("SLACK_API_URL"),
            opsgenie_api_url: non_empty("OPSGENIE_API_URL"),
        };

        let routing = RoutingSource {
            inline: non_empty("ROUTING_RULES"),
            file: non_empty("ROUTING_RULES_FILE"),
            default_slack_channel: non_empty("SLACK_CHANNEL_DEFAULT"),
        };

        Ok(Self {
            server,
            cors,
            uplink,
            approval,
            notify,
            routing,
        })
    }

    /// Base URL for minted approve/reject links
    pub fn public_base_url(&self) -> String {
        self.uplink
            .orchestrator_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.server.port))
    }
}
