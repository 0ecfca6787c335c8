//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::config::Settings;
use crate::escalation::{Dispatcher, OpsgenieNotifier, SlackNotifier};
use crate::error::AppError;
use crate::governance::{GovernanceOptions, GovernanceService, HttpActionExecutor};
use crate::routing::{EnvSecrets, NotificationRouter, RoutingConfig, SecretResolver};
use crate::store::{EventStore, HttpEventStore, MemoryEventStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Application state shared across all handlers
pub struct AppState {
    /// Governance engine (reconciler, pending view, decisions, routing)
    pub governance: GovernanceService,

    /// Set when no orchestrator is configured; handlers may seed it in dev
    pub local_store: Option<MemoryEventStore>,
}

impl AppState {
    /// Wire the engine from settings
    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        let (store, local_store): (Arc<dyn EventStore>, Option<MemoryEventStore>) =
            match &settings.uplink.orchestrator_url {
                Some(url) => {
                    info!("Event store: orchestrator at {}", url);
                    let store = HttpEventStore::new(
                        url,
                        settings.uplink.function_key.clone(),
                        Duration::from_secs(settings.uplink.timeout_secs),
                    )?;
                    (Arc::new(store), None)
                }
                None => {
                    warn!("CLOUDO_ORCHESTRATOR_URL not set, using in-memory event store");
                    let store = MemoryEventStore::new();
                    (Arc::new(store.clone()), Some(store))
                }
            };

        let executor = HttpActionExecutor::new(Duration::from_secs(settings.approval.action_timeout_secs))?;
        let secrets: Arc<dyn SecretResolver> = Arc::new(EnvSecrets);
        let routing = RoutingConfig::load(&settings.routing);

        let client = reqwest::Client::builder()
            .user_agent(concat!("cloudo-governance/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        let dispatcher = Dispatcher::new(
            Arc::new(SlackNotifier::new(client.clone(), settings.notify.slack_api_url.clone())),
            Arc::new(OpsgenieNotifier::new(client, settings.notify.opsgenie_api_url.clone())),
            secrets.clone(),
            Duration::from_secs(settings.notify.timeout_secs),
        );

        let options = GovernanceOptions {
            approval_window: chrono::Duration::minutes(settings.approval.window_minutes),
            approval_secret: settings.approval.secret.clone(),
            approval_ttl: chrono::Duration::minutes(settings.approval.ttl_minutes),
            public_base_url: settings.public_base_url(),
            function_key: settings.uplink.function_key.clone(),
        };

        let governance = GovernanceService::new(
            store,
            Arc::new(executor),
            NotificationRouter::new(secrets),
            routing,
            dispatcher,
            options,
        );

        Ok(Self { governance, local_store })
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
