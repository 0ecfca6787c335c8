//! ClouDO Execution Governance Engine
//!
//! Sits between the runbook orchestrator and its operators:
//! - Reconciles the append-only execution log into one state per execution
//! - Lists executions waiting on a human approve/reject decision
//! - Executes decisions against the orchestrator's signed action URLs
//! - Routes execution events to Slack channels and Opsgenie teams

mod config;
mod error;
mod escalation;
mod governance;
mod models;
mod routes;
mod routing;
mod state;
mod store;

use crate::config::Settings;
use crate::routes::create_router;
use crate::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting ClouDO Execution Governance Engine...");

    // Load configuration
    let settings = Settings::load()?;
    info!("📋 Configuration loaded successfully");
    info!("   {:?}", settings.approval);

    let state = Arc::new(AppState::from_settings(&settings)?);
    let routing = state.governance.routing_config();
    info!("✅ Routing loaded: {} rules, {} teams", routing.rules.len(), routing.teams.len());

    // Build the router
    let app = create_router(state, &settings);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints:");
    info!("   ─── Executions ───");
    info!("   GET  /api/executions                          - Reconciled executions of a day");
    info!("   POST /api/executions                          - Record an event (in-memory store)");
    info!("");
    info!("   ─── Approvals ───");
    info!("   GET  /api/approvals/pending                   - Executions awaiting a decision");
    info!("   POST /api/approvals/:partition/:id/approve    - Approve (x-cloudo-user)");
    info!("   POST /api/approvals/:partition/:id/reject     - Reject (x-cloudo-user)");
    info!("   POST /api/approvals/:partition/:id/links      - Mint signed links");
    info!("   POST /api/approvals/verify                    - Check a signed token");
    info!("");
    info!("   ─── Routing ───");
    info!("   GET  /api/routing/config                      - Active routing rules");
    info!("   POST /api/routing/evaluate                    - Dry-run routing");
    info!("   POST /api/routing/notify                      - Route and deliver");
    info!("");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cloudo_governance=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
