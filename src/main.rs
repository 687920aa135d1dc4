//! Stargazer - planetary expedition assistant
//!
//! Streams assistant responses that mix generated text with calls to a
//! fixed set of expedition tools, driven by a pure orchestration state
//! machine.

mod api;
mod config;
mod planner;
mod runtime;
mod state_machine;
mod tools;
mod transcript;

use api::{create_router, AppState};
use config::Config;
use planner::KeywordPlanner;
use runtime::{RegistryToolExecutor, SessionManager};
use std::net::SocketAddr;
use std::sync::Arc;
use tools::ToolRegistry;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stargazer=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env()?;

    let registry = Arc::new(ToolRegistry::standard()?);
    tracing::info!(
        tools = ?registry.definitions().iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
        "Tool registry initialized"
    );

    let planner = Arc::new(KeywordPlanner::new()?);
    let sessions = Arc::new(SessionManager::new(
        planner,
        Arc::new(RegistryToolExecutor::new(registry)),
        config.turn,
    ));
    tracing::info!(
        planner = sessions.planner_name(),
        max_steps = config.turn.max_steps,
        timeout_secs = config.turn.timeout.as_secs(),
        "Session manager initialized"
    );

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(AppState::new(sessions))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Stargazer server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
