//! SmartApp bridge
//!
//! Receives SmartThings SmartApp lifecycle callbacks, keeps the app's
//! device subscriptions in sync with the user's selection, and streams
//! normalized occupancy updates to WebSocket clients.

mod api;
mod commands;
mod config;
mod error;
mod events;
mod health;
mod lifecycle;
mod models;
mod realtime;
mod smartthings;
mod state;
mod subscription;
mod worker;

use std::net::SocketAddr;
use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::health::KeepAlive;
use crate::smartthings::SmartThingsClient;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smartapp_bridge=info,tower_http=debug".into()),
        )
        .init();

    tracing::info!("Starting SmartApp bridge...");

    // Load configuration
    let config = config::Config::load()?;
    tracing::info!(
        "Configuration loaded (subscribing to {}/{})",
        config.subscription.capability,
        config.subscription.attribute
    );

    // Shared HTTP client for confirmation and keep-alive requests
    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()?;

    let directory = Arc::new(SmartThingsClient::new(&config.smartthings.api_base_url)?);
    let app_state = AppState::new(&config, directory, http_client.clone());

    start_background_tasks(&config, http_client);

    // Build application router
    let cors = CorsLayer::permissive();

    let app = api::routes(&config.server.webhook_path, config.server.max_body_bytes)
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        );

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!(
        "Listening on {} (webhook: {}, realtime: /ws)",
        addr,
        config.server.webhook_path
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Start background tasks (keep-alive)
fn start_background_tasks(config: &config::Config, http_client: reqwest::Client) {
    if let Some(url) = &config.server.keepalive_url {
        let keepalive = Arc::new(KeepAlive::new(
            http_client,
            url.clone(),
            config.server.keepalive_interval_secs,
        ));
        tokio::spawn(async move {
            keepalive.start().await;
        });
        tracing::info!("Background tasks started");
    }
}
