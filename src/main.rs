//! Wallet Ledger Service - Main Application Entry Point
//!
//! REST API over the wallet ledger, transaction engine and payment method
//! validator, backed by an in-memory store.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Storage**: in-memory maps with one lock per entity
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Build the shared state (registry, services, store)
//! 3. Start the expiry sweeper (transactions and payment methods)
//! 4. Build the HTTP router
//! 5. Start server on configured port

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use wallet_ledger::{config::Config, routes, services::expiry_sweeper, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG, defaults to "info"
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!(?config, "Configuration loaded");

    let state = AppState::new(&config);

    let sweep_interval = Duration::from_secs(config.expiry_sweep_interval_secs.max(1));
    expiry_sweeper::spawn(
        Arc::clone(&state.store),
        Arc::clone(&state.payment_methods),
        sweep_interval,
    );
    tracing::info!(interval_secs = config.expiry_sweep_interval_secs, "Expiry sweeper started");

    let app = routes::router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
