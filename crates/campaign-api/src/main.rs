//! HTTP entry point for the clinic campaign dispatcher.
//!
//! Accepts dispatch requests from the back office, runs campaigns in the
//! background and exposes their progress.

mod config;
mod error;
mod routes;
mod shutdown;
mod state;

use std::sync::Arc;

use campaign_dispatcher::{DispatchEngine, SqliteStore, Stores, WahaConnector};
use database::Database;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting campaign API");

    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    let shutdown = shutdown::install_signal_handler();
    let store = Arc::new(SqliteStore::new(db.clone()));
    let engine = DispatchEngine::new(Stores::shared(store), Arc::new(WahaConnector))
        .with_options(config.engine.clone())
        .with_shutdown(shutdown.clone());

    let state = AppState::new(db.clone(), engine);
    let app = routes::router().with_state(state.clone());

    info!(addr = %config.addr, "Campaign API listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    // Runs observe the same token and pause their campaigns.
    info!("Waiting for in-flight campaign runs");
    state.drain().await;
    db.close().await;

    Ok(())
}
