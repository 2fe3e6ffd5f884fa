mod auth;
mod config;
mod error;
mod fallback;
mod models;
mod processor;
mod routes;
mod server;
mod state;
mod upstream;

use config::AppConfig;
use state::AppState;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting Homelab Dashboard API...");

    // Shared HTTP client and per-integration clients
    let state = AppState::new(config)?;

    server::start_http_server(state).await?;

    Ok(())
}
