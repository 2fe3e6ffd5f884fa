use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::routes::create_router;
use crate::state::AppState;

/// Binds the dashboard API and serves it until Ctrl+C or SIGTERM.
pub async fn start_http_server(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = state.config.bind_address();
    log_integrations(&state.config);

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn log_integrations(config: &AppConfig) {
    let status = |configured: bool| if configured { "live" } else { "mock" };

    info!("Display timezone: {}", config.display_timezone);
    info!("Dawarich: {}", status(config.dawarich_api_key.is_some()));
    info!("Blinko: {}", status(config.blinko_api_token.is_some()));
    info!(
        "Beszel: {}",
        status(config.beszel_email.is_some() && config.beszel_password.is_some())
    );
    info!("qBittorrent: {}", status(config.qbit_password.is_some()));
    info!("Jellyfin: {}", status(config.jellyfin_api_key.is_some()));
    info!("PVE storage: {}", status(config.pve_password.is_some()));
    info!(
        "Backblaze B2: {}",
        status(config.b2_key_id.is_some() && config.b2_app_key.is_some() && config.b2_bucket.is_some())
    );
    info!(
        "S3: {}",
        status(config.s3_access_key_id.is_some() && config.s3_secret_access_key.is_some() && config.s3_bucket.is_some())
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
