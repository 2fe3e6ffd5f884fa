use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, Response};
use tracing::error;

use crate::error::{UpstreamError, UpstreamResult};

pub mod b2;
pub mod beszel;
pub mod blinko;
pub mod buckets;
pub mod dawarich;
pub mod endpoints;
pub mod jellyfin;
pub mod markets;
pub mod pve;
pub mod qbittorrent;
pub mod s3;
pub mod uptime;
pub mod weather;

/// Shared HTTP client. Every upstream call inherits its overall timeout.
///
/// `accept_invalid_certs` is only set for hosts that serve self-signed
/// certificates on the LAN.
pub fn init_http_client(timeout: Duration, accept_invalid_certs: bool) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()?;
    Ok(client)
}

/// Binary units, one decimal: `1536` is `1.5 KB`.
pub fn format_bytes(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes <= 0 {
        return "0 B".to_string();
    }

    let bytes = bytes as f64;
    let exp = ((bytes.ln() / 1024f64.ln()).floor() as usize).min(UNITS.len() - 1);
    let value = (bytes / 1024f64.powi(exp as i32) * 10.0).round() / 10.0;
    format!("{} {}", value, UNITS[exp])
}

/// Passes 2xx responses through; anything else becomes `UpstreamError::Status`.
pub(crate) async fn ensure_success(provider: &'static str, response: Response) -> UpstreamResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    error!("{} API error: {} {}", provider, status.as_u16(), body);
    Err(UpstreamError::Status {
        provider,
        status: status.as_u16(),
    })
}
