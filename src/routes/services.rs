use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use tracing::warn;

use crate::error::{UpstreamError, UpstreamResult};
use crate::fallback::{fetch_with_fallback, Envelope, Listing};
use crate::models::backup::BackupInfo;
use crate::models::market::MarketQuote;
use crate::models::monitor::Monitor;
use crate::models::storage::StoragePool;
use crate::models::system::SystemStats;
use crate::state::AppState;
use crate::upstream::{beszel, markets, pve, uptime};

const BACKUPS: &str = "backups";

/// Partial results are normal here, so this endpoint never falls back.
pub async fn get_markets(State(state): State<Arc<AppState>>) -> Json<Envelope<Listing<Vec<MarketQuote>>>> {
    let quotes = state.markets.fetch_all().await;
    Json(Envelope::live(Listing::new(quotes), markets::PROVIDER))
}

pub async fn get_uptime(State(state): State<Arc<AppState>>) -> Json<Envelope<Listing<Vec<Monitor>>>> {
    let primary = async { Ok::<_, UpstreamError>(Listing::new(state.uptime.fetch_monitors().await?)) };
    Json(fetch_with_fallback(uptime::PROVIDER, primary, |_| Listing::new(Monitor::demo())).await)
}

pub async fn get_systems(State(state): State<Arc<AppState>>) -> Json<Envelope<Listing<Vec<SystemStats>>>> {
    let primary = async { Ok::<_, UpstreamError>(Listing::new(state.beszel.fetch_systems().await?)) };
    Json(fetch_with_fallback(beszel::PROVIDER, primary, |_| Listing::new(SystemStats::demo())).await)
}

pub async fn get_storage(State(state): State<Arc<AppState>>) -> Json<Envelope<Listing<Vec<StoragePool>>>> {
    let primary = async { Ok::<_, UpstreamError>(Listing::new(state.pve.fetch_pools().await?)) };
    Json(fetch_with_fallback(pve::PROVIDER, primary, |_| Listing::new(StoragePool::demo())).await)
}

/// Every target that answered becomes a row; targets without credentials are
/// skipped. With no rows, the first real failure decides the envelope.
fn merge_backups(results: Vec<UpstreamResult<BackupInfo>>) -> UpstreamResult<Vec<BackupInfo>> {
    let mut rows = Vec::new();
    let mut failure = None;

    for result in results {
        match result {
            Ok(row) => rows.push(row),
            Err(e) if e.is_not_configured() => {}
            Err(e) => {
                warn!("Backup target failed: {}", e);
                failure.get_or_insert(e);
            }
        }
    }

    if !rows.is_empty() {
        return Ok(rows);
    }
    Err(failure.unwrap_or(UpstreamError::NotConfigured(BACKUPS)))
}

pub async fn get_backups(State(state): State<Arc<AppState>>) -> Json<Envelope<Listing<Vec<BackupInfo>>>> {
    let primary = async {
        let (b2, s3) = futures::join!(state.b2.fetch_backup(), state.s3.fetch_backup());
        Ok::<_, UpstreamError>(Listing::new(merge_backups(vec![b2, s3])?))
    };
    Json(fetch_with_fallback(BACKUPS, primary, |_| Listing::new(BackupInfo::demo())).await)
}
