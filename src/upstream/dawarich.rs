use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::{UpstreamError, UpstreamResult};
use crate::models::point::{GpsPoint, PointsResponse};
use crate::upstream::endpoints::{DAWARICH_PAGE_SIZE, DAWARICH_POINTS};
use crate::upstream::ensure_success;

pub const PROVIDER: &str = "dawarich";

pub struct DawarichClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl DawarichClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key,
        }
    }

    pub fn from_config(http: Client, config: &AppConfig) -> Self {
        Self::new(http, config.dawarich_url.clone(), config.dawarich_api_key.clone())
    }

    /// Points recorded in `[start, end]`, in the order Dawarich returns them.
    /// Samples without a usable position or time are skipped.
    pub async fn fetch_points(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> UpstreamResult<Vec<GpsPoint>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(UpstreamError::NotConfigured(PROVIDER))?;

        let start_at = start.to_rfc3339_opts(SecondsFormat::Millis, true);
        let end_at = end.to_rfc3339_opts(SecondsFormat::Millis, true);
        let per_page = DAWARICH_PAGE_SIZE.to_string();
        debug!("Fetching Dawarich points {} .. {}", start_at, end_at);

        let response = self
            .http
            .get(format!("{}{}", self.base_url, DAWARICH_POINTS))
            .query(&[
                ("api_key", api_key),
                ("start_at", start_at.as_str()),
                ("end_at", end_at.as_str()),
                ("per_page", per_page.as_str()),
            ])
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(UpstreamError::unreachable(PROVIDER))?;

        let response = ensure_success(PROVIDER, response).await?;
        let payload: PointsResponse = response.json().await.map_err(UpstreamError::decode(PROVIDER))?;

        let raw = payload.into_points();
        let total = raw.len();
        let points: Vec<GpsPoint> = raw.iter().filter_map(GpsPoint::from_raw).collect();

        if points.len() < total {
            warn!("Dropped {} Dawarich points without position or time", total - points.len());
        }

        Ok(points)
    }
}
