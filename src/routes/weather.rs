use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::error::UpstreamError;
use crate::fallback::{fetch_with_fallback, Envelope};
use crate::models::weather::WeatherReport;
use crate::state::AppState;
use crate::upstream::weather;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherBody {
    pub data: WeatherReport,
    pub detected_ip: Option<String>,
}

/// Caller address as reported by the reverse proxy in front of us.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header("cf-connecting-ip")
        .or_else(|| header("x-forwarded-for").and_then(|v| v.split(',').next()).map(str::trim))
        .or_else(|| header("x-real-ip"))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub async fn get_weather(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<Envelope<WeatherBody>> {
    let ip = client_ip(&headers);

    let primary = async {
        let data = state.weather.fetch_for_client(ip.as_deref()).await?;
        Ok::<_, UpstreamError>(WeatherBody {
            data,
            detected_ip: ip.clone(),
        })
    };

    let envelope = fetch_with_fallback(weather::PROVIDER, primary, |_| WeatherBody {
        data: WeatherReport::unavailable(&state.weather.default_location().city),
        detected_ip: ip.clone(),
    })
    .await;

    Json(envelope)
}
