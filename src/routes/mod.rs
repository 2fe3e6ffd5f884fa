use std::sync::Arc;

use axum::http::Method;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{UpstreamError, UpstreamResult};
use crate::state::AppState;

mod activity;
mod journey;
mod notes;
mod services;
mod weather;

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    let api = Router::new()
        .route("/dawarich", get(journey::get_journey))
        .route("/rss", get(notes::get_rss))
        .route(
            "/blinko",
            get(notes::list_todos)
                .post(notes::save_todo)
                .patch(notes::toggle_todo)
                .delete(notes::delete_todo),
        )
        .route("/markets", get(services::get_markets))
        .route("/uptime", get(services::get_uptime))
        .route("/beszel", get(services::get_systems))
        .route("/storage", get(services::get_storage))
        .route("/backups", get(services::get_backups))
        .route("/qbittorrent", get(activity::get_torrents))
        .route("/jellyfin", get(activity::get_playback))
        .route("/weather", get(weather::get_weather));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `YYYY-MM-DD` query parameter.
pub(crate) fn parse_day(value: &str) -> UpstreamResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| UpstreamError::InvalidQuery(format!("invalid date '{}'", value)))
}

pub(crate) fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::state::AppState;

    /// Router over a config built from `pairs`; every other key takes its default.
    pub fn router_with(pairs: &[(&str, &str)]) -> Router {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = AppConfig::from_lookup(|key| map.get(key).cloned());
        super::create_router(AppState::new(config).unwrap())
    }

    pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn get(router: Router, uri: &str) -> (StatusCode, Value) {
        send(router, Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn send_json(router: Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(router, request).await
    }
}
