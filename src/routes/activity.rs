use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::fallback::{fetch_with_fallback, Envelope};
use crate::state::AppState;
use crate::upstream::jellyfin::{self, SessionReport};
use crate::upstream::qbittorrent::{self, TorrentReport};

pub async fn get_torrents(State(state): State<Arc<AppState>>) -> Json<Envelope<TorrentReport>> {
    let envelope = fetch_with_fallback(qbittorrent::PROVIDER, state.qbittorrent.fetch_report(), |_| {
        TorrentReport::empty()
    })
    .await;
    Json(envelope)
}

pub async fn get_playback(State(state): State<Arc<AppState>>) -> Json<Envelope<SessionReport>> {
    let envelope = fetch_with_fallback(jellyfin::PROVIDER, state.jellyfin.fetch_report(), |_| {
        SessionReport::empty()
    })
    .await;
    Json(envelope)
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{get, router_with};
    use axum::http::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_qbittorrent_body_shape() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v2/auth/login"))
            .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "SID=s1; path=/"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/torrents/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "hash": "a", "name": "fast", "progress": 0.5, "dlspeed": 5242880, "state": "downloading", "eta": 30 },
                { "hash": "b", "name": "slow", "progress": 0.1, "dlspeed": 10, "state": "stalledDL", "eta": -1 }
            ])))
            .mount(&server)
            .await;

        let uri = server.uri();
        let router = router_with(&[("QBIT_URL", uri.as_str()), ("QBIT_PASSWORD", "pw")]);
        let (status, body) = get(router, "/api/qbittorrent").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "qbittorrent");
        assert_eq!(body["totalTorrents"], 2);
        assert_eq!(body["filteredCount"], 1);
        assert_eq!(body["torrents"][0]["progress"], 50);
        assert_eq!(body["data"][0]["type"], "qbittorrent");
        assert_eq!(body["data"][0]["subtitle"], "50% · 5 MB/s · ETA: 30s");
    }

    #[tokio::test]
    async fn test_qbittorrent_unconfigured_is_empty_mock() {
        let (_, body) = get(router_with(&[]), "/api/qbittorrent").await;
        assert_eq!(body["success"], true);
        assert_eq!(body["source"], "mock");
        assert_eq!(body["data"], json!([]));
        assert_eq!(body["torrents"], json!([]));
    }

    #[tokio::test]
    async fn test_jellyfin_failure_is_unsuccessful_mock() {
        let server = MockServer::start().await;
        let uri = server.uri();
        let router = router_with(&[("JELLYFIN_URL", uri.as_str()), ("JELLYFIN_API_KEY", "k")]);
        let (status, body) = get(router, "/api/jellyfin").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["sessions"], json!([]));
        assert_eq!(body["error"], "jellyfin API error: 404");
    }
}
