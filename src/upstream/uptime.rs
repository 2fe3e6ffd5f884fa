use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::{UpstreamError, UpstreamResult};
use crate::models::monitor::Monitor;
use crate::upstream::endpoints::{UPTIME_METRICS, UPTIME_STATUS_PAGE};
use crate::upstream::ensure_success;

pub const PROVIDER: &str = "uptime-kuma";

lazy_static! {
    static ref STATUS_LINE: Regex = Regex::new(r#"monitor_status\{monitor_name="([^"]+)".*\}\s+(\d+)"#).unwrap();
    static ref RESPONSE_TIME_LINE: Regex =
        Regex::new(r#"monitor_response_time\{monitor_name="([^"]+)".*\}\s+([\d.]+)"#).unwrap();
}

/// Lowercased Uptime Kuma monitor name to dashboard display name.
const SERVICE_NAMES: &[(&str, &str)] = &[
    ("jellyfin", "Jellyfin"),
    ("sonarr", "Sonarr"),
    ("radarr", "Radarr"),
    ("ollama", "Ollama"),
    ("comfyui", "ComfyUI"),
    ("n8n", "n8n"),
    ("portainer", "Portainer"),
    ("adguard", "AdGuard"),
    ("prowlarr", "Prowlarr"),
    ("bazarr", "Bazarr"),
    ("qbittorrent", "qBittorrent"),
    ("qbit", "qBittorrent"),
    ("jellyseerr", "Jellyseerr"),
    ("freshrss", "FreshRSS"),
    ("uptime kuma", "Uptime Kuma"),
    ("uptime", "Uptime Kuma"),
    ("beszel", "Beszel"),
    ("dawarich", "Dawarich"),
    ("blinko", "Blinko"),
    ("forgejo", "Forgejo"),
    ("gitea", "Forgejo"),
    ("open webui", "Open WebUI"),
    ("chat", "Open WebUI"),
    ("dozzle", "Dozzle"),
    ("syncthing", "Syncthing"),
    ("mt photos", "MT Photos"),
    ("photos", "MT Photos"),
    ("reactive resume", "Reactive Resume"),
    ("resume", "Reactive Resume"),
];

pub fn normalize_service_name(name: &str) -> String {
    let lower = name.to_lowercase();
    SERVICE_NAMES
        .iter()
        .find(|(key, _)| *key == lower)
        .map(|(_, display)| display.to_string())
        .unwrap_or_else(|| name.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusPage {
    #[serde(default)]
    public_group_list: Vec<MonitorGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MonitorGroup {
    #[serde(default)]
    monitor_list: Vec<StatusPageMonitor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusPageMonitor {
    id: i64,
    name: String,
    #[serde(default)]
    status: Option<i64>,
    #[serde(default)]
    uptime24: Option<f64>,
    #[serde(default)]
    uptime: Option<f64>,
    #[serde(default)]
    avg_ping: Option<f64>,
}

impl From<StatusPageMonitor> for Monitor {
    fn from(m: StatusPageMonitor) -> Self {
        let uptime = [m.uptime24, m.uptime]
            .into_iter()
            .flatten()
            .find(|u| *u != 0.0)
            .unwrap_or(100.0);

        Monitor {
            id: m.id,
            name: normalize_service_name(&m.name),
            // 1 = up, 0 = down, 2 = pending
            status: m.status == Some(1),
            uptime,
            response_time: m.avg_ping.unwrap_or(0.0),
        }
    }
}

/// Reads `monitor_status` and `monitor_response_time` samples from a Prometheus
/// exposition. Monitors keep the order their status line first appears in.
pub fn parse_metrics(text: &str) -> Vec<Monitor> {
    let mut monitors: Vec<(String, Monitor)> = Vec::new();

    for line in text.lines() {
        if let Some(caps) = STATUS_LINE.captures(line) {
            let raw_name = caps[1].to_string();
            let up = &caps[2] == "1";
            let monitor = Monitor {
                id: 0,
                name: normalize_service_name(&raw_name),
                status: up,
                uptime: if up { 100.0 } else { 0.0 },
                response_time: 0.0,
            };

            match monitors.iter_mut().find(|(name, _)| *name == raw_name) {
                Some((_, existing)) => *existing = monitor,
                None => monitors.push((raw_name, monitor)),
            }
        }

        if let Some(caps) = RESPONSE_TIME_LINE.captures(line) {
            if let Some((_, existing)) = monitors.iter_mut().find(|(name, _)| name == &caps[1]) {
                existing.response_time = caps[2].parse().unwrap_or(0.0);
            }
        }
    }

    monitors
        .into_iter()
        .enumerate()
        .map(|(i, (_, monitor))| Monitor {
            id: i as i64 + 1,
            ..monitor
        })
        .collect()
}

pub struct UptimeClient {
    http: Client,
    base_url: String,
    slug: String,
    lookup_timeout: Duration,
}

impl UptimeClient {
    pub fn new(http: Client, base_url: impl Into<String>, slug: impl Into<String>, lookup_timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            slug: slug.into(),
            lookup_timeout,
        }
    }

    pub fn from_config(http: Client, config: &AppConfig) -> Self {
        Self::new(
            http,
            config.uptime_kuma_url.clone(),
            config.uptime_status_slug.clone(),
            config.lookup_timeout,
        )
    }

    pub async fn fetch_status_page(&self) -> UpstreamResult<Vec<Monitor>> {
        let response = self
            .http
            .get(format!("{}{}/{}", self.base_url, UPTIME_STATUS_PAGE, self.slug))
            .header("Accept", "application/json")
            .timeout(self.lookup_timeout)
            .send()
            .await
            .map_err(UpstreamError::unreachable(PROVIDER))?;

        let response = ensure_success(PROVIDER, response).await?;
        let page: StatusPage = response.json().await.map_err(UpstreamError::decode(PROVIDER))?;

        Ok(page
            .public_group_list
            .into_iter()
            .flat_map(|g| g.monitor_list)
            .map(Monitor::from)
            .collect())
    }

    pub async fn fetch_metrics(&self) -> UpstreamResult<Vec<Monitor>> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, UPTIME_METRICS))
            .header("Accept", "text/plain")
            .timeout(self.lookup_timeout)
            .send()
            .await
            .map_err(UpstreamError::unreachable(PROVIDER))?;

        let response = ensure_success(PROVIDER, response).await?;
        let text = response.text().await.map_err(UpstreamError::decode(PROVIDER))?;
        Ok(parse_metrics(&text))
    }

    /// Status page first, Prometheus metrics second. `Empty` when neither
    /// reports a single monitor.
    pub async fn fetch_monitors(&self) -> UpstreamResult<Vec<Monitor>> {
        let from_page = self.fetch_status_page().await.unwrap_or_else(|e| {
            warn!("Uptime Kuma status page failed: {}", e);
            Vec::new()
        });
        if !from_page.is_empty() {
            return Ok(from_page);
        }

        debug!("Status page empty, trying Uptime Kuma metrics");
        let from_metrics = self.fetch_metrics().await.unwrap_or_else(|e| {
            warn!("Uptime Kuma metrics failed: {}", e);
            Vec::new()
        });
        if !from_metrics.is_empty() {
            return Ok(from_metrics);
        }

        Err(UpstreamError::Empty(PROVIDER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Instant;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> UptimeClient {
        UptimeClient::new(Client::new(), server.uri(), "homelab", Duration::from_secs(3))
    }

    #[test]
    fn test_normalize_service_name() {
        assert_eq!(normalize_service_name("QBIT"), "qBittorrent");
        assert_eq!(normalize_service_name("open webui"), "Open WebUI");
        assert_eq!(normalize_service_name("Home Assistant"), "Home Assistant");
    }

    #[test]
    fn test_parse_metrics() {
        let text = r#"
# HELP monitor_status Monitor Status (1 = UP, 0= DOWN, 2= PENDING, 3= MAINTENANCE)
monitor_status{monitor_name="jellyfin",monitor_type="http",monitor_url="http://x"} 1
monitor_status{monitor_name="comfyui",monitor_type="http",monitor_url="http://y"} 0
monitor_response_time{monitor_name="jellyfin",monitor_type="http",monitor_url="http://x"} 42.5
monitor_response_time{monitor_name="unknown",monitor_type="http"} 7
"#;
        let monitors = parse_metrics(text);
        assert_eq!(monitors.len(), 2);

        assert_eq!(monitors[0].id, 1);
        assert_eq!(monitors[0].name, "Jellyfin");
        assert!(monitors[0].status);
        assert_eq!(monitors[0].uptime, 100.0);
        assert_eq!(monitors[0].response_time, 42.5);

        assert_eq!(monitors[1].name, "ComfyUI");
        assert!(!monitors[1].status);
        assert_eq!(monitors[1].uptime, 0.0);
    }

    #[tokio::test]
    async fn test_status_page_is_preferred() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/status-page/homelab"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "config": {},
                "publicGroupList": [
                    { "name": "Media", "monitorList": [
                        { "id": 3, "name": "sonarr", "status": 1, "uptime24": 0.0, "uptime": 99.1, "avgPing": 12.0 },
                        { "id": 4, "name": "Radarr", "status": 0 }
                    ] }
                ]
            })))
            .mount(&server)
            .await;

        let monitors = client(&server).fetch_monitors().await.unwrap();
        assert_eq!(monitors.len(), 2);
        assert_eq!(monitors[0].name, "Sonarr");
        assert_eq!(monitors[0].uptime, 99.1);
        assert_eq!(monitors[0].response_time, 12.0);
        assert!(!monitors[1].status);
        assert_eq!(monitors[1].uptime, 100.0);
    }

    #[tokio::test]
    async fn test_metrics_used_when_status_page_fails() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/status-page/homelab"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/metrics"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "monitor_status{monitor_name=\"blinko\",monitor_type=\"http\"} 1\n",
            ))
            .mount(&server)
            .await;

        let monitors = client(&server).fetch_monitors().await.unwrap();
        assert_eq!(monitors.len(), 1);
        assert_eq!(monitors[0].name, "Blinko");
    }

    #[tokio::test]
    async fn test_slow_status_page_is_cut_off_by_lookup_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/status-page/homelab"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "publicGroupList": [ { "monitorList": [ { "id": 1, "name": "sonarr", "status": 1 } ] } ]
                    }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/metrics"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "monitor_status{monitor_name=\"blinko\",monitor_type=\"http\"} 1\n",
            ))
            .mount(&server)
            .await;

        let client = UptimeClient::new(Client::new(), server.uri(), "homelab", Duration::from_millis(200));
        let started = Instant::now();
        let monitors = client.fetch_monitors().await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
        assert_eq!(monitors.len(), 1);
        assert_eq!(monitors[0].name, "Blinko");
    }

    #[tokio::test]
    async fn test_nothing_reported_is_empty() {
        let server = MockServer::start().await;
        let err = client(&server).fetch_monitors().await.unwrap_err();
        assert!(matches!(err, UpstreamError::Empty(_)));
        assert!(err.is_expected());
    }
}
