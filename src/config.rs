use anyhow::Result;
use chrono_tz::Tz;
use dotenvy::dotenv;
use std::env;
use std::time::Duration;
use tracing::warn;

const DEFAULT_TIMEZONE: Tz = chrono_tz::Australia::Sydney;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub display_timezone: Tz,
    pub upstream_timeout: Duration,
    pub lookup_timeout: Duration,

    pub dawarich_url: String,
    pub dawarich_api_key: Option<String>,

    pub blinko_url: String,
    pub blinko_api_token: Option<String>,
    pub rss_default_tag: String,
    pub rss_proxy_host: Option<String>,
    pub rss_proxy_port: u16,

    pub beszel_url: String,
    pub beszel_email: Option<String>,
    pub beszel_password: Option<String>,

    pub qbit_url: String,
    pub qbit_username: String,
    pub qbit_password: Option<String>,

    pub jellyfin_url: String,
    pub jellyfin_api_key: Option<String>,

    pub pve_url: String,
    pub pve_node: String,
    pub pve_user: String,
    pub pve_password: Option<String>,
    /// Proxmox ships a self-signed certificate by default.
    pub pve_insecure_tls: bool,

    pub b2_api_url: String,
    pub b2_key_id: Option<String>,
    pub b2_app_key: Option<String>,
    pub b2_bucket: Option<String>,

    pub s3_bucket: Option<String>,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub s3_force_path_style: bool,

    pub uptime_kuma_url: String,
    pub uptime_status_slug: String,

    pub coingecko_url: String,
    pub yahoo_finance_url: String,
    pub market_stocks: Vec<String>,

    pub open_meteo_url: String,
    pub ip_api_url: String,
    pub weather_default_lat: f64,
    pub weather_default_lon: f64,
    pub weather_default_city: String,
    pub weather_default_timezone: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        Ok(Self::from_lookup(|key| env::var(key).ok()))
    }

    /// Builds the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let display_timezone = match get("DISPLAY_TIMEZONE") {
            Some(name) => name.parse::<Tz>().unwrap_or_else(|_| {
                warn!("Invalid DISPLAY_TIMEZONE '{}', using {}", name, DEFAULT_TIMEZONE);
                DEFAULT_TIMEZONE
            }),
            None => DEFAULT_TIMEZONE,
        };

        let upstream_timeout_secs = get("UPSTREAM_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);
        let lookup_timeout_ms = get("LOOKUP_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let flag = |key: &str| {
            get(key)
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false)
        };

        let market_stocks = or("MARKET_STOCKS", "NVDA,QQQ")
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host: or("HOST", "0.0.0.0"),
            port: get("PORT").and_then(|p| p.parse().ok()).unwrap_or(3000),
            log_level: or("LOG_LEVEL", "info"),
            display_timezone,
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),
            lookup_timeout: Duration::from_millis(lookup_timeout_ms),

            dawarich_url: trim_url(or("DAWARICH_URL", "http://localhost:3000")),
            dawarich_api_key: get("DAWARICH_API_KEY"),

            blinko_url: trim_url(or("BLINKO_URL", "http://localhost:1111")),
            blinko_api_token: get("BLINKO_API_TOKEN"),
            rss_default_tag: or("RSS_DEFAULT_TAG", "rss"),
            rss_proxy_host: get("RSS_PROXY_HOST").map(|h| h.trim().to_ascii_lowercase()),
            rss_proxy_port: get("RSS_PROXY_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(1200),

            beszel_url: trim_url(or("BESZEL_URL", "http://localhost:8090")),
            beszel_email: get("BESZEL_EMAIL"),
            beszel_password: get("BESZEL_PASSWORD"),

            qbit_url: trim_url(or("QBIT_URL", "http://localhost:8080")),
            qbit_username: or("QBIT_USERNAME", "admin"),
            qbit_password: get("QBIT_PASSWORD"),

            jellyfin_url: trim_url(or("JELLYFIN_URL", "http://localhost:8096")),
            jellyfin_api_key: get("JELLYFIN_API_KEY"),

            pve_url: trim_url(or("PVE_URL", "https://localhost:8006")),
            pve_node: or("PVE_NODE", "pve"),
            pve_user: or("PVE_USER", "root@pam"),
            pve_password: get("PVE_PASSWORD"),
            pve_insecure_tls: flag("PVE_INSECURE_TLS"),

            b2_api_url: trim_url(or("B2_API_URL", "https://api.backblazeb2.com")),
            b2_key_id: get("B2_KEY_ID"),
            b2_app_key: get("B2_APP_KEY"),
            b2_bucket: get("B2_BUCKET"),

            s3_bucket: get("S3_BUCKET"),
            s3_region: or("S3_REGION", "ap-southeast-2"),
            s3_endpoint: get("S3_ENDPOINT").map(trim_url),
            s3_access_key_id: get("AWS_ACCESS_KEY_ID"),
            s3_secret_access_key: get("AWS_SECRET_ACCESS_KEY"),
            s3_force_path_style: flag("S3_FORCE_PATH_STYLE"),

            uptime_kuma_url: trim_url(or("UPTIME_KUMA_URL", "http://localhost:3001")),
            uptime_status_slug: or("UPTIME_STATUS_SLUG", "homelab"),

            coingecko_url: trim_url(or("COINGECKO_URL", "https://api.coingecko.com/api/v3")),
            yahoo_finance_url: trim_url(or(
                "YAHOO_FINANCE_URL",
                "https://query1.finance.yahoo.com/v8/finance/chart",
            )),
            market_stocks,

            open_meteo_url: trim_url(or("OPEN_METEO_URL", "https://api.open-meteo.com/v1/forecast")),
            ip_api_url: trim_url(or("IP_API_URL", "http://ip-api.com/json")),
            weather_default_lat: get("WEATHER_DEFAULT_LAT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(-33.8688),
            weather_default_lon: get("WEATHER_DEFAULT_LON")
                .and_then(|v| v.parse().ok())
                .unwrap_or(151.2093),
            weather_default_city: or("WEATHER_DEFAULT_CITY", "Sydney"),
            weather_default_timezone: or("WEATHER_DEFAULT_TIMEZONE", "Australia/Sydney"),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
