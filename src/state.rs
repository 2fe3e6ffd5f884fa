use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;

use crate::auth::TokenCache;
use crate::config::AppConfig;
use crate::processor::note_parser::ProxyRewrite;
use crate::upstream::b2::{self, B2Client};
use crate::upstream::beszel::{self, BeszelClient};
use crate::upstream::blinko::BlinkoClient;
use crate::upstream::dawarich::DawarichClient;
use crate::upstream::init_http_client;
use crate::upstream::jellyfin::JellyfinClient;
use crate::upstream::markets::MarketsClient;
use crate::upstream::pve::{self, PveClient};
use crate::upstream::qbittorrent::{self, QbitClient};
use crate::upstream::s3::S3BucketClient;
use crate::upstream::uptime::UptimeClient;
use crate::upstream::weather::WeatherClient;

/// Beszel (PocketBase) tokens live for two hours.
const BESZEL_TOKEN_TTL_HOURS: i64 = 2;
const QBIT_SID_TTL_MINUTES: i64 = 30;
const PVE_TICKET_TTL_HOURS: i64 = 2;
/// B2 authorization tokens are valid for a day.
const B2_SESSION_TTL_HOURS: i64 = 24;
const TOKEN_MARGIN_MINUTES: i64 = 5;

pub struct AppState {
    pub config: AppConfig,
    pub dawarich: DawarichClient,
    pub blinko: BlinkoClient,
    pub markets: MarketsClient,
    pub uptime: UptimeClient,
    pub beszel: BeszelClient,
    pub qbittorrent: QbitClient,
    pub jellyfin: JellyfinClient,
    pub weather: WeatherClient,
    pub pve: PveClient,
    pub b2: B2Client,
    pub s3: S3BucketClient,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Arc<Self>> {
        let http = init_http_client(config.upstream_timeout, false)?;
        let pve_http = init_http_client(config.upstream_timeout, config.pve_insecure_tls)?;

        let beszel_tokens = Arc::new(TokenCache::new(
            beszel::PROVIDER,
            Duration::hours(BESZEL_TOKEN_TTL_HOURS),
            Duration::minutes(TOKEN_MARGIN_MINUTES),
        ));
        let qbit_sid = Arc::new(TokenCache::new(
            qbittorrent::PROVIDER,
            Duration::minutes(QBIT_SID_TTL_MINUTES),
            Duration::zero(),
        ));
        let pve_tickets = Arc::new(TokenCache::new(
            pve::PROVIDER,
            Duration::hours(PVE_TICKET_TTL_HOURS),
            Duration::minutes(TOKEN_MARGIN_MINUTES),
        ));
        let b2_sessions = Arc::new(TokenCache::new(
            b2::PROVIDER,
            Duration::hours(B2_SESSION_TTL_HOURS),
            Duration::minutes(TOKEN_MARGIN_MINUTES),
        ));

        Ok(Arc::new(Self {
            dawarich: DawarichClient::from_config(http.clone(), &config),
            blinko: BlinkoClient::from_config(http.clone(), &config),
            markets: MarketsClient::from_config(http.clone(), &config),
            uptime: UptimeClient::from_config(http.clone(), &config),
            beszel: BeszelClient::from_config(http.clone(), &config, beszel_tokens),
            qbittorrent: QbitClient::from_config(http.clone(), &config, qbit_sid),
            jellyfin: JellyfinClient::from_config(http.clone(), &config),
            pve: PveClient::from_config(pve_http, &config, pve_tickets),
            b2: B2Client::from_config(http.clone(), &config, b2_sessions),
            s3: S3BucketClient::from_config(&config),
            weather: WeatherClient::from_config(http, &config),
            config,
        }))
    }

    pub fn proxy_rewrite(&self) -> Option<ProxyRewrite> {
        self.config.rss_proxy_host.as_ref().map(|host| ProxyRewrite {
            host: host.clone(),
            port: self.config.rss_proxy_port,
        })
    }
}
