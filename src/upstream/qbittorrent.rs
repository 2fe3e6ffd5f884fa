use std::sync::Arc;

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::SET_COOKIE;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::auth::TokenCache;
use crate::config::AppConfig;
use crate::error::{UpstreamError, UpstreamResult};
use crate::models::activity::{ActivityItem, ActivityKind, ActivityStatus};
use crate::upstream::endpoints::{QBIT_LOGIN, QBIT_TORRENTS};
use crate::upstream::{ensure_success, format_bytes};

pub const PROVIDER: &str = "qbittorrent";

/// Downloads slower than this are hidden unless nearly finished.
const MIN_SPEED_BYTES: i64 = 1024 * 1024;
const NEARLY_DONE_PERCENT: u32 = 90;
const TITLE_MAX_CHARS: usize = 40;
/// qBittorrent reports this ETA for stalled torrents.
const ETA_INFINITE: i64 = 8_640_000;

lazy_static! {
    static ref SID_COOKIE: Regex = Regex::new(r"SID=([^;]+)").unwrap();
}

#[derive(Debug, Deserialize)]
struct RawTorrent {
    hash: String,
    name: String,
    #[serde(default)]
    size: i64,
    #[serde(default)]
    progress: f64,
    #[serde(default)]
    dlspeed: i64,
    #[serde(default)]
    upspeed: i64,
    #[serde(default)]
    state: String,
    #[serde(default)]
    eta: i64,
    #[serde(default)]
    category: Option<String>,
}

/// Torrent as exposed by the activity endpoint; `progress` is a whole percentage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Torrent {
    pub hash: String,
    pub name: String,
    pub size: i64,
    pub progress: u32,
    pub dlspeed: i64,
    pub upspeed: i64,
    pub state: String,
    pub eta: i64,
    pub category: String,
}

impl From<RawTorrent> for Torrent {
    fn from(t: RawTorrent) -> Self {
        Torrent {
            hash: t.hash,
            name: t.name,
            size: t.size,
            progress: (t.progress * 100.0).round().max(0.0) as u32,
            dlspeed: t.dlspeed,
            upspeed: t.upspeed,
            state: t.state,
            eta: t.eta,
            category: t.category.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TorrentReport {
    pub data: Vec<ActivityItem>,
    pub torrents: Vec<Torrent>,
    pub total_torrents: usize,
    pub filtered_count: usize,
}

impl TorrentReport {
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            torrents: Vec::new(),
            total_torrents: 0,
            filtered_count: 0,
        }
    }

    pub fn from_torrents(all: Vec<Torrent>) -> Self {
        let total_torrents = all.len();
        let torrents: Vec<Torrent> = all.into_iter().filter(is_worth_showing).collect();
        let data = torrents.iter().map(to_activity).collect();

        Self {
            data,
            filtered_count: total_torrents - torrents.len(),
            torrents,
            total_torrents,
        }
    }
}

pub fn is_worth_showing(torrent: &Torrent) -> bool {
    torrent.dlspeed >= MIN_SPEED_BYTES || torrent.progress >= NEARLY_DONE_PERCENT
}

pub fn format_eta(seconds: i64) -> String {
    match seconds {
        s if s < 0 || s == ETA_INFINITE => "∞".to_string(),
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86_400),
    }
}

fn truncate_title(name: &str) -> String {
    if name.chars().count() > TITLE_MAX_CHARS {
        let head: String = name.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

pub fn to_activity(torrent: &Torrent) -> ActivityItem {
    let status = if torrent.state.contains("paused") {
        ActivityStatus::Paused
    } else if torrent.progress >= 100 {
        ActivityStatus::Completed
    } else {
        ActivityStatus::Active
    };

    ActivityItem {
        kind: ActivityKind::Qbittorrent,
        title: truncate_title(&torrent.name),
        subtitle: Some(format!(
            "{}% · {}/s · ETA: {}",
            torrent.progress,
            format_bytes(torrent.dlspeed),
            format_eta(torrent.eta)
        )),
        progress: Some(torrent.progress),
        status,
        timestamp: Utc::now().to_rfc3339(),
        icon: Some("⬇️".to_string()),
    }
}

pub struct QbitClient {
    http: Client,
    base_url: String,
    username: String,
    password: Option<String>,
    sid: Arc<TokenCache>,
}

impl QbitClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: Option<String>,
        sid: Arc<TokenCache>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            username: username.into(),
            password,
            sid,
        }
    }

    pub fn from_config(http: Client, config: &AppConfig, sid: Arc<TokenCache>) -> Self {
        Self::new(
            http,
            config.qbit_url.clone(),
            config.qbit_username.clone(),
            config.qbit_password.clone(),
            sid,
        )
    }

    async fn login(&self, password: &str) -> UpstreamResult<String> {
        let body = format!(
            "username={}&password={}",
            urlencoding::encode(&self.username),
            urlencoding::encode(password)
        );

        let response = self
            .http
            .post(format!("{}{}", self.base_url, QBIT_LOGIN))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(UpstreamError::unreachable(PROVIDER))?;

        let sid = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|cookie| SID_COOKIE.captures(cookie).map(|c| c[1].to_string()));

        match sid {
            Some(sid) if response.status().is_success() => Ok(sid),
            _ => {
                error!("qBittorrent auth failed: {}", response.status().as_u16());
                Err(UpstreamError::Unauthenticated(PROVIDER))
            }
        }
    }

    /// Every torrent qBittorrent lists as downloading, unfiltered.
    pub async fn fetch_downloading(&self) -> UpstreamResult<Vec<Torrent>> {
        let password = self
            .password
            .as_deref()
            .ok_or(UpstreamError::NotConfigured(PROVIDER))?;

        let sid = self.sid.get_or_refresh(|| self.login(password)).await?;

        let response = self
            .http
            .get(format!("{}{}", self.base_url, QBIT_TORRENTS))
            .query(&[("filter", "downloading")])
            .header("Cookie", format!("SID={}", sid))
            .send()
            .await
            .map_err(UpstreamError::unreachable(PROVIDER))?;

        if response.status() == StatusCode::FORBIDDEN {
            self.sid.invalidate().await;
            return Err(UpstreamError::Unauthenticated(PROVIDER));
        }

        let response = ensure_success(PROVIDER, response).await?;
        let raw: Vec<RawTorrent> = response.json().await.map_err(UpstreamError::decode(PROVIDER))?;
        Ok(raw.into_iter().map(Torrent::from).collect())
    }

    pub async fn fetch_report(&self) -> UpstreamResult<TorrentReport> {
        Ok(TorrentReport::from_torrents(self.fetch_downloading().await?))
    }
}
