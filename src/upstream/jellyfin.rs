use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::{UpstreamError, UpstreamResult};
use crate::models::activity::{ActivityItem, ActivityKind, ActivityStatus};
use crate::upstream::endpoints::JELLYFIN_SESSIONS;
use crate::upstream::ensure_success;

pub const PROVIDER: &str = "jellyfin";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawSession {
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    client: Option<String>,
    #[serde(default)]
    now_playing_item: Option<NowPlayingItem>,
    #[serde(default)]
    play_state: Option<PlayState>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NowPlayingItem {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "Type")]
    kind: String,
    #[serde(default)]
    series_name: Option<String>,
    #[serde(default)]
    parent_index_number: Option<u32>,
    #[serde(default)]
    index_number: Option<u32>,
    #[serde(default)]
    run_time_ticks: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PlayState {
    #[serde(default)]
    position_ticks: Option<i64>,
    #[serde(default)]
    is_paused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Episode,
    Music,
    Other,
}

impl MediaType {
    fn from_item_type(kind: &str) -> Self {
        match kind {
            "Movie" => MediaType::Movie,
            "Episode" => MediaType::Episode,
            "Audio" => MediaType::Music,
            _ => MediaType::Other,
        }
    }

    fn icon(self) -> &'static str {
        match self {
            MediaType::Movie => "🎬",
            MediaType::Episode => "📺",
            MediaType::Music => "🎵",
            MediaType::Other => "▶️",
        }
    }
}

/// Something currently playing on a Jellyfin client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSession {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub user: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_info: Option<String>,
    pub media_type: MediaType,
    pub progress: u32,
    pub is_playing: bool,
    pub client: String,
    pub timestamp: String,
}

impl PlaybackSession {
    fn from_raw(session: RawSession) -> Option<Self> {
        let item = session.now_playing_item?;
        let play_state = session.play_state.unwrap_or_default();
        let media_type = MediaType::from_item_type(&item.kind);

        let progress = match (play_state.position_ticks, item.run_time_ticks) {
            (Some(pos), Some(total)) if pos > 0 && total > 0 => {
                (pos as f64 / total as f64 * 100.0).round() as u32
            }
            _ => 0,
        };

        let episode_info = match (media_type, item.parent_index_number, item.index_number) {
            (MediaType::Episode, Some(season), Some(episode)) if season > 0 && episode > 0 => {
                Some(format!("S{}E{}", season, episode))
            }
            _ => None,
        };

        Some(Self {
            kind: ActivityKind::Jellyfin,
            user: session.user_name.unwrap_or_else(|| "Unknown".to_string()),
            title: item.name,
            series_name: item.series_name,
            episode_info,
            media_type,
            progress,
            is_playing: !play_state.is_paused,
            client: session.client.unwrap_or_else(|| "Unknown".to_string()),
            timestamp: Utc::now().to_rfc3339(),
        })
    }
}

/// Episodes show the series as title and `S1E2 - Episode` as subtitle.
pub fn to_activity(session: &PlaybackSession) -> ActivityItem {
    let (title, subtitle) = match (&session.media_type, &session.series_name) {
        (MediaType::Episode, Some(series)) => (
            series.clone(),
            format!(
                "{} - {}",
                session.episode_info.as_deref().unwrap_or_default(),
                session.title
            ),
        ),
        _ => (session.title.clone(), session.user.clone()),
    };

    ActivityItem {
        kind: ActivityKind::Jellyfin,
        title,
        subtitle: Some(subtitle),
        progress: Some(session.progress),
        status: if session.is_playing {
            ActivityStatus::Active
        } else {
            ActivityStatus::Paused
        },
        timestamp: session.timestamp.clone(),
        icon: Some(session.media_type.icon().to_string()),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub data: Vec<ActivityItem>,
    pub sessions: Vec<PlaybackSession>,
}

impl SessionReport {
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            sessions: Vec::new(),
        }
    }

    pub fn from_sessions(sessions: Vec<PlaybackSession>) -> Self {
        Self {
            data: sessions.iter().map(to_activity).collect(),
            sessions,
        }
    }
}

pub struct JellyfinClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl JellyfinClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key,
        }
    }

    pub fn from_config(http: Client, config: &AppConfig) -> Self {
        Self::new(http, config.jellyfin_url.clone(), config.jellyfin_api_key.clone())
    }

    /// Sessions with something playing; idle clients are skipped.
    pub async fn fetch_sessions(&self) -> UpstreamResult<Vec<PlaybackSession>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(UpstreamError::NotConfigured(PROVIDER))?;

        let response = self
            .http
            .get(format!("{}{}", self.base_url, JELLYFIN_SESSIONS))
            .header("X-Jellyfin-Token", api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(UpstreamError::unreachable(PROVIDER))?;

        let response = ensure_success(PROVIDER, response).await?;
        let sessions: Vec<RawSession> = response.json().await.map_err(UpstreamError::decode(PROVIDER))?;

        Ok(sessions.into_iter().filter_map(PlaybackSession::from_raw).collect())
    }

    pub async fn fetch_report(&self) -> UpstreamResult<SessionReport> {
        Ok(SessionReport::from_sessions(self.fetch_sessions().await?))
    }
}
