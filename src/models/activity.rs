use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Jellyfin,
    Qbittorrent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Active,
    Paused,
    Completed,
}

/// A row in the "now happening" widget: something playing or downloading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityItem {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    pub status: ActivityStatus,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}
