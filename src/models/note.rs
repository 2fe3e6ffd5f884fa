use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Blinko note kinds.
pub const NOTE_TYPE_BLINKO: u8 = 0;
pub const NOTE_TYPE_TODO: u8 = 2;

/// A note as stored by Blinko. Read-only on our side.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    #[serde(default)]
    pub content: String,
    #[serde(default, rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_top: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum NoteList {
    Wrapped { data: Vec<Note> },
    Bare(Vec<Note>),
}

impl NoteList {
    pub fn into_notes(self) -> Vec<Note> {
        match self {
            NoteList::Wrapped { data } => data,
            NoteList::Bare(notes) => notes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    #[default]
    Today,
    Later,
}

impl Column {
    pub fn tag(self) -> &'static str {
        match self {
            Column::Today => "#today",
            Column::Later => "#later",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: i64,
    pub content: String,
    pub done: bool,
    pub column: Column,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RssItem {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    pub is_new: bool,
    pub is_starred: bool,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RssStats {
    pub total: usize,
    pub new: usize,
    pub starred: usize,
}

impl RssStats {
    pub fn of(items: &[RssItem]) -> Self {
        Self {
            total: items.len(),
            new: items.iter().filter(|i| i.is_new).count(),
            starred: items.iter().filter(|i| i.is_starred).count(),
        }
    }
}

/// Response body of the feed endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RssFeed {
    pub data: Vec<RssItem>,
    pub stats: RssStats,
}

impl RssFeed {
    pub fn new(data: Vec<RssItem>) -> Self {
        let stats = RssStats::of(&data);
        Self { data, stats }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn demo(now: DateTime<Utc>) -> Self {
        let item = |id, title: &str, url: &str, source: &str, age_days, is_starred| RssItem {
            id,
            title: title.to_string(),
            url: url.to_string(),
            source: source.to_string(),
            summary: None,
            score: None,
            is_new: age_days == 0,
            is_starred,
            published_at: now - Duration::days(age_days),
        };

        Self::new(vec![
            item(1, "Next.js 16 正式发布", "https://nextjs.org", "nextjs.org", 0, false),
            item(2, "Claude 4.5 重大更新", "https://anthropic.com", "anthropic.com", 0, true),
            item(3, "Docker 容器最佳实践", "https://docker.com", "docker.com", 2, false),
            item(4, "Homelab 完整搭建指南", "https://reddit.com/r/homelab", "reddit.com", 3, false),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_note_defaults_missing_flags() {
        let note: Note = serde_json::from_value(json!({
            "id": 7,
            "content": "hello #rss",
            "createdAt": "2025-01-02T03:04:05.000Z",
            "updatedAt": "2025-01-02T03:04:05.000Z"
        }))
        .unwrap();
        assert_eq!(note.id, 7);
        assert!(!note.is_archived);
        assert!(!note.is_top);
        assert_eq!(note.kind, NOTE_TYPE_BLINKO);
    }

    #[test]
    fn test_column_serialization() {
        assert_eq!(serde_json::to_value(Column::Later).unwrap(), json!("later"));
        let col: Column = serde_json::from_value(json!("today")).unwrap();
        assert_eq!(col, Column::Today);
    }

    #[test]
    fn test_demo_feed_stats() {
        let feed = RssFeed::demo(Utc::now());
        assert_eq!(feed.stats, RssStats { total: 4, new: 2, starred: 1 });
    }
}
