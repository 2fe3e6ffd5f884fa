use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, UpstreamError};
use crate::fallback::{fetch_with_fallback, Envelope, Listing};
use crate::models::note::{Column, RssFeed, RssItem, TodoItem};
use crate::processor::note_parser::{
    clean_todo_content, created_on, format_todo_content, has_tag, parse_rss_item, parse_todo, sort_rss_items,
    sort_todos,
};
use crate::routes::parse_day;
use crate::state::AppState;
use crate::upstream::blinko::{self, NoteQuery};

#[derive(Debug, Deserialize)]
pub struct RssQuery {
    pub tag: Option<String>,
    pub date: Option<String>,
}

pub async fn get_rss(State(state): State<Arc<AppState>>, Query(query): Query<RssQuery>) -> Json<Envelope<RssFeed>> {
    let tz = state.config.display_timezone;
    let tag = query
        .tag
        .as_deref()
        .map(|t| t.trim().trim_start_matches('#'))
        .filter(|t| !t.is_empty())
        .unwrap_or(state.config.rss_default_tag.as_str())
        .to_string();

    let primary = async {
        let day = query.date.as_deref().map(parse_day).transpose()?;
        let notes = state.blinko.list_notes(&NoteQuery::tagged(&tag)).await?;

        let now = Utc::now();
        let proxy = state.proxy_rewrite();
        let mut items: Vec<RssItem> = notes
            .iter()
            .filter(|n| has_tag(n, &tag))
            .filter(|n| day.map_or(true, |d| created_on(n, d, tz)))
            .map(|n| parse_rss_item(n, now, proxy.as_ref()))
            .collect();
        sort_rss_items(&mut items);

        info!("Feed #{}: {} of {} notes", tag, items.len(), notes.len());
        Ok::<_, UpstreamError>(RssFeed::new(items))
    };

    let envelope = fetch_with_fallback(blinko::PROVIDER, primary, |e| {
        if e.is_not_configured() {
            RssFeed::demo(Utc::now())
        } else {
            RssFeed::empty()
        }
    })
    .await;

    Json(envelope)
}

pub async fn list_todos(State(state): State<Arc<AppState>>) -> Json<Envelope<Listing<Vec<TodoItem>>>> {
    let primary = async {
        let notes = state.blinko.list_notes(&NoteQuery::todos()).await?;
        let mut todos: Vec<TodoItem> = notes.iter().map(parse_todo).collect();
        sort_todos(&mut todos);
        Ok::<_, UpstreamError>(Listing::new(todos))
    };

    Json(fetch_with_fallback(blinko::PROVIDER, primary, |_| Listing::new(Vec::new())).await)
}

#[derive(Debug, Deserialize)]
pub struct TodoWrite {
    pub id: Option<i64>,
    pub content: Option<String>,
    pub done: Option<bool>,
    pub column: Option<Column>,
}

impl TodoWrite {
    /// The stored note text. Markers already present in `content` are dropped
    /// so the flags in the request are the only ones written.
    fn note_content(&self) -> Result<String, ApiError> {
        let content = self
            .content
            .as_deref()
            .map(clean_todo_content)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Todo content required".to_string()))?;

        Ok(format_todo_content(
            &content,
            self.column.unwrap_or_default(),
            self.done.unwrap_or(false),
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct WriteResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub timestamp: String,
}

impl<T> WriteResponse<T> {
    fn new(data: Option<T>) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            timestamp: Utc::now().to_rfc3339(),
        })
    }
}

fn json_body(body: Result<Json<TodoWrite>, JsonRejection>) -> Result<TodoWrite, ApiError> {
    body.map(|Json(b)| b).map_err(|e| ApiError::BadRequest(e.body_text()))
}

async fn write_todo(state: &AppState, id: Option<i64>, body: &TodoWrite) -> Result<Json<WriteResponse<TodoItem>>, ApiError> {
    let content = body.note_content()?;
    let note = state.blinko.upsert_todo(id, &content).await?;
    info!("Saved todo {} (done: {})", note.id, body.done.unwrap_or(false));
    Ok(WriteResponse::new(Some(parse_todo(&note))))
}

/// Creates a todo, or overwrites it when `id` is given.
pub async fn save_todo(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TodoWrite>, JsonRejection>,
) -> Result<Json<WriteResponse<TodoItem>>, ApiError> {
    let body = json_body(body)?;
    write_todo(&state, body.id, &body).await
}

/// Same write as [`save_todo`] but the todo must already exist.
pub async fn toggle_todo(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TodoWrite>, JsonRejection>,
) -> Result<Json<WriteResponse<TodoItem>>, ApiError> {
    let body = json_body(body)?;
    let id = body
        .id
        .ok_or_else(|| ApiError::BadRequest("Todo ID required".to_string()))?;
    write_todo(&state, Some(id), &body).await
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub id: Option<String>,
}

pub async fn delete_todo(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<WriteResponse<()>>, ApiError> {
    let raw = query
        .id
        .ok_or_else(|| ApiError::BadRequest("Todo ID required".to_string()))?;
    let id: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid todo ID '{}'", raw)))?;

    state.blinko.delete_note(id).await?;
    info!("Deleted todo {}", id);
    Ok(WriteResponse::new(None))
}
