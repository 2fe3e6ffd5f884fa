use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::json;

use crate::config::AppConfig;
use crate::error::{UpstreamError, UpstreamResult};
use crate::models::note::{Note, NoteList, NOTE_TYPE_BLINKO, NOTE_TYPE_TODO};
use crate::upstream::endpoints::{BLINKO_NOTE_DELETE, BLINKO_NOTE_LIST, BLINKO_NOTE_UPSERT};
use crate::upstream::ensure_success;

pub const PROVIDER: &str = "blinko";

const TODO_PAGE_SIZE: u32 = 100;
const RSS_PAGE_SIZE: u32 = 50;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteQuery {
    #[serde(rename = "type")]
    pub kind: u8,
    pub size: u32,
    pub is_archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_text: Option<String>,
}

impl NoteQuery {
    pub fn todos() -> Self {
        Self {
            kind: NOTE_TYPE_TODO,
            size: TODO_PAGE_SIZE,
            is_archived: false,
            search_text: None,
        }
    }

    /// Short notes mentioning `#tag`.
    pub fn tagged(tag: &str) -> Self {
        Self {
            kind: NOTE_TYPE_BLINKO,
            size: RSS_PAGE_SIZE,
            is_archived: false,
            search_text: Some(format!("#{}", tag)),
        }
    }
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    content: &'a str,
    #[serde(rename = "type")]
    kind: u8,
}

pub struct BlinkoClient {
    http: Client,
    base_url: String,
    api_token: Option<String>,
}

impl BlinkoClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_token: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_token,
        }
    }

    pub fn from_config(http: Client, config: &AppConfig) -> Self {
        Self::new(http, config.blinko_url.clone(), config.blinko_api_token.clone())
    }

    fn post(&self, endpoint: &str) -> UpstreamResult<RequestBuilder> {
        let token = self
            .api_token
            .as_deref()
            .ok_or(UpstreamError::NotConfigured(PROVIDER))?;

        Ok(self
            .http
            .post(format!("{}{}", self.base_url, endpoint))
            .bearer_auth(token))
    }

    pub async fn list_notes(&self, query: &NoteQuery) -> UpstreamResult<Vec<Note>> {
        let response = self
            .post(BLINKO_NOTE_LIST)?
            .json(query)
            .send()
            .await
            .map_err(UpstreamError::unreachable(PROVIDER))?;

        let response = ensure_success(PROVIDER, response).await?;
        let list: NoteList = response.json().await.map_err(UpstreamError::decode(PROVIDER))?;
        Ok(list.into_notes())
    }

    /// Creates a todo when `id` is `None`, otherwise overwrites its content.
    pub async fn upsert_todo(&self, id: Option<i64>, content: &str) -> UpstreamResult<Note> {
        let request = UpsertRequest {
            id,
            content,
            kind: NOTE_TYPE_TODO,
        };

        let response = self
            .post(BLINKO_NOTE_UPSERT)?
            .json(&request)
            .send()
            .await
            .map_err(UpstreamError::unreachable(PROVIDER))?;

        let response = ensure_success(PROVIDER, response).await?;
        response.json().await.map_err(UpstreamError::decode(PROVIDER))
    }

    pub async fn delete_note(&self, id: i64) -> UpstreamResult<()> {
        let response = self
            .post(BLINKO_NOTE_DELETE)?
            .json(&json!({ "ids": [id] }))
            .send()
            .await
            .map_err(UpstreamError::unreachable(PROVIDER))?;

        ensure_success(PROVIDER, response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn note_json(id: i64, content: &str) -> serde_json::Value {
        json!({
            "id": id,
            "content": content,
            "type": 2,
            "isArchived": false,
            "createdAt": "2025-03-01T09:00:00.000Z",
            "updatedAt": "2025-03-01T09:00:00.000Z"
        })
    }

    #[tokio::test]
    async fn test_without_token_nothing_is_sent() {
        let client = BlinkoClient::new(Client::new(), "http://127.0.0.1:9", None);
        let err = client.list_notes(&NoteQuery::todos()).await.unwrap_err();
        assert!(err.is_not_configured());
        let err = client.delete_note(1).await.unwrap_err();
        assert!(err.is_not_configured());
    }

    #[tokio::test]
    async fn test_list_todos_request_shape() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/note/list"))
            .and(header("Authorization", "Bearer tok"))
            .and(body_json(json!({ "type": 2, "size": 100, "isArchived": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([note_json(1, "milk #today")])))
            .mount(&mock_server)
            .await;

        let client = BlinkoClient::new(Client::new(), mock_server.uri(), Some("tok".to_string()));
        let notes = client.list_notes(&NoteQuery::todos()).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content, "milk #today");
    }

    #[tokio::test]
    async fn test_tagged_query_searches_for_hashtag() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/note/list"))
            .and(body_json(json!({ "type": 0, "size": 50, "isArchived": false, "searchText": "#rss" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&mock_server)
            .await;

        let client = BlinkoClient::new(Client::new(), mock_server.uri(), Some("tok".to_string()));
        let notes = client.list_notes(&NoteQuery::tagged("rss")).await.unwrap();
        assert!(notes.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_new_todo_omits_id() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/note/upsert"))
            .and(body_json(json!({ "content": "milk #today", "type": 2 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(note_json(42, "milk #today")))
            .mount(&mock_server)
            .await;

        let client = BlinkoClient::new(Client::new(), mock_server.uri(), Some("tok".to_string()));
        let note = client.upsert_todo(None, "milk #today").await.unwrap();
        assert_eq!(note.id, 42);
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/note/delete"))
            .and(body_json(json!({ "ids": [7] })))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = BlinkoClient::new(Client::new(), mock_server.uri(), Some("tok".to_string()));
        let err = client.delete_note(7).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status { status: 404, .. }));
    }
}
