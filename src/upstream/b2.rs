use std::sync::Arc;

use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::auth::TokenCache;
use crate::config::AppConfig;
use crate::error::{UpstreamError, UpstreamResult};
use crate::models::backup::BackupInfo;
use crate::upstream::buckets::BucketSummary;
use crate::upstream::endpoints::{B2_AUTHORIZE, B2_LIST_BUCKETS, B2_LIST_FILE_NAMES, B2_PAGE_SIZE};
use crate::upstream::ensure_success;

pub const PROVIDER: &str = "b2";
const DISPLAY_NAME: &str = "Backblaze B2";
/// Upper bound on listing calls per request; B2 bills per thousand names.
const MAX_PAGES: usize = 10;

/// What `b2_authorize_account` hands back. Later calls go to `api_url`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct B2Session {
    authorization_token: String,
    api_url: String,
    account_id: String,
}

#[derive(Debug, Deserialize)]
struct BucketList {
    #[serde(default)]
    buckets: Vec<Bucket>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Bucket {
    bucket_id: String,
    bucket_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<FileEntry>,
    #[serde(default)]
    next_file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileEntry {
    #[serde(default)]
    content_length: i64,
    /// Milliseconds since the epoch.
    #[serde(default)]
    upload_timestamp: Option<i64>,
}

pub struct B2Client {
    http: Client,
    base_url: String,
    key_id: Option<String>,
    app_key: Option<String>,
    bucket: Option<String>,
    sessions: Arc<TokenCache<B2Session>>,
    display_timezone: Tz,
}

impl B2Client {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        key_id: Option<String>,
        app_key: Option<String>,
        bucket: Option<String>,
        sessions: Arc<TokenCache<B2Session>>,
        display_timezone: Tz,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            key_id,
            app_key,
            bucket,
            sessions,
            display_timezone,
        }
    }

    pub fn from_config(http: Client, config: &AppConfig, sessions: Arc<TokenCache<B2Session>>) -> Self {
        Self::new(
            http,
            config.b2_api_url.clone(),
            config.b2_key_id.clone(),
            config.b2_app_key.clone(),
            config.b2_bucket.clone(),
            sessions,
            config.display_timezone,
        )
    }

    async fn authorize(&self, key_id: &str, app_key: &str) -> UpstreamResult<B2Session> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, B2_AUTHORIZE))
            .basic_auth(key_id, Some(app_key))
            .send()
            .await
            .map_err(UpstreamError::unreachable(PROVIDER))?;

        if !response.status().is_success() {
            error!("B2 auth failed: {}", response.status().as_u16());
            return Err(UpstreamError::Unauthenticated(PROVIDER));
        }

        response.json().await.map_err(UpstreamError::decode(PROVIDER))
    }

    /// POST against the session's API host. A 401 drops the cached session.
    async fn call(&self, session: &B2Session, endpoint: &str, body: &Value) -> UpstreamResult<Response> {
        let response = self
            .http
            .post(format!("{}{}", session.api_url, endpoint))
            .header("Authorization", &session.authorization_token)
            .json(body)
            .send()
            .await
            .map_err(UpstreamError::unreachable(PROVIDER))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.sessions.invalidate().await;
            return Err(UpstreamError::Unauthenticated(PROVIDER));
        }

        ensure_success(PROVIDER, response).await
    }

    async fn bucket_id(&self, session: &B2Session, bucket: &str) -> UpstreamResult<String> {
        let body = json!({ "accountId": session.account_id, "bucketName": bucket });
        let response = self.call(session, B2_LIST_BUCKETS, &body).await?;
        let list: BucketList = response.json().await.map_err(UpstreamError::decode(PROVIDER))?;

        list.buckets
            .into_iter()
            .find(|b| b.bucket_name == bucket)
            .map(|b| b.bucket_id)
            .ok_or_else(|| UpstreamError::Decode {
                provider: PROVIDER,
                message: format!("bucket '{}' not found", bucket),
            })
    }

    async fn summarize_bucket(&self, session: &B2Session, bucket_id: &str) -> UpstreamResult<BucketSummary> {
        let mut summary = BucketSummary::default();
        let mut start: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut body = json!({ "bucketId": bucket_id, "maxFileCount": B2_PAGE_SIZE });
            if let Some(name) = &start {
                body["startFileName"] = json!(name);
            }

            let response = self.call(session, B2_LIST_FILE_NAMES, &body).await?;
            let page: FileList = response.json().await.map_err(UpstreamError::decode(PROVIDER))?;

            for file in page.files {
                let uploaded_at = file
                    .upload_timestamp
                    .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
                summary.record(file.content_length, uploaded_at);
            }

            match page.next_file_name {
                Some(next) => start = Some(next),
                None => return Ok(summary),
            }
        }

        debug!("B2 listing stopped after {} pages", MAX_PAGES);
        Ok(summary)
    }

    pub async fn fetch_backup(&self) -> UpstreamResult<BackupInfo> {
        let (Some(key_id), Some(app_key), Some(bucket)) =
            (self.key_id.as_deref(), self.app_key.as_deref(), self.bucket.as_deref())
        else {
            return Err(UpstreamError::NotConfigured(PROVIDER));
        };

        let session = self.sessions.get_or_refresh(|| self.authorize(key_id, app_key)).await?;
        let bucket_id = self.bucket_id(&session, bucket).await?;
        let summary = self.summarize_bucket(&session, &bucket_id).await?;

        Ok(summary.to_backup_info(DISPLAY_NAME, Utc::now(), self.display_timezone))
    }
}
