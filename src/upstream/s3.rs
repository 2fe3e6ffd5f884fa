use std::time::Duration;

use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Builder, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::config::AppConfig;
use crate::error::{UpstreamError, UpstreamResult};
use crate::models::backup::BackupInfo;
use crate::upstream::buckets::BucketSummary;

pub const PROVIDER: &str = "s3";
const DISPLAY_NAME: &str = "AWS S3";
/// ListObjectsV2 returns up to a thousand keys per page.
const MAX_PAGES: usize = 10;

/// Connection settings for an S3-compatible bucket.
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    pub timeout: Duration,
}

fn build_client(settings: &S3Settings) -> Client {
    let credentials = Credentials::new(
        settings.access_key_id.clone(),
        settings.secret_access_key.clone(),
        None,
        None,
        env!("CARGO_PKG_NAME"),
    );

    let mut builder = Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(settings.region.clone()))
        .credentials_provider(credentials)
        .force_path_style(settings.force_path_style)
        .timeout_config(TimeoutConfig::builder().operation_timeout(settings.timeout).build());
    if let Some(endpoint) = &settings.endpoint {
        builder = builder.endpoint_url(endpoint.clone());
    }

    Client::from_conf(builder.build())
}

pub struct S3BucketClient {
    client: Option<Client>,
    bucket: Option<String>,
    display_timezone: Tz,
}

impl S3BucketClient {
    /// Without settings every call reports `NotConfigured`.
    pub fn new(settings: Option<S3Settings>, bucket: Option<String>, display_timezone: Tz) -> Self {
        Self {
            client: settings.as_ref().map(build_client),
            bucket,
            display_timezone,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let settings = match (&config.s3_access_key_id, &config.s3_secret_access_key) {
            (Some(key), Some(secret)) => Some(S3Settings {
                access_key_id: key.clone(),
                secret_access_key: secret.clone(),
                region: config.s3_region.clone(),
                endpoint: config.s3_endpoint.clone(),
                force_path_style: config.s3_force_path_style,
                timeout: config.upstream_timeout,
            }),
            _ => None,
        };

        Self::new(settings, config.s3_bucket.clone(), config.display_timezone)
    }

    async fn summarize_bucket(&self, client: &Client, bucket: &str) -> UpstreamResult<BucketSummary> {
        let mut summary = BucketSummary::default();
        let mut pages = client.list_objects_v2().bucket(bucket).into_paginator().send();
        let mut fetched = 0;

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| UpstreamError::Sdk {
                provider: PROVIDER,
                message: DisplayErrorContext(&e).to_string(),
            })?;

            for object in page.contents() {
                let uploaded_at = object
                    .last_modified()
                    .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()));
                summary.record(object.size().unwrap_or(0), uploaded_at);
            }

            fetched += 1;
            if fetched == MAX_PAGES {
                debug!("S3 listing stopped after {} pages", MAX_PAGES);
                break;
            }
        }

        Ok(summary)
    }

    pub async fn fetch_backup(&self) -> UpstreamResult<BackupInfo> {
        let (Some(client), Some(bucket)) = (self.client.as_ref(), self.bucket.as_deref()) else {
            return Err(UpstreamError::NotConfigured(PROVIDER));
        };

        let summary = self.summarize_bucket(client, bucket).await?;
        Ok(summary.to_backup_info(DISPLAY_NAME, Utc::now(), self.display_timezone))
    }
}
