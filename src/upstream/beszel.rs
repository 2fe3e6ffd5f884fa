use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::auth::TokenCache;
use crate::config::AppConfig;
use crate::error::{UpstreamError, UpstreamResult};
use crate::models::system::{SystemStats, SystemStatus};
use crate::upstream::endpoints::{BESZEL_AUTH, BESZEL_SYSTEMS};
use crate::upstream::ensure_success;

pub const PROVIDER: &str = "beszel";

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct RecordPage {
    #[serde(default)]
    items: Vec<BeszelSystem>,
}

#[derive(Debug, Deserialize)]
struct BeszelSystem {
    id: String,
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    info: SystemInfo,
}

/// Agent metrics. `t` and `gt` arrive in tenths of a degree.
#[derive(Debug, Default, Deserialize)]
struct SystemInfo {
    #[serde(default)]
    cpu: Option<f64>,
    #[serde(default)]
    mp: Option<f64>,
    #[serde(default)]
    t: Option<f64>,
    #[serde(default)]
    g: Option<f64>,
    #[serde(default)]
    gt: Option<f64>,
}

fn tenths(value: Option<f64>) -> Option<i64> {
    value.filter(|v| *v != 0.0).map(|v| (v / 10.0).round() as i64)
}

impl From<BeszelSystem> for SystemStats {
    fn from(s: BeszelSystem) -> Self {
        SystemStats {
            id: s.id,
            name: s.name,
            status: if s.status == "up" {
                SystemStatus::Online
            } else {
                SystemStatus::Offline
            },
            cpu: s.info.cpu.unwrap_or(0.0).round() as i64,
            memory: s.info.mp.unwrap_or(0.0).round() as i64,
            temp: tenths(s.info.t),
            gpu_load: s.info.g,
            gpu_temp: tenths(s.info.gt),
        }
    }
}

pub struct BeszelClient {
    http: Client,
    base_url: String,
    email: Option<String>,
    password: Option<String>,
    tokens: Arc<TokenCache>,
}

impl BeszelClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        email: Option<String>,
        password: Option<String>,
        tokens: Arc<TokenCache>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            email,
            password,
            tokens,
        }
    }

    pub fn from_config(http: Client, config: &AppConfig, tokens: Arc<TokenCache>) -> Self {
        Self::new(
            http,
            config.beszel_url.clone(),
            config.beszel_email.clone(),
            config.beszel_password.clone(),
            tokens,
        )
    }

    async fn login(&self, email: &str, password: &str) -> UpstreamResult<String> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, BESZEL_AUTH))
            .json(&json!({ "identity": email, "password": password }))
            .send()
            .await
            .map_err(UpstreamError::unreachable(PROVIDER))?;

        if !response.status().is_success() {
            error!("Beszel auth failed: {}", response.status().as_u16());
            return Err(UpstreamError::Unauthenticated(PROVIDER));
        }

        let auth: AuthResponse = response.json().await.map_err(UpstreamError::decode(PROVIDER))?;
        Ok(auth.token)
    }

    pub async fn fetch_systems(&self) -> UpstreamResult<Vec<SystemStats>> {
        let (Some(email), Some(password)) = (self.email.as_deref(), self.password.as_deref()) else {
            return Err(UpstreamError::NotConfigured(PROVIDER));
        };

        let token = self.tokens.get_or_refresh(|| self.login(email, password)).await?;

        let response = self
            .http
            .get(format!("{}{}", self.base_url, BESZEL_SYSTEMS))
            .header("Authorization", token)
            .send()
            .await
            .map_err(UpstreamError::unreachable(PROVIDER))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
            return Err(UpstreamError::Unauthenticated(PROVIDER));
        }

        let response = ensure_success(PROVIDER, response).await?;
        let page: RecordPage = response.json().await.map_err(UpstreamError::decode(PROVIDER))?;

        if page.items.is_empty() {
            return Err(UpstreamError::Empty(PROVIDER));
        }

        Ok(page.items.into_iter().map(SystemStats::from).collect())
    }
}
