use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::error;

use crate::auth::TokenCache;
use crate::config::AppConfig;
use crate::error::{UpstreamError, UpstreamResult};
use crate::models::storage::{PoolHealth, StoragePool};
use crate::upstream::endpoints::{PVE_NODES, PVE_TICKET};
use crate::upstream::ensure_success;

pub const PROVIDER: &str = "pve";

/// Pool holding media and container volumes. Every other pool is archive.
const MEDIA_POOL: &str = "tank";
const TIB: f64 = 1024.0 * 1024.0 * 1024.0 * 1024.0;

/// Proxmox wraps every payload in `{ "data": ... }`.
#[derive(Debug, Deserialize)]
struct PveEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Ticket {
    ticket: String,
}

#[derive(Debug, Deserialize)]
struct ZfsPool {
    name: String,
    #[serde(default)]
    alloc: u64,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    health: String,
}

fn tib(bytes: u64) -> f64 {
    (bytes as f64 / TIB * 100.0).round() / 100.0
}

impl From<ZfsPool> for StoragePool {
    fn from(pool: ZfsPool) -> Self {
        let kind = if pool.name.eq_ignore_ascii_case(MEDIA_POOL) {
            "media/docker"
        } else {
            "backup/archive"
        };

        StoragePool {
            name: pool.name.to_uppercase(),
            used: tib(pool.alloc),
            total: tib(pool.size),
            status: PoolHealth::from_zfs(&pool.health),
            kind: kind.to_string(),
        }
    }
}

pub struct PveClient {
    http: Client,
    base_url: String,
    node: String,
    user: String,
    password: Option<String>,
    tickets: Arc<TokenCache>,
}

impl PveClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        node: impl Into<String>,
        user: impl Into<String>,
        password: Option<String>,
        tickets: Arc<TokenCache>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            node: node.into(),
            user: user.into(),
            password,
            tickets,
        }
    }

    pub fn from_config(http: Client, config: &AppConfig, tickets: Arc<TokenCache>) -> Self {
        Self::new(
            http,
            config.pve_url.clone(),
            config.pve_node.clone(),
            config.pve_user.clone(),
            config.pve_password.clone(),
            tickets,
        )
    }

    async fn login(&self, password: &str) -> UpstreamResult<String> {
        let body = format!(
            "username={}&password={}",
            urlencoding::encode(&self.user),
            urlencoding::encode(password)
        );

        let response = self
            .http
            .post(format!("{}{}", self.base_url, PVE_TICKET))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(UpstreamError::unreachable(PROVIDER))?;

        if !response.status().is_success() {
            error!("PVE auth failed: {}", response.status().as_u16());
            return Err(UpstreamError::Unauthenticated(PROVIDER));
        }

        let ticket: PveEnvelope<Ticket> = response.json().await.map_err(UpstreamError::decode(PROVIDER))?;
        Ok(ticket.data.ticket)
    }

    /// ZFS pools of the configured node. `Empty` when the node has none.
    pub async fn fetch_pools(&self) -> UpstreamResult<Vec<StoragePool>> {
        let password = self
            .password
            .as_deref()
            .ok_or(UpstreamError::NotConfigured(PROVIDER))?;

        let ticket = self.tickets.get_or_refresh(|| self.login(password)).await?;

        let response = self
            .http
            .get(format!(
                "{}{}/{}/disks/zfs",
                self.base_url,
                PVE_NODES,
                urlencoding::encode(&self.node)
            ))
            .header("Cookie", format!("PVEAuthCookie={}", ticket))
            .send()
            .await
            .map_err(UpstreamError::unreachable(PROVIDER))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.tickets.invalidate().await;
            return Err(UpstreamError::Unauthenticated(PROVIDER));
        }

        let response = ensure_success(PROVIDER, response).await?;
        let pools: PveEnvelope<Vec<ZfsPool>> = response.json().await.map_err(UpstreamError::decode(PROVIDER))?;

        if pools.data.is_empty() {
            return Err(UpstreamError::Empty(PROVIDER));
        }

        Ok(pools.data.into_iter().map(StoragePool::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cache() -> Arc<TokenCache> {
        Arc::new(TokenCache::new(PROVIDER, Duration::hours(2), Duration::minutes(5)))
    }

    fn client(server: &MockServer, tickets: Arc<TokenCache>) -> PveClient {
        PveClient::new(Client::new(), server.uri(), "pve", "root@pam", Some("s3cret!".to_string()), tickets)
    }

    async fn mount_ticket(server: &MockServer, expected_logins: u64) {
        Mock::given(method("POST"))
            .and(path("/api2/json/access/ticket"))
            .and(body_string("username=root%40pam&password=s3cret%21"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "ticket": "PVE:root@pam:ABC", "CSRFPreventionToken": "csrf" }
            })))
            .expect(expected_logins)
            .mount(server)
            .await;
    }

    #[test]
    fn test_pool_mapping() {
        let pool = StoragePool::from(ZfsPool {
            name: "tank".to_string(),
            alloc: 15_612_691_169_280,
            size: 30_016_912_179_200,
            health: "ONLINE".to_string(),
        });
        assert_eq!(pool.name, "TANK");
        assert_eq!(pool.used, 14.2);
        assert_eq!(pool.total, 27.3);
        assert_eq!(pool.status, PoolHealth::Healthy);
        assert_eq!(pool.kind, "media/docker");

        let cold = StoragePool::from(ZfsPool {
            name: "cold".to_string(),
            alloc: 0,
            size: 0,
            health: "DEGRADED".to_string(),
        });
        assert_eq!(cold.kind, "backup/archive");
        assert_eq!(cold.status, PoolHealth::Degraded);
        assert_eq!(cold.used, 0.0);
    }

    #[tokio::test]
    async fn test_missing_password() {
        let client = PveClient::new(Client::new(), "http://127.0.0.1:9", "pve", "root@pam", None, cache());
        assert!(client.fetch_pools().await.unwrap_err().is_not_configured());
    }

    #[tokio::test]
    async fn test_ticket_login_then_pools() {
        let server = MockServer::start().await;
        mount_ticket(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/api2/json/nodes/pve/disks/zfs"))
            .and(header("Cookie", "PVEAuthCookie=PVE:root@pam:ABC"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "name": "tank", "alloc": 1_099_511_627_776_u64, "size": 4_398_046_511_104_u64, "health": "ONLINE" },
                    { "name": "cold", "alloc": 549_755_813_888_u64, "size": 1_099_511_627_776_u64, "health": "ONLINE" }
                ]
            })))
            .mount(&server)
            .await;

        let client = client(&server, cache());
        let pools = client.fetch_pools().await.unwrap();
        client.fetch_pools().await.unwrap();

        assert_eq!(pools.len(), 2);
        assert_eq!(pools[0].name, "TANK");
        assert_eq!(pools[0].used, 1.0);
        assert_eq!(pools[0].total, 4.0);
        assert_eq!(pools[1].used, 0.5);
        assert_eq!(pools[1].kind, "backup/archive");
    }

    #[tokio::test]
    async fn test_expired_ticket_is_invalidated() {
        let server = MockServer::start().await;
        mount_ticket(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/api2/json/nodes/pve/disks/zfs"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let tickets = cache();
        let err = client(&server, tickets.clone()).fetch_pools().await.unwrap_err();
        assert!(matches!(err, UpstreamError::Unauthenticated(_)));
        assert!(tickets.current().await.is_none());
    }

    #[tokio::test]
    async fn test_rejected_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api2/json/access/ticket"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server, cache()).fetch_pools().await.unwrap_err();
        assert!(matches!(err, UpstreamError::Unauthenticated(_)));
        assert!(!err.is_expected());
    }

    #[tokio::test]
    async fn test_node_without_pools_is_empty() {
        let server = MockServer::start().await;
        mount_ticket(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/api2/json/nodes/pve/disks/zfs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;

        let err = client(&server, cache()).fetch_pools().await.unwrap_err();
        assert!(err.is_expected());
    }
}
