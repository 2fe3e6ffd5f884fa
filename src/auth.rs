//! Process-wide credential cache for upstreams that hand out session tokens.
//!
//! Lifecycle: a cache starts empty, the first call to [`TokenCache::get_or_refresh`]
//! runs the login closure and stores the token until `ttl` elapses (minus the
//! safety margin). When the upstream rejects a token the caller invalidates the
//! cache, so the following request logs in again. Concurrent refreshes are not
//! serialized; the last one to finish wins.

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

struct CachedToken<T> {
    token: T,
    expires_at: DateTime<Utc>,
}

/// `T` is whatever the login hands back: a bare token, or a session carrying
/// the token together with the endpoints it is valid for.
pub struct TokenCache<T = String> {
    name: &'static str,
    ttl: Duration,
    safety_margin: Duration,
    slot: RwLock<Option<CachedToken<T>>>,
}

impl<T: Clone> TokenCache<T> {
    pub fn new(name: &'static str, ttl: Duration, safety_margin: Duration) -> Self {
        Self {
            name,
            ttl,
            safety_margin,
            slot: RwLock::new(None),
        }
    }

    /// Returns the cached token if it is still valid.
    pub async fn current(&self) -> Option<T> {
        let cached = self.slot.read().await;
        cached
            .as_ref()
            .filter(|t| Utc::now() < t.expires_at - self.safety_margin)
            .map(|t| t.token.clone())
    }

    pub async fn get_or_refresh<F, Fut, E>(&self, refresh: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(token) = self.current().await {
            return Ok(token);
        }

        debug!("Refreshing {} credential", self.name);
        let token = refresh().await?;

        let mut cached = self.slot.write().await;
        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at: Utc::now() + self.ttl,
        });

        Ok(token)
    }

    pub async fn invalidate(&self) {
        debug!("Invalidating {} credential", self.name);
        let mut cached = self.slot.write().await;
        *cached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn login(counter: &AtomicUsize) -> Result<String, String> {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("token-{}", n))
    }

    #[tokio::test]
    async fn test_token_is_reused_until_invalidated() {
        let cache = TokenCache::new("test", Duration::hours(2), Duration::minutes(5));
        let logins = AtomicUsize::new(0);

        let first = cache.get_or_refresh(|| login(&logins)).await.unwrap();
        let second = cache.get_or_refresh(|| login(&logins)).await.unwrap();
        assert_eq!(first, "token-1");
        assert_eq!(second, "token-1");
        assert_eq!(logins.load(Ordering::SeqCst), 1);

        cache.invalidate().await;
        assert!(cache.current().await.is_none());

        let third = cache.get_or_refresh(|| login(&logins)).await.unwrap();
        assert_eq!(third, "token-2");
    }

    #[tokio::test]
    async fn test_token_inside_safety_margin_is_refreshed() {
        // ttl shorter than the margin: every stored token is already stale
        let cache = TokenCache::new("test", Duration::minutes(1), Duration::minutes(5));
        let logins = AtomicUsize::new(0);

        cache.get_or_refresh(|| login(&logins)).await.unwrap();
        cache.get_or_refresh(|| login(&logins)).await.unwrap();
        assert_eq!(logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_cache_empty() {
        let cache = TokenCache::new("test", Duration::hours(1), Duration::zero());
        let result: Result<String, &str> = cache.get_or_refresh(|| async { Err("denied") }).await;
        assert_eq!(result, Err("denied"));
        assert!(cache.current().await.is_none());
    }
}
