//! Live-or-mock response strategy shared by every read endpoint.

use std::future::Future;

use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::error::UpstreamError;

pub const MOCK_SOURCE: &str = "mock";

/// JSON envelope returned by every read endpoint. `body` carries `data` and any
/// route-specific extras (stats, track, ...) flattened next to it.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

impl<T> Envelope<T> {
    pub fn live(body: T, source: &'static str) -> Self {
        Self {
            success: true,
            body,
            source,
            error: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn mock(body: T, success: bool, error: Option<String>) -> Self {
        Self {
            success,
            body,
            source: MOCK_SOURCE,
            error,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Plain `{ data: [...] }` body.
#[derive(Debug, Serialize)]
pub struct Listing<T> {
    pub data: T,
}

impl<T> Listing<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Runs `primary`; on failure substitutes `fallback(&err)`.
///
/// A missing credential or an empty upstream answer is an expected state and
/// still reports `success: true`; any other failure reports `success: false`.
/// Both carry `source: "mock"`.
pub async fn fetch_with_fallback<T, Fut, F>(
    provider: &'static str,
    primary: Fut,
    fallback: F,
) -> Envelope<T>
where
    Fut: Future<Output = Result<T, UpstreamError>>,
    F: FnOnce(&UpstreamError) -> T,
{
    match primary.await {
        Ok(body) => Envelope::live(body, provider),
        Err(e) => {
            warn!("{} unavailable, serving fallback: {}", provider, e);
            let body = fallback(&e);
            Envelope::mock(body, e.is_expected(), Some(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_live_result_is_passed_through() {
        let env = fetch_with_fallback(
            "beszel",
            async { Ok(Listing::new(vec![1, 2, 3])) },
            |_| Listing::new(vec![]),
        )
        .await;

        assert!(env.success);
        assert_eq!(env.source, "beszel");
        assert_eq!(env.body.data, vec![1, 2, 3]);
        assert!(env.error.is_none());
    }

    #[tokio::test]
    async fn test_failure_uses_fallback_and_reports_error() {
        let env = fetch_with_fallback(
            "beszel",
            async {
                Err::<Listing<Vec<i32>>, _>(UpstreamError::Status {
                    provider: "beszel",
                    status: 500,
                })
            },
            |_| Listing::new(vec![9]),
        )
        .await;

        assert!(!env.success);
        assert_eq!(env.source, "mock");
        assert_eq!(env.body.data, vec![9]);
        assert_eq!(env.error.as_deref(), Some("beszel API error: 500"));
    }

    #[tokio::test]
    async fn test_not_configured_is_a_successful_mock() {
        let env = fetch_with_fallback(
            "dawarich",
            async { Err::<Listing<Vec<i32>>, _>(UpstreamError::NotConfigured("dawarich")) },
            |e| {
                assert!(e.is_not_configured());
                Listing::new(vec![])
            },
        )
        .await;

        assert!(env.success);
        assert_eq!(env.source, "mock");
    }

    #[tokio::test]
    async fn test_empty_answer_is_a_successful_mock() {
        let env = fetch_with_fallback(
            "uptime-kuma",
            async { Err::<Listing<Vec<i32>>, _>(UpstreamError::Empty("uptime-kuma")) },
            |_| Listing::new(vec![1]),
        )
        .await;

        assert!(env.success);
        assert_eq!(env.source, "mock");
        assert_eq!(env.error.as_deref(), Some("uptime-kuma returned no data"));
    }

    #[test]
    fn test_envelope_flattens_body() {
        let env = Envelope::live(Listing::new(vec!["a"]), "blinko");
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["data"][0], "a");
        assert_eq!(json["source"], "blinko");
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
        assert!(json["timestamp"].is_string());
    }
}
