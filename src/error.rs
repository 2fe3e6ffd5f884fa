use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Failure modes of a call to an external service.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{0} returned no data")]
    Empty(&'static str),

    #[error("{provider} unreachable: {source}")]
    Unreachable {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} API error: {status}")]
    Status { provider: &'static str, status: u16 },

    #[error("{0} authentication failed")]
    Unauthenticated(&'static str),

    #[error("{provider} returned an unexpected payload: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },

    /// Failure reported by a vendor SDK rather than a raw HTTP exchange.
    #[error("{provider} request failed: {message}")]
    Sdk {
        provider: &'static str,
        message: String,
    },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl UpstreamError {
    pub fn unreachable(provider: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Unreachable { provider, source }
    }

    pub fn decode(provider: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |e| Self::Decode {
            provider,
            message: e.to_string(),
        }
    }

    pub fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured(_))
    }

    /// Missing credentials and empty answers are normal states, not failures.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::NotConfigured(_) | Self::Empty(_))
    }
}

/// Errors surfaced by the write endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    timestamp: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(UpstreamError::NotConfigured(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(UpstreamError::InvalidQuery(_)) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(e) => {
                tracing::error!(error = %e, "Upstream write failed");
                StatusCode::BAD_GATEWAY
            }
        };

        let body = ErrorBody {
            success: false,
            error: self.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}
