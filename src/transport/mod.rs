//! Transport boundary — authenticated HTTP calls behind an object-safe trait.
//!
//! The pipeline never talks to `reqwest` directly. Everything goes through
//! `TransportClient`, which classifies failures precisely enough for the
//! upload queue and status monitor to apply correct retry policy:
//! not-connected vs timed-out vs 5xx vs 4xx are distinct variants.

pub mod http;

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use http::HttpTransport;

/// Transport-layer failure, classified for retry policy.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("no network connection")]
    NotConnected,

    #[error("request timed out after {0:?}")]
    TimedOut(Duration),

    #[error("connection lost mid-transfer: {0}")]
    ConnectionLost(String),

    #[error("DNS resolution failed: {0}")]
    Dns(String),

    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("client error (HTTP {status}): {message}")]
    Client { status: u16, message: String },

    #[error("malformed response body: {0}")]
    InvalidBody(String),
}

impl TransportError {
    /// Whether the retry policy may re-attempt after this failure.
    ///
    /// Network-layer failures and 5xx are retryable; 408 (request timeout)
    /// and 429 (rate limited) are the only retryable 4xx. Everything else
    /// — auth failures, bad requests, malformed bodies — fails immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotConnected | Self::TimedOut(_) | Self::ConnectionLost(_) | Self::Dns(_) => true,
            Self::Server { .. } => true,
            Self::Client { status, .. } => matches!(status, 408 | 429),
            Self::InvalidBody(_) => false,
        }
    }

    /// Build a Server/Client variant from a non-2xx HTTP status.
    pub fn from_status(status: u16, message: String) -> Self {
        if status >= 500 {
            Self::Server { status, message }
        } else {
            Self::Client { status, message }
        }
    }

    /// Short, user-actionable recovery hint shown alongside the error.
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::NotConnected | Self::Dns(_) => "Check your connection and try again.",
            Self::TimedOut(_) | Self::ConnectionLost(_) => {
                "The connection was interrupted. Try again on a more stable network."
            }
            Self::Server { .. } => "The service is having trouble. Try again in a few minutes.",
            Self::Client { .. } => "The request was rejected. Sign in again or contact support.",
            Self::InvalidBody(_) => "The service returned an unexpected answer. Try again later.",
        }
    }
}

/// HTTP method subset used by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Request body variants the pipeline produces.
#[derive(Debug, Clone)]
pub enum TransportBody {
    Empty,
    Json(serde_json::Value),
    /// Multipart form: the document file plus an optional JSON metadata field.
    Multipart {
        file_name: String,
        mime_type: String,
        bytes: Vec<u8>,
        metadata: Option<serde_json::Value>,
    },
}

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub path: String,
    pub body: TransportBody,
    pub timeout: Duration,
}

impl TransportRequest {
    pub fn get(path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: TransportBody::Empty,
            timeout,
        }
    }

    pub fn multipart(
        path: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
        metadata: Option<serde_json::Value>,
        timeout: Duration,
    ) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: TransportBody::Multipart {
                file_name: file_name.into(),
                mime_type: mime_type.into(),
                bytes,
                metadata,
            },
            timeout,
        }
    }
}

/// A successful (2xx) response. Non-2xx statuses surface as `TransportError`.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Deserialize the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body).map_err(|e| TransportError::InvalidBody(e.to_string()))
    }
}

/// Authenticated HTTP boundary. Implemented by `HttpTransport` in production
/// and by in-memory fakes in tests.
#[async_trait]
pub trait TransportClient: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Network reachability probe, consulted before scheduling network work.
///
/// Platform layers plug in a real connectivity monitor; the default assumes
/// the network is up and lets the transport error classification handle it.
pub trait ReachabilityProbe: Send + Sync {
    fn is_reachable(&self) -> bool;
}

/// Probe that always reports the network as reachable.
pub struct AlwaysReachable;

impl ReachabilityProbe for AlwaysReachable {
    fn is_reachable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_layer_errors_are_retryable() {
        assert!(TransportError::NotConnected.is_retryable());
        assert!(TransportError::TimedOut(Duration::from_secs(30)).is_retryable());
        assert!(TransportError::ConnectionLost("reset".into()).is_retryable());
        assert!(TransportError::Dns("lookup failed".into()).is_retryable());
    }

    #[test]
    fn server_errors_are_retryable() {
        let e = TransportError::from_status(503, "unavailable".into());
        assert!(matches!(e, TransportError::Server { status: 503, .. }));
        assert!(e.is_retryable());
    }

    #[test]
    fn rate_limit_and_request_timeout_are_retryable_client_errors() {
        assert!(TransportError::from_status(408, "timeout".into()).is_retryable());
        assert!(TransportError::from_status(429, "slow down".into()).is_retryable());
    }

    #[test]
    fn other_client_errors_are_not_retryable() {
        assert!(!TransportError::from_status(400, "bad request".into()).is_retryable());
        assert!(!TransportError::from_status(401, "unauthorized".into()).is_retryable());
        assert!(!TransportError::from_status(404, "not found".into()).is_retryable());
    }

    #[test]
    fn invalid_body_is_not_retryable() {
        assert!(!TransportError::InvalidBody("truncated".into()).is_retryable());
    }

    #[test]
    fn response_json_deserializes() {
        let resp = TransportResponse {
            status: 200,
            body: br#"{"jobId":"job-1"}"#.to_vec(),
        };
        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Body {
            job_id: String,
        }
        let body: Body = resp.json().unwrap();
        assert_eq!(body.job_id, "job-1");
    }

    #[test]
    fn response_json_reports_malformed_body() {
        let resp = TransportResponse {
            status: 200,
            body: b"not json".to_vec(),
        };
        let err = resp.json::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, TransportError::InvalidBody(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn every_error_carries_a_recovery_suggestion() {
        let errors = [
            TransportError::NotConnected,
            TransportError::TimedOut(Duration::from_secs(1)),
            TransportError::ConnectionLost("x".into()),
            TransportError::Dns("x".into()),
            TransportError::from_status(500, "x".into()),
            TransportError::from_status(403, "x".into()),
            TransportError::InvalidBody("x".into()),
        ];
        for e in errors {
            assert!(!e.recovery_suggestion().is_empty());
        }
    }
}
