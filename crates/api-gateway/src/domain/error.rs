//! API Gateway error types.
//!
//! [`BridgeError`] is what a bridged call can fail with. [`ApiError`] is what an
//! HTTP client sees: a status code plus `{"error":{"code":…,"message":…}}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use shared_broker::BrokerError;
use shared_envelope::EnvelopeError;
use std::fmt;
use std::time::Duration;

/// Machine-readable error codes carried in HTTP error bodies
pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const REPLY_TIMEOUT: &str = "reply_timeout";
    pub const BROKER_UNAVAILABLE: &str = "broker_unavailable";
    pub const MALFORMED_REPLY: &str = "malformed_reply";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Failure of one request/reply exchange.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// The reply channel could not be created. Nothing was sent.
    #[error("reply channel management failed: {0}")]
    ChannelManagement(BrokerError),

    /// Send or receive failed after the reply channel existed.
    #[error("broker transport failed: {0}")]
    Transport(BrokerError),

    /// No reply arrived before the deadline.
    #[error("no reply within {}ms", .waited.as_millis())]
    Timeout { waited: Duration },

    /// The reply bytes are not a valid envelope.
    #[error("malformed reply envelope: {0}")]
    MalformedEnvelope(String),

    /// The reply carried no usable body.
    #[error("malformed reply body: {0}")]
    MalformedBody(String),

    /// The request could not be encoded.
    #[error("request encoding failed: {0}")]
    Encode(EnvelopeError),
}

impl BridgeError {
    /// Whether the caller may reasonably try the whole call again.
    ///
    /// The bridge itself never retries.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Transport(_) | Self::ChannelManagement(_)
        )
    }

    #[must_use]
    pub fn is_malformed_reply(&self) -> bool {
        matches!(self, Self::MalformedEnvelope(_) | Self::MalformedBody(_))
    }
}

impl From<EnvelopeError> for BridgeError {
    fn from(e: EnvelopeError) -> Self {
        match e {
            EnvelopeError::MalformedEnvelope(reason) => Self::MalformedEnvelope(reason),
            EnvelopeError::MalformedBody(reason) => Self::MalformedBody(reason),
            other @ EnvelopeError::BodyNotUtf8 { .. } => Self::Encode(other),
        }
    }
}

/// HTTP-facing error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Response status
    pub status: StatusCode,
    /// Stable error code
    pub code: &'static str,
    /// Human-readable message
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Invalid caller input
    pub fn bad_request(details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, details)
    }

    /// No reply in time
    pub fn gateway_timeout(details: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, codes::REPLY_TIMEOUT, details)
    }

    /// Broker could not be used
    pub fn service_unavailable(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::BROKER_UNAVAILABLE,
            details,
        )
    }

    /// Downstream answered with something unusable
    pub fn bad_gateway(details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, codes::MALFORMED_REPLY, details)
    }

    /// Internal error
    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTERNAL_ERROR,
            details,
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}] {}", self.status.as_u16(), self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        let message = e.to_string();
        match e {
            BridgeError::Timeout { .. } => Self::gateway_timeout(message),
            BridgeError::ChannelManagement(_) | BridgeError::Transport(_) => {
                Self::service_unavailable(message)
            }
            BridgeError::MalformedEnvelope(_) | BridgeError::MalformedBody(_) => {
                Self::bad_gateway(message)
            }
            BridgeError::Encode(_) => Self::internal(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: &self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Gateway-level errors (startup and shutdown)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// The HTTP server stopped with an error
    #[error("server error: {0}")]
    Serve(String),

    /// `start` was called on a running service
    #[error("service already running")]
    AlreadyRunning,
}
