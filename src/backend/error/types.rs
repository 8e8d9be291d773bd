/**
 * Backend Error Types
 *
 * Two layers live here. `RealtimeError` is what the realtime service hands
 * back to a connection: it is reported as a typed frame and never closes the
 * socket. `BackendError` is the HTTP-facing error returned from handlers.
 *
 * # Status Code Mapping
 *
 * - `AuthError` - 401 Unauthorized
 * - `PermissionError` - 403 Forbidden
 * - `UpstreamError` - 502 Bad Gateway
 * - `TransportError` - 410 Gone
 */

use crate::shared::SharedError;
use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the realtime service for a single connection
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RealtimeError {
    /// Credential rejected, verifier timed out, or handshake out of order
    #[error("authentication failed: {reason}")]
    AuthError { reason: String },

    /// Authenticated, but not entitled to the requested group or action
    #[error("permission denied: {reason}")]
    PermissionError { reason: String },

    /// The data-access layer failed or timed out
    #[error("upstream unavailable: {message}")]
    UpstreamError { message: String },

    /// The connection's outbound queue is closed
    #[error("connection {connection_id} is gone")]
    TransportError { connection_id: Uuid },
}

impl RealtimeError {
    pub fn auth(reason: impl Into<String>) -> Self {
        Self::AuthError {
            reason: reason.into(),
        }
    }

    pub fn permission(reason: impl Into<String>) -> Self {
        Self::PermissionError {
            reason: reason.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamError {
            message: message.into(),
        }
    }

    pub fn transport(connection_id: Uuid) -> Self {
        Self::TransportError { connection_id }
    }

    /// Wire code carried in `error` frames
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthError { .. } => "auth_error",
            Self::PermissionError { .. } => "permission_error",
            Self::UpstreamError { .. } => "upstream_error",
            Self::TransportError { .. } => "transport_error",
        }
    }

    /// Reason without the category prefix
    pub fn detail(&self) -> String {
        match self {
            Self::AuthError { reason } | Self::PermissionError { reason } => reason.clone(),
            Self::UpstreamError { message } => message.clone(),
            Self::TransportError { connection_id } => connection_id.to_string(),
        }
    }
}

/// Backend-specific error types
///
/// Each variant can be converted to an HTTP response, see `conversion.rs`.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Handler error (e.g., missing headers, invalid request)
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// Realtime service error surfaced over HTTP
    #[error(transparent)]
    Realtime(#[from] RealtimeError),

    /// Shared error (from shared module)
    #[error(transparent)]
    SharedError(#[from] SharedError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a new handler error with a status code
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::Realtime(err) => match err {
                RealtimeError::AuthError { .. } => StatusCode::UNAUTHORIZED,
                RealtimeError::PermissionError { .. } => StatusCode::FORBIDDEN,
                RealtimeError::UpstreamError { .. } => StatusCode::BAD_GATEWAY,
                RealtimeError::TransportError { .. } => StatusCode::GONE,
            },
            Self::SharedError(err) => match err {
                SharedError::SerializationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                SharedError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            },
            Self::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error message
    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::Realtime(err) => err.to_string(),
            Self::SharedError(err) => err.to_string(),
            Self::SerializationError(err) => err.to_string(),
        }
    }
}
