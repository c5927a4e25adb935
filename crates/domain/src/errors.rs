//! Error types used throughout the connector

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::ERROR_BODY_SNIPPET_CHARS;

/// Main error type for the Pricelink connector
///
/// Terminal variants carry the last observed HTTP status (when one exists)
/// and a truncated response body so callers can diagnose failures without
/// re-issuing the request.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details", rename_all = "snake_case")]
pub enum ConnectorError {
    /// Caller supplied an invalid query or mutation target. Never retried.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Credential or token acquisition failed.
    #[error("Authentication failed{}: {message}", fmt_status(.status))]
    AuthenticationFailed { status: Option<u16>, message: String },

    /// The service rejected the credentials of one attempt (HTTP 401).
    #[error("Unauthorized (HTTP 401): {body}")]
    Unauthorized { body: String },

    /// Server-side or connection-level failure of one attempt.
    #[error("Transient server failure{}: {body}", fmt_status(.status))]
    ServerTransient { status: Option<u16>, body: String },

    /// Non-retryable client error (4xx other than 401).
    #[error("Request rejected (HTTP {status}): {body}")]
    ClientError { status: u16, body: String },

    /// The caller's deadline expired before the request completed. Carries
    /// the last failed attempt, if one finished before expiry.
    #[error("Request timed out after {elapsed_ms} ms{}{}", fmt_status(.status), fmt_cause(.cause))]
    Timeout { elapsed_ms: u64, status: Option<u16>, cause: Option<String> },

    /// The retry budget was exhausted on a retryable failure.
    #[error("Request failed after {attempts} attempts{}: {cause}", fmt_status(.status))]
    RequestFailed { attempts: u32, status: Option<u16>, cause: String },

    /// The requested capability is declared but not available.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The transport session was already released.
    #[error("Session closed: {0}")]
    SessionClosed(String),

    /// The service answered with a payload that cannot be interpreted.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|code| format!(" (HTTP {code})")).unwrap_or_default()
}

fn fmt_cause(cause: &Option<String>) -> String {
    cause.as_ref().map(|cause| format!(": {cause}")).unwrap_or_default()
}

impl ConnectorError {
    /// Build an authentication failure with a truncated body.
    pub fn authentication(status: Option<u16>, body: &str) -> Self {
        Self::AuthenticationFailed { status, message: body_snippet(body) }
    }

    /// Deadline expiry after `last_failure`, the most recent failed attempt.
    pub fn timeout(elapsed_ms: u64, last_failure: Option<&ConnectorError>) -> Self {
        Self::Timeout {
            elapsed_ms,
            status: last_failure.and_then(Self::status),
            cause: last_failure.map(ToString::to_string),
        }
    }

    /// Build a client error with a truncated body.
    pub fn client(status: u16, body: &str) -> Self {
        Self::ClientError { status, body: body_snippet(body) }
    }

    /// Stable label suitable for structured logging.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::InvalidQuery(_) => "invalid_query",
            Self::AuthenticationFailed { .. } => "authentication_failed",
            Self::Unauthorized { .. } => "unauthorized",
            Self::ServerTransient { .. } => "server_transient",
            Self::ClientError { .. } => "client_error",
            Self::Timeout { .. } => "timeout",
            Self::RequestFailed { .. } => "request_failed",
            Self::NotImplemented(_) => "not_implemented",
            Self::Config(_) => "config",
            Self::SessionClosed(_) => "session_closed",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Internal(_) => "internal",
        }
    }

    /// Last HTTP status carried by the error, if any.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::AuthenticationFailed { status, .. }
            | Self::ServerTransient { status, .. }
            | Self::RequestFailed { status, .. }
            | Self::Timeout { status, .. } => *status,
            Self::Unauthorized { .. } => Some(401),
            Self::ClientError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the retry executor may recover this error locally.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::ServerTransient { .. })
    }
}

/// Truncate a response body to a diagnostic snippet on a char boundary.
pub fn body_snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(ERROR_BODY_SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Result type alias for connector operations
pub type Result<T> = std::result::Result<T, ConnectorError>;
