//! Bearer token types
//!
//! `TokenSet` is the cached token state held by the token manager;
//! `TokenResponse` is the wire shape returned by a client-credentials token
//! endpoint.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use pricelink_domain::constants::DEFAULT_TOKEN_LIFETIME_SECS;
use serde::{Deserialize, Serialize};

/// Access token with an absolute expiry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    /// Bearer token value sent in the `Authorization` header
    pub access_token: String,

    /// Token type reported by the server (always treated as `Bearer`)
    pub token_type: String,

    /// Absolute expiration timestamp (UTC)
    pub expires_at: DateTime<Utc>,
}

impl TokenSet {
    /// Create a token that expires `expires_in` seconds from now.
    #[must_use]
    pub fn new(access_token: impl Into<String>, expires_in: i64) -> Self {
        Self::with_expiry(access_token, Utc::now() + Duration::seconds(expires_in))
    }

    /// Create a token with an explicit expiry timestamp.
    #[must_use]
    pub fn with_expiry(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self { access_token: access_token.into(), token_type: "Bearer".to_string(), expires_at }
    }

    /// Check if the token is expired or will expire within `margin_seconds`
    ///
    /// A token is only usable while `now < expires_at - margin`.
    #[must_use]
    pub fn is_expired(&self, margin_seconds: i64) -> bool {
        Utc::now() + Duration::seconds(margin_seconds) >= self.expires_at
    }

    /// Seconds until expiry (negative once expired).
    #[must_use]
    pub fn seconds_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }

    /// `Authorization` header value for this token.
    #[must_use]
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token endpoint response (RFC 6749 §5.1).
///
/// `expires_in` falls back to one hour when the server omits it.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_expires_in() -> i64 {
    DEFAULT_TOKEN_LIFETIME_SECS
}

impl From<TokenResponse> for TokenSet {
    fn from(response: TokenResponse) -> Self {
        let mut tokens = Self::new(response.access_token, response.expires_in);
        if let Some(token_type) = response.token_type {
            tokens.token_type = token_type;
        }
        tokens
    }
}
