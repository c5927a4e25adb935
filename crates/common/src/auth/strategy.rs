//! Authentication strategies
//!
//! One closed set of variants behind `auth_headers()`. Adding a mode means
//! adding a variant; callers never branch on the configured mode.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pricelink_domain::{AuthMode, ConnectorError, Result};

use super::token_manager::TokenManager;

/// Header name/value pairs attached to one outgoing request.
pub type AuthHeaders = Vec<(String, String)>;

/// Static username/password pair for HTTP basic auth.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    username: String,
    password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// `Authorization` header value: `Basic base64(user:pass)`.
    pub fn header_value(&self) -> String {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {encoded}")
    }
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Per-request authentication capability.
#[derive(Debug, Clone)]
pub enum AuthStrategy {
    /// Basic auth. `None` sends no `Authorization` header.
    Basic(Option<BasicCredentials>),
    /// Bearer tokens from a client-credentials grant.
    OAuth2(Arc<TokenManager>),
    /// Declared mode without an implementation. Always fails.
    Unsupported(AuthMode),
}

impl AuthStrategy {
    /// Basic strategy from optional stored credentials.
    ///
    /// Both a username and a password are required to send a header.
    pub fn basic(username: Option<&str>, password: Option<&str>) -> Self {
        match (username, password) {
            (Some(user), Some(pass)) => Self::Basic(Some(BasicCredentials::new(user, pass))),
            _ => Self::Basic(None),
        }
    }

    pub fn oauth2(manager: Arc<TokenManager>) -> Self {
        Self::OAuth2(manager)
    }

    /// Headers to attach to the next request
    ///
    /// # Errors
    /// - `AuthenticationFailed` if an OAuth2 refresh fails
    /// - `NotImplemented` for unsupported modes
    pub async fn auth_headers(&self) -> Result<AuthHeaders> {
        match self {
            Self::Basic(Some(credentials)) => {
                Ok(vec![("Authorization".to_string(), credentials.header_value())])
            }
            Self::Basic(None) => Ok(Vec::new()),
            Self::OAuth2(manager) => {
                Ok(vec![("Authorization".to_string(), manager.bearer_header().await?)])
            }
            Self::Unsupported(mode) => Err(unsupported(*mode)),
        }
    }

    /// Make the strategy ready for use at connect time.
    ///
    /// OAuth2 obtains its first token eagerly so bad credentials surface on
    /// connect rather than on the first query.
    ///
    /// # Errors
    /// Same as [`AuthStrategy::auth_headers`].
    pub async fn prepare(&self) -> Result<()> {
        match self {
            Self::Basic(_) => Ok(()),
            Self::OAuth2(manager) => manager.access_token().await.map(|_| ()),
            Self::Unsupported(mode) => Err(unsupported(*mode)),
        }
    }

    /// Discard cached credentials unconditionally.
    pub fn invalidate(&self) {
        if let Self::OAuth2(manager) = self {
            manager.invalidate();
        }
    }

    /// Discard the cached token after the service answered 401 to a request
    /// sent with `sent`. A token refreshed since then is kept.
    pub fn invalidate_rejected(&self, sent: &AuthHeaders) {
        let Self::OAuth2(manager) = self else {
            return;
        };
        let rejected = sent
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("authorization"))
            .and_then(|(_, value)| value.strip_prefix("Bearer "));
        match rejected {
            Some(token) => {
                manager.invalidate_token(token);
            }
            None => manager.invalidate(),
        }
    }

    pub fn mode(&self) -> AuthMode {
        match self {
            Self::Basic(_) => AuthMode::Basic,
            Self::OAuth2(_) => AuthMode::OAuth2,
            Self::Unsupported(mode) => *mode,
        }
    }

    /// Token manager behind an OAuth2 strategy.
    pub fn token_manager(&self) -> Option<&Arc<TokenManager>> {
        match self {
            Self::OAuth2(manager) => Some(manager),
            _ => None,
        }
    }
}

fn unsupported(mode: AuthMode) -> ConnectorError {
    ConnectorError::NotImplemented(format!("{mode} authentication is not supported"))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::auth::{TokenSet, TokenSource};

    struct StaticSource;

    #[async_trait]
    impl TokenSource for StaticSource {
        async fn fetch_token(&self) -> Result<TokenSet> {
            Ok(TokenSet::new("static-token", 3600))
        }
    }

    #[tokio::test]
    async fn basic_encodes_user_and_password() {
        let strategy = AuthStrategy::basic(Some("alice"), Some("s3cret"));
        let headers = strategy.auth_headers().await.unwrap();
        // base64("alice:s3cret")
        assert_eq!(
            headers,
            vec![("Authorization".to_string(), "Basic YWxpY2U6czNjcmV0".to_string())]
        );
        assert_eq!(strategy.mode(), AuthMode::Basic);
    }

    #[tokio::test]
    async fn basic_without_credentials_sends_no_header() {
        let strategy = AuthStrategy::basic(Some("alice"), None);
        assert!(strategy.auth_headers().await.unwrap().is_empty());
        assert!(strategy.prepare().await.is_ok());
    }

    #[tokio::test]
    async fn oauth2_sends_bearer_and_invalidates_cache() {
        let manager = Arc::new(TokenManager::new(Arc::new(StaticSource), 300));
        let strategy = AuthStrategy::oauth2(Arc::clone(&manager));

        strategy.prepare().await.unwrap();
        let headers = strategy.auth_headers().await.unwrap();
        assert_eq!(headers[0].1, "Bearer static-token");
        assert_eq!(manager.refresh_count(), 1);

        strategy.invalidate();
        strategy.auth_headers().await.unwrap();
        assert_eq!(manager.refresh_count(), 2);
    }

    struct CountingSource(std::sync::atomic::AtomicU32);

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn fetch_token(&self) -> Result<TokenSet> {
            let n = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            Ok(TokenSet::new(format!("token-{n}"), 3600))
        }
    }

    #[tokio::test]
    async fn rejected_headers_only_invalidate_the_token_they_carried() {
        let source = Arc::new(CountingSource(std::sync::atomic::AtomicU32::new(0)));
        let manager = Arc::new(TokenManager::new(source, 300));
        let strategy = AuthStrategy::oauth2(Arc::clone(&manager));

        let first = strategy.auth_headers().await.unwrap();
        let second = strategy.auth_headers().await.unwrap();
        assert_eq!(first, second);

        strategy.invalidate_rejected(&first);
        assert_eq!(strategy.auth_headers().await.unwrap()[0].1, "Bearer token-2");

        strategy.invalidate_rejected(&second);
        assert_eq!(strategy.auth_headers().await.unwrap()[0].1, "Bearer token-2");
        assert_eq!(manager.refresh_count(), 2);
    }

    #[tokio::test]
    async fn saml_fails_fast_with_not_implemented() {
        let strategy = AuthStrategy::Unsupported(AuthMode::Saml);
        let err = strategy.auth_headers().await.unwrap_err();
        assert!(matches!(err, ConnectorError::NotImplemented(ref msg) if msg.contains("saml")));
        assert!(strategy.prepare().await.is_err());
        assert_eq!(strategy.mode(), AuthMode::Saml);
    }

    #[test]
    fn debug_hides_password() {
        let rendered = format!("{:?}", BasicCredentials::new("alice", "hunter2"));
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }
}
