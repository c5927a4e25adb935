//! Token manager with single-flight refresh
//!
//! Manages the bearer token lifecycle:
//! - Lazy acquisition on first use
//! - Refresh once the cached token is within the safety margin of expiry
//! - Explicit invalidation after the service rejects a token
//!
//! Concurrent callers that find the token stale queue on one refresh lock.
//! The first caller performs the refresh; the others observe that the
//! refresh generation advanced and share its outcome, including failure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use pricelink_domain::{ConnectorError, Result};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::traits::TokenSource;
use super::types::TokenSet;

/// Outcome of the most recent refresh, shared with queued waiters.
#[derive(Debug, Default)]
struct RefreshOutcome {
    last_error: Option<ConnectorError>,
}

/// Bearer token cache in front of a `TokenSource`.
pub struct TokenManager {
    source: Arc<dyn TokenSource>,
    current: RwLock<Option<TokenSet>>,
    refresh_lock: Mutex<RefreshOutcome>,
    generation: AtomicU64,
    refresh_count: AtomicU64,
    margin_seconds: i64,
}

impl TokenManager {
    /// Create a token manager
    ///
    /// # Arguments
    /// * `source` - Token source used for every refresh
    /// * `margin_seconds` - Treat tokens as expired this many seconds early
    ///   (default: 300 = 5 min)
    #[must_use]
    pub fn new(source: Arc<dyn TokenSource>, margin_seconds: i64) -> Self {
        Self {
            source,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(RefreshOutcome::default()),
            generation: AtomicU64::new(0),
            refresh_count: AtomicU64::new(0),
            margin_seconds,
        }
    }

    /// Get a usable access token, refreshing first if needed
    ///
    /// # Errors
    /// Returns the refresh error (typically `AuthenticationFailed`). Waiters
    /// that queued behind a failed refresh receive the same error.
    pub async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.usable_token() {
            return Ok(token);
        }

        let observed = self.generation.load(Ordering::Acquire);
        let mut outcome = self.refresh_lock.lock().await;

        if self.generation.load(Ordering::Acquire) != observed {
            if let Some(err) = &outcome.last_error {
                debug!(error = %err, "Sharing failed token refresh with waiter");
                return Err(err.clone());
            }
            if let Some(token) = self.cached_token() {
                return Ok(token);
            }
        }

        // Refreshed between the fast path and taking the lock
        if let Some(token) = self.usable_token() {
            return Ok(token);
        }

        self.refresh_count.fetch_add(1, Ordering::Relaxed);
        let result = self.source.fetch_token().await;
        self.generation.fetch_add(1, Ordering::Release);

        match result {
            Ok(tokens) => {
                info!(
                    expires_in_secs = tokens.seconds_until_expiry(),
                    "Obtained new access token"
                );
                if tokens.is_expired(self.margin_seconds) {
                    warn!(
                        margin_secs = self.margin_seconds,
                        "Token lifetime is shorter than the refresh margin"
                    );
                }
                let token = tokens.access_token.clone();
                *self.current.write() = Some(tokens);
                outcome.last_error = None;
                Ok(token)
            }
            Err(err) => {
                warn!(error = %err, "Token refresh failed");
                outcome.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// `Authorization` header value, refreshing first if needed.
    ///
    /// # Errors
    /// See [`TokenManager::access_token`].
    pub async fn bearer_header(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.access_token().await?))
    }

    /// Drop the cached token so the next call refreshes.
    pub fn invalidate(&self) {
        if self.current.write().take().is_some() {
            debug!("Cached access token invalidated");
        }
    }

    /// Drop the cached token only if it is still `rejected`.
    ///
    /// A 401 can arrive for a request sent before another caller refreshed.
    /// Returns `false` when the cache already moved on.
    pub fn invalidate_token(&self, rejected: &str) -> bool {
        let mut current = self.current.write();
        if current.as_ref().is_some_and(|tokens| tokens.access_token == rejected) {
            *current = None;
            debug!("Rejected access token invalidated");
            true
        } else {
            debug!("Rejected access token was already replaced");
            false
        }
    }

    /// Current token set (without refresh)
    #[must_use]
    pub fn tokens(&self) -> Option<TokenSet> {
        self.current.read().clone()
    }

    /// Number of refresh calls issued to the token source.
    #[must_use]
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn margin_seconds(&self) -> i64 {
        self.margin_seconds
    }

    fn usable_token(&self) -> Option<String> {
        self.current
            .read()
            .as_ref()
            .filter(|tokens| !tokens.is_expired(self.margin_seconds))
            .map(|tokens| tokens.access_token.clone())
    }

    fn cached_token(&self) -> Option<String> {
        self.current.read().as_ref().map(|tokens| tokens.access_token.clone())
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("has_token", &self.current.read().is_some())
            .field("refresh_count", &self.refresh_count())
            .field("margin_seconds", &self.margin_seconds)
            .finish_non_exhaustive()
    }
}
