//! Traits for token acquisition
//!
//! The token manager never talks to the network directly. Whatever obtains a
//! token (a client-credentials grant, a test stub) is injected as a
//! `TokenSource`.

use async_trait::async_trait;
use pricelink_domain::Result;

use super::types::TokenSet;

/// Source of fresh bearer tokens.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Obtain a new token from the authorization server.
    ///
    /// # Errors
    /// Returns `ConnectorError::AuthenticationFailed` when the server rejects
    /// the grant or the response cannot be parsed. Implementations must not
    /// retry internally.
    async fn fetch_token(&self) -> Result<TokenSet>;
}
