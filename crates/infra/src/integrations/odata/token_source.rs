//! OAuth2 client-credentials token source

use std::sync::Arc;

use async_trait::async_trait;
use pricelink_common::auth::{TokenResponse, TokenSet, TokenSource};
use pricelink_core::{HttpRequest, Transport, TransportError};
use pricelink_domain::{ConnectorConfig, ConnectorError, Result};
use tracing::debug;

/// Fetches bearer tokens with `grant_type=client_credentials`.
pub struct ClientCredentialsSource {
    transport: Arc<dyn Transport>,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl ClientCredentialsSource {
    pub fn new(
        transport: Arc<dyn Transport>,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Source for the token endpoint and client credentials in `config`
    ///
    /// # Errors
    /// Returns `ConnectorError::Config` if the client id or secret is absent.
    pub fn from_config(transport: Arc<dyn Transport>, config: &ConnectorConfig) -> Result<Self> {
        let (Some(client_id), Some(client_secret)) =
            (config.client_id.as_deref(), config.client_secret.as_deref())
        else {
            return Err(ConnectorError::Config(
                "oauth2 authentication requires client_id and client_secret".to_string(),
            ));
        };
        Ok(Self::new(transport, config.token_url(), client_id, client_secret))
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}

#[async_trait]
impl TokenSource for ClientCredentialsSource {
    async fn fetch_token(&self) -> Result<TokenSet> {
        let request = HttpRequest::post(&self.token_url).with_form(vec![
            ("grant_type".to_string(), "client_credentials".to_string()),
            ("client_id".to_string(), self.client_id.clone()),
            ("client_secret".to_string(), self.client_secret.clone()),
        ]);

        debug!(token_url = %self.token_url, "Requesting access token");
        let response = self.transport.execute(request).await.map_err(|err| match err {
            TransportError::Io { message, .. } => ConnectorError::authentication(None, &message),
            other => other.into(),
        })?;

        if response.status != 200 {
            return Err(ConnectorError::authentication(Some(response.status), &response.text()));
        }

        let token: TokenResponse = response.parse_json().map_err(|err| {
            ConnectorError::authentication(Some(response.status), &err.to_string())
        })?;
        debug!(expires_in = token.expires_in, "Token endpoint issued access token");
        Ok(token.into())
    }
}

impl std::fmt::Debug for ClientCredentialsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentialsSource")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish_non_exhaustive()
    }
}
