//! Connector configuration (credential store)
//!
//! `ConnectorConfig` is built once, validated, and then shared read-only by
//! every component of a connector instance. Secrets are redacted from the
//! `Debug` representation.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKOFF_CAP_MS, DEFAULT_BACKOFF_UNIT_MS, DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_ENTITY_SET, DEFAULT_KEEPALIVE_SECS, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_MAX_CONNECTIONS_PER_HOST, DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SERVICE_PATH, DEFAULT_USER_AGENT, OAUTH_TOKEN_PATH, SETTINGS_PREFIX,
    TOKEN_REFRESH_MARGIN_SECS,
};
use crate::errors::{ConnectorError, Result};
use crate::impl_domain_enum_conversions;

/// Authentication mode used against the data service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// HTTP basic authentication from stored username/password.
    #[default]
    Basic,
    /// OAuth2 client-credentials grant with cached bearer tokens.
    OAuth2,
    /// SAML bearer assertion. Declared but not supported.
    Saml,
}

impl_domain_enum_conversions!(AuthMode {
    Basic => "basic",
    OAuth2 => "oauth2",
    Saml => "saml",
});

/// Deployment environment selecting which named settings apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentEnvironment {
    Development,
    Test,
    #[default]
    Production,
}

impl_domain_enum_conversions!(DeploymentEnvironment {
    Development => "development",
    Test => "test",
    Production => "production",
});

impl DeploymentEnvironment {
    /// Prefix of every setting for this environment, e.g. `SAP_PRODUCTION_`.
    pub fn settings_prefix(&self) -> String {
        format!("{}_{}_", SETTINGS_PREFIX, self.as_str().to_ascii_uppercase())
    }

    /// Fully qualified setting name for `key`, e.g. `SAP_TEST_BASE_URL`.
    pub fn setting(&self, key: &str) -> String {
        format!("{}{}", self.settings_prefix(), key)
    }
}

/// Pooled transport limits and timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    pub max_connections: usize,
    pub max_connections_per_host: usize,
    pub keepalive_secs: u64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_connections_per_host: DEFAULT_MAX_CONNECTIONS_PER_HOST,
            keepalive_secs: DEFAULT_KEEPALIVE_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl TransportSettings {
    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Retry budget and backoff settings for read requests.
///
/// `unauthorized_retries = None` means 401 retries draw from the same
/// `max_retries` budget as transient server failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub backoff_unit_ms: u64,
    pub backoff_cap_ms: u64,
    pub unauthorized_retries: Option<u32>,
    pub deadline_ms: Option<u64>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_unit_ms: DEFAULT_BACKOFF_UNIT_MS,
            backoff_cap_ms: DEFAULT_BACKOFF_CAP_MS,
            unauthorized_retries: None,
            deadline_ms: None,
        }
    }
}

impl RetrySettings {
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }

    pub fn backoff_cap(&self) -> Duration {
        Duration::from_millis(self.backoff_cap_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

/// Static connector configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    pub base_url: String,
    pub service_path: String,
    pub entity_set: String,
    pub auth_mode: AuthMode,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub tenant_id: Option<String>,
    pub token_refresh_margin_secs: i64,
    pub transport: TransportSettings,
    pub retry: RetrySettings,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            service_path: DEFAULT_SERVICE_PATH.to_string(),
            entity_set: DEFAULT_ENTITY_SET.to_string(),
            auth_mode: AuthMode::Basic,
            username: None,
            password: None,
            client_id: None,
            client_secret: None,
            tenant_id: None,
            token_refresh_margin_secs: TOKEN_REFRESH_MARGIN_SECS,
            transport: TransportSettings::default(),
            retry: RetrySettings::default(),
        }
    }
}

impl fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("base_url", &self.base_url)
            .field("service_path", &self.service_path)
            .field("entity_set", &self.entity_set)
            .field("auth_mode", &self.auth_mode)
            .field("username", &self.username)
            .field("password", &redact(self.password.as_deref()))
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(self.client_secret.as_deref()))
            .field("tenant_id", &self.tenant_id)
            .field("token_refresh_margin_secs", &self.token_refresh_margin_secs)
            .field("transport", &self.transport)
            .field("retry", &self.retry)
            .finish()
    }
}

fn redact(secret: Option<&str>) -> Option<&'static str> {
    secret.map(|_| "<redacted>")
}

impl ConnectorConfig {
    /// Configuration pointing at `base_url` with default service path and
    /// entity set.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    pub fn with_service_path(mut self, service_path: impl Into<String>) -> Self {
        self.service_path = service_path.into();
        self
    }

    pub fn with_entity_set(mut self, entity_set: impl Into<String>) -> Self {
        self.entity_set = entity_set.into();
        self
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth_mode = AuthMode::Basic;
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_oauth2(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.auth_mode = AuthMode::OAuth2;
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn with_auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.auth_mode = auth_mode;
        self
    }

    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_transport(mut self, transport: TransportSettings) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_token_refresh_margin_secs(mut self, margin_secs: i64) -> Self {
        self.token_refresh_margin_secs = margin_secs;
        self
    }

    /// Full URL of the entity collection: base URL + service path + entity
    /// set, joined with exactly one slash at each seam.
    pub fn collection_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let service = self.service_path.trim_matches('/');
        let entity = self.entity_set.trim_matches('/');

        if service.is_empty() {
            format!("{base}/{entity}")
        } else {
            format!("{base}/{service}/{entity}")
        }
    }

    /// Client-credentials token endpoint (`<base_url>/oauth/token`).
    pub fn token_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), OAUTH_TOKEN_PATH)
    }

    /// Check that the configuration can produce a working connector.
    ///
    /// # Errors
    /// Returns `ConnectorError::Config` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.base_url).map_err(|e| {
            ConnectorError::Config(format!("Invalid base URL '{}': {}", self.base_url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConnectorError::Config(format!(
                "Base URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        if self.entity_set.trim_matches('/').trim().is_empty() {
            return Err(ConnectorError::Config("Entity set name cannot be empty".into()));
        }

        if self.auth_mode == AuthMode::OAuth2
            && (is_blank(self.client_id.as_deref()) || is_blank(self.client_secret.as_deref()))
        {
            return Err(ConnectorError::Config(
                "OAuth2 requires client_id and client_secret".into(),
            ));
        }

        if self.transport.max_connections == 0 || self.transport.max_connections_per_host == 0 {
            return Err(ConnectorError::Config("Connection limits must be greater than zero".into()));
        }

        if self.token_refresh_margin_secs < 0 {
            return Err(ConnectorError::Config("Token refresh margin cannot be negative".into()));
        }

        Ok(())
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_points_at_default_collection() {
        let config = ConnectorConfig::default();
        assert_eq!(
            config.collection_url(),
            "http://202.153.35.211:50000/sap/opu/odata/sap/ACM_APPLWC/PUPOptimizationSet"
        );
        assert_eq!(config.auth_mode, AuthMode::Basic);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.token_refresh_margin_secs, 300);
    }

    #[test]
    fn collection_url_normalizes_slashes() {
        let config = ConnectorConfig::new("https://sap.example.com/")
            .with_service_path("odata/v2")
            .with_entity_set("/Prices");
        assert_eq!(config.collection_url(), "https://sap.example.com/odata/v2/Prices");

        let flat = ConnectorConfig::new("https://sap.example.com").with_service_path("");
        assert_eq!(flat.collection_url(), "https://sap.example.com/PUPOptimizationSet");
    }

    #[test]
    fn token_url_hangs_off_base_url() {
        let config = ConnectorConfig::new("https://auth.example.com/");
        assert_eq!(config.token_url(), "https://auth.example.com/oauth/token");
    }

    #[test]
    fn oauth2_requires_client_credentials() {
        let config = ConnectorConfig::new("https://sap.example.com").with_auth_mode(AuthMode::OAuth2);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConnectorError::Config(ref msg) if msg.contains("client_id")));

        let config = ConnectorConfig::new("https://sap.example.com").with_oauth2("id", "secret");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_base_url_and_entity_set() {
        assert!(ConnectorConfig::new("not a url").validate().is_err());
        assert!(ConnectorConfig::new("ftp://sap.example.com").validate().is_err());
        assert!(ConnectorConfig::new("https://sap.example.com")
            .with_entity_set("  ")
            .validate()
            .is_err());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = ConnectorConfig::new("https://sap.example.com")
            .with_basic_auth("alice", "hunter2")
            .with_oauth2("client", "top-secret");
        let rendered = format!("{config:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("top-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn auth_mode_parses_from_settings_strings() {
        assert_eq!("basic".parse::<AuthMode>(), Ok(AuthMode::Basic));
        assert_eq!("OAuth2".parse::<AuthMode>(), Ok(AuthMode::OAuth2));
        assert_eq!("saml".parse::<AuthMode>(), Ok(AuthMode::Saml));
        assert!("kerberos".parse::<AuthMode>().is_err());
    }

    #[test]
    fn environment_prefix_matches_settings_convention() {
        assert_eq!(DeploymentEnvironment::Development.settings_prefix(), "SAP_DEVELOPMENT_");
        assert_eq!(DeploymentEnvironment::Production.setting("BASE_URL"), "SAP_PRODUCTION_BASE_URL");
        assert_eq!("test".parse::<DeploymentEnvironment>(), Ok(DeploymentEnvironment::Test));
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: ConnectorConfig = serde_json::from_str(
            r#"{"base_url": "https://sap.example.com", "auth_mode": "oauth2", "retry": {"max_retries": 5}}"#,
        )
        .expect("partial config should deserialize");

        assert_eq!(config.auth_mode, AuthMode::OAuth2);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.backoff_unit_ms, DEFAULT_BACKOFF_UNIT_MS);
        assert_eq!(config.entity_set, DEFAULT_ENTITY_SET);
    }
}
