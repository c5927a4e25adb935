//! Configuration loader
//!
//! Loads connector configuration from environment variables or files.
//!
//! ## Environment Variables
//! Every setting is namespaced by deployment environment, e.g. for
//! `DeploymentEnvironment::Production`:
//! - `SAP_PRODUCTION_BASE_URL`: service root (default built in)
//! - `SAP_PRODUCTION_ODATA_SERVICE`: service path (default built in)
//! - `SAP_PRODUCTION_ENTITY_SET`: entity set (default `PUPOptimizationSet`)
//! - `SAP_PRODUCTION_AUTH_TYPE`: `basic` | `oauth2` | `saml` (default `basic`)
//! - `SAP_PRODUCTION_USERNAME`, `SAP_PRODUCTION_PASSWORD`
//! - `SAP_PRODUCTION_CLIENT_ID`, `SAP_PRODUCTION_CLIENT_SECRET`
//! - `SAP_PRODUCTION_TENANT_ID`
//!
//! Empty values count as unset.
//!
//! ## Files
//! JSON or TOML, detected by extension. Missing keys take their defaults.

use std::path::Path;

use pricelink_domain::{AuthMode, ConnectorConfig, ConnectorError, DeploymentEnvironment, Result};

use crate::errors::InfraError;

/// Load configuration for `environment` from process environment variables
///
/// # Errors
/// Returns `ConnectorError::Config` if `AUTH_TYPE` names an unknown mode.
pub fn load_from_env(environment: DeploymentEnvironment) -> Result<ConnectorConfig> {
    let config = load_from_lookup(environment, |key| std::env::var(key).ok())?;
    tracing::info!(
        environment = %environment,
        auth_mode = %config.auth_mode,
        "Configuration loaded from environment variables"
    );
    Ok(config)
}

/// Load configuration for `environment` through an arbitrary key lookup
///
/// `lookup` receives fully qualified names such as `SAP_TEST_BASE_URL`.
///
/// # Errors
/// Returns `ConnectorError::Config` if `AUTH_TYPE` names an unknown mode.
pub fn load_from_lookup<F>(environment: DeploymentEnvironment, lookup: F) -> Result<ConnectorConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let setting = |key: &str| {
        lookup(&environment.setting(key)).map(|value| value.trim().to_string()).filter(|v| !v.is_empty())
    };

    let mut config = ConnectorConfig::default();
    if let Some(base_url) = setting("BASE_URL") {
        config.base_url = base_url;
    }
    if let Some(service_path) = setting("ODATA_SERVICE") {
        config.service_path = service_path;
    }
    if let Some(entity_set) = setting("ENTITY_SET") {
        config.entity_set = entity_set;
    }
    if let Some(auth_type) = setting("AUTH_TYPE") {
        config.auth_mode = auth_type.parse::<AuthMode>().map_err(|e| {
            ConnectorError::Config(format!("{}: {e}", environment.setting("AUTH_TYPE")))
        })?;
    }
    config.username = setting("USERNAME");
    config.password = setting("PASSWORD");
    config.client_id = setting("CLIENT_ID");
    config.client_secret = setting("CLIENT_SECRET");
    config.tenant_id = setting("TENANT_ID");

    Ok(config)
}

/// Load configuration from a JSON or TOML file
///
/// # Errors
/// Returns `ConnectorError::Config` if the file is missing, unreadable, or
/// its format is invalid.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<ConnectorConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConnectorError::Config(format!("Config file not found: {}", path.display())));
    }

    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| ConnectorError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, path)
}

/// Parse configuration content, format chosen by the extension of `path`.
fn parse_config(contents: &str, path: &Path) -> Result<ConnectorConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents).map_err(|e| InfraError::from(e).into()),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ConnectorError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(ConnectorError::Config(format!("Unsupported config format: {extension}"))),
    }
}
