//! Shared fixtures for connector integration tests.

#![allow(dead_code)]

use pricelink_domain::{ConnectorConfig, RetrySettings};
use serde_json::{json, Value};
use wiremock::MockServer;

pub const SERVICE_PATH: &str = "/odata/";
pub const COLLECTION_PATH: &str = "/odata/PUPOptimizationSet";

/// Retry settings with millisecond backoff so tests finish quickly.
pub fn fast_retry(max_retries: u32) -> RetrySettings {
    RetrySettings { max_retries, backoff_unit_ms: 5, backoff_cap_ms: 20, ..RetrySettings::default() }
}

/// Basic-auth configuration pointing at `server`.
pub fn basic_config(server: &MockServer) -> ConnectorConfig {
    ConnectorConfig::new(server.uri())
        .with_service_path(SERVICE_PATH)
        .with_basic_auth("alice", "s3cret")
        .with_retry(fast_retry(3))
}

/// OAuth2 configuration pointing at `server` for both data and tokens.
pub fn oauth_config(server: &MockServer) -> ConnectorConfig {
    ConnectorConfig::new(server.uri())
        .with_service_path(SERVICE_PATH)
        .with_oauth2("pricing-app", "client-secret")
        .with_retry(fast_retry(3))
}

/// OData v2 collection envelope.
pub fn v2_results(entities: Vec<Value>) -> Value {
    json!({ "d": { "results": entities } })
}

pub fn pup_entity(company: &str, material: &str, pup: &str, quantity: i64) -> Value {
    json!({
        "__metadata": { "type": "ACM_APPLWC.PUPOptimization" },
        "CompanyCode": company,
        "MaterialNumber": material,
        "PUPValue": pup,
        "StandardPrice": "10.00",
        "Quantity": quantity,
        "Plant": "P01",
        "Period": "2024-05"
    })
}

pub fn token_body(token: &str) -> Value {
    json!({ "access_token": token, "token_type": "Bearer", "expires_in": 3600 })
}
