//! Connector constants
//!
//! Centralized location for the defaults used by configuration, transport,
//! token management and query construction.

// Service location defaults
pub const DEFAULT_BASE_URL: &str = "http://202.153.35.211:50000";
pub const DEFAULT_SERVICE_PATH: &str = "/sap/opu/odata/sap/ACM_APPLWC/";
pub const DEFAULT_ENTITY_SET: &str = "PUPOptimizationSet";
pub const OAUTH_TOKEN_PATH: &str = "/oauth/token";

// Transport pool
pub const DEFAULT_MAX_CONNECTIONS: usize = 100;
pub const DEFAULT_MAX_CONNECTIONS_PER_HOST: usize = 20;
pub const DEFAULT_KEEPALIVE_SECS: u64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_USER_AGENT: &str = "Pricelink-Connector/0.1";

// Token lifecycle
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

// Retry policy
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_UNIT_MS: u64 = 1_000;
pub const DEFAULT_BACKOFF_CAP_MS: u64 = 30_000;

// Query construction
pub const DEFAULT_QUERY_LIMIT: usize = 1000;

// Diagnostics
pub const ERROR_BODY_SNIPPET_CHARS: usize = 512;

// Settings prefix, completed by the deployment environment name
pub const SETTINGS_PREFIX: &str = "SAP";
