//! # Pricelink Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The pooled HTTP session implementing `Transport`
//! - The auth-aware retry executor
//! - The OData pricing connector and monthly data service
//! - Configuration loading and logging initialization
//!
//! ## Architecture
//! - Implements traits defined in `pricelink-core` and `pricelink-common`
//! - Contains all "impure" code (network, environment, files)

pub mod config;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod observability;

// Re-export commonly used items
pub use config::{load_from_env, load_from_file, load_from_lookup};
pub use errors::InfraError;
pub use http::{execute_with_retry, HttpSession, RetryExecutor};
pub use integrations::{ClientCredentialsSource, PupConnector, PupDataService};
pub use observability::init_tracing;
