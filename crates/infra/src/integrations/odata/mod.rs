//! OData pricing collection integration
//!
//! - [`connector`]: `PupConnector` with query, create, update and health check
//! - [`token_source`]: OAuth2 client-credentials token endpoint
//! - [`service`]: monthly record retrieval over short-lived connectors

pub mod connector;
pub mod service;
pub mod token_source;

pub use connector::{build_auth_strategy, PupConnector};
pub use service::{current_period, PupDataService};
pub use token_source::ClientCredentialsSource;
