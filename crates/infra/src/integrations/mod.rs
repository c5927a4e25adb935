//! External service integrations

pub mod odata;

pub use odata::{ClientCredentialsSource, PupConnector, PupDataService};
