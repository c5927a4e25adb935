//! # Pricelink Core
//!
//! Pure connector logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - The `Transport` port and HTTP request/response envelopes
//! - OData query construction, response unwrapping and record normalization
//!
//! ## Architecture Principles
//! - Only depends on `pricelink-domain`
//! - No HTTP client or runtime code
//! - All external I/O via traits

pub mod odata;

// Infrastructure ports
pub mod transport_ports;

pub use odata::{normalize, unwrap_results, ODataQuery, QueryBuilder};
pub use transport_ports::{
    HttpMethod, HttpRequest, HttpResponse, RequestBody, Transport, TransportError,
};
