//! # Pricelink Domain
//!
//! Business domain types and models for the Pricelink connector.
//!
//! This crate contains:
//! - Connector configuration (credential store) and deployment environments
//! - The connector error taxonomy and `Result` alias
//! - Pricing records, query filters and retry bookkeeping types
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other Pricelink crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
