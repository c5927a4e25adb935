//! Common building blocks shared across Pricelink crates.
//!
//! - [`auth`]: auth strategies, bearer token cache with single-flight refresh
//! - [`resilience`]: backoff, failure classification and retry policy

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;
pub mod resilience;

pub use auth::{AuthHeaders, AuthStrategy, BasicCredentials, TokenManager, TokenSet, TokenSource};
pub use resilience::{classify_status, Backoff, RetryBudget, RetryDecision, RetryPolicy};
