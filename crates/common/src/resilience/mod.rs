//! Resilience patterns for request execution
//!
//! - **Backoff**: exponential delay in the attempt count, capped
//! - **Retry policy**: classification of outcomes into `Unauthorized`,
//!   `ServerTransient` and `ClientError`, and the retry budget that decides
//!   between retrying, giving up and failing terminally

pub mod retry;

pub use retry::{classify_status, Backoff, RetryBudget, RetryDecision, RetryPolicy};
