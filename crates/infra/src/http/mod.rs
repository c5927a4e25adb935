//! HTTP transport and request execution
//!
//! - [`session`]: pooled reqwest session implementing the `Transport` port
//! - [`retry`]: auth-aware retry executor over any `Transport`

pub mod retry;
pub mod session;

pub use retry::{execute_with_retry, run_with_retry, RetryExecutor};
pub use session::HttpSession;
