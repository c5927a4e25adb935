//! Retry policy with classification-driven decisions
//!
//! The policy is pure: it classifies outcomes and decides whether and when
//! to retry. The executor that performs I/O and sleeps lives in the infra
//! crate.

use std::time::Duration;

use pricelink_domain::{FailureKind, RetrySettings};

/// Exponential backoff: `unit * 2^attempt`, capped.
///
/// `attempt` is the 0-based index of the failed attempt, so a failure on the
/// first attempt waits one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub unit: Duration,
    pub cap: Duration,
}

impl Backoff {
    pub const fn new(unit: Duration, cap: Duration) -> Self {
        Self { unit, cap }
    }

    /// Calculate the delay before retry number `attempt`
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.unit.saturating_mul(factor).min(self.cap)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30))
    }
}

/// Classify an HTTP status. `None` means success.
pub const fn classify_status(status: u16) -> Option<FailureKind> {
    match status {
        200..=299 => None,
        401 => Some(FailureKind::Unauthorized),
        500.. => Some(FailureKind::ServerTransient),
        _ => Some(FailureKind::ClientError),
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the given delay (zero for 401).
    RetryAfter(Duration),
    /// Retryable failure but the budget is spent.
    Exhausted,
    /// Failure that must not be retried.
    Terminal,
}

/// Retry policy for one logical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Separate 401 budget. `None` shares `max_retries`.
    pub unauthorized_retries: Option<u32>,
    /// Whether 5xx and connection failures are retried.
    pub retry_server_errors: bool,
    pub backoff: Backoff,
    /// Overall deadline for the call, including every retry.
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            unauthorized_retries: None,
            retry_server_errors: true,
            backoff: Backoff::default(),
            deadline: None,
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            unauthorized_retries: settings.unauthorized_retries,
            retry_server_errors: true,
            backoff: Backoff::new(settings.backoff_unit(), settings.backoff_cap()),
            deadline: settings.deadline(),
        }
    }

    /// Policy for non-idempotent requests: only 401 is retried, since the
    /// service rejected the request before processing it.
    #[must_use]
    pub fn for_mutations(&self) -> Self {
        Self { retry_server_errors: false, ..self.clone() }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_unauthorized_retries(mut self, retries: u32) -> Self {
        self.unauthorized_retries = Some(retries);
        self
    }

    pub fn budget(&self) -> RetryBudget<'_> {
        RetryBudget { policy: self, shared_used: 0, unauthorized_used: 0, failed_attempts: 0 }
    }
}

/// Retry accounting for one logical request.
#[derive(Debug)]
pub struct RetryBudget<'a> {
    policy: &'a RetryPolicy,
    shared_used: u32,
    unauthorized_used: u32,
    failed_attempts: u32,
}

impl RetryBudget<'_> {
    /// Record a failed attempt and decide what happens next.
    ///
    /// Backoff is keyed on the index of the failed attempt across every
    /// failure kind, so a 503 after a 401 waits two units.
    pub fn on_failure(&mut self, kind: FailureKind) -> RetryDecision {
        let attempt_index = self.failed_attempts;
        self.failed_attempts += 1;
        match kind {
            FailureKind::ClientError => RetryDecision::Terminal,
            FailureKind::Unauthorized => {
                match self.policy.unauthorized_retries {
                    Some(limit) if self.unauthorized_used >= limit => {
                        return RetryDecision::Exhausted
                    }
                    Some(_) => {}
                    None if self.shared_used >= self.policy.max_retries => {
                        return RetryDecision::Exhausted
                    }
                    None => self.shared_used += 1,
                }
                self.unauthorized_used += 1;
                RetryDecision::RetryAfter(Duration::ZERO)
            }
            FailureKind::ServerTransient => {
                if !self.policy.retry_server_errors || self.shared_used >= self.policy.max_retries
                {
                    return RetryDecision::Exhausted;
                }
                self.shared_used += 1;
                RetryDecision::RetryAfter(self.policy.backoff.delay(attempt_index))
            }
        }
    }

    /// Retries granted so far.
    pub fn retries(&self) -> u32 {
        self.shared_used + if self.policy.unauthorized_retries.is_some() {
            self.unauthorized_used
        } else {
            0
        }
    }
}
