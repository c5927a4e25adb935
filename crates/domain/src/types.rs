//! Pricing records, query filters and retry bookkeeping

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_QUERY_LIMIT;

/// Normalized pricing/valuation record handed to the forecasting pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PupRecord {
    pub company_code: String,
    pub material: String,
    /// Current PUP figure. Opaque to the connector.
    pub current_pup: f64,
    pub standard_price: f64,
    pub quantity: i64,
    pub plant: String,
    /// Posting period, `YYYY-MM`.
    pub period: String,
}

/// Structured filter criteria for a collection query.
///
/// Each list is a disjunction over its values; the lists and period bounds
/// are combined conjunctively. An entirely empty filter is an unrestricted
/// query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryFilter {
    pub company_codes: Vec<String>,
    pub materials: Vec<String>,
    pub plants: Vec<String>,
    pub period_from: Option<String>,
    pub period_to: Option<String>,
    pub limit: usize,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            company_codes: Vec::new(),
            materials: Vec::new(),
            plants: Vec::new(),
            period_from: None,
            period_to: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_company_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.company_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_materials<I, S>(mut self, materials: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.materials = materials.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_plants<I, S>(mut self, plants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plants = plants.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_period_from(mut self, period: impl Into<String>) -> Self {
        self.period_from = Some(period.into());
        self
    }

    pub fn with_period_to(mut self, period: impl Into<String>) -> Self {
        self.period_to = Some(period.into());
        self
    }

    /// Restrict the query to exactly one period.
    pub fn for_period(self, period: impl Into<String>) -> Self {
        let period = period.into();
        self.with_period_from(period.clone()).with_period_to(period)
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// True when no clause restricts the query.
    pub fn is_unrestricted(&self) -> bool {
        self.company_codes.is_empty()
            && self.materials.is_empty()
            && self.plants.is_empty()
            && self.period_from.is_none()
            && self.period_to.is_none()
    }
}

/// Classification of one failed request attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// HTTP 401; the cached token is stale.
    Unauthorized,
    /// HTTP 5xx or a connection-level failure.
    ServerTransient,
    /// Any other non-success status. Terminal.
    ClientError,
}

impl FailureKind {
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::ServerTransient)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::ServerTransient => "server_transient",
            Self::ClientError => "client_error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retry decision taken within a single logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempt {
    /// 1-based number of the attempt that failed.
    pub attempt_number: u32,
    pub error_kind: FailureKind,
    pub delay_before_retry: Duration,
}
