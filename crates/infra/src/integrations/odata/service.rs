//! Monthly pricing data retrieval

use std::sync::Arc;

use chrono::Utc;
use pricelink_core::Transport;
use pricelink_domain::{ConnectorConfig, DeploymentEnvironment, PupRecord, QueryFilter, Result};
use tracing::info;

use super::connector::PupConnector;
use crate::config::load_from_env;

/// Opens a short-lived connector per call and always disconnects it.
#[derive(Clone)]
pub struct PupDataService {
    config: ConnectorConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl PupDataService {
    pub fn new(config: ConnectorConfig) -> Self {
        Self { config, transport: None }
    }

    /// Service over an injected transport instead of a pooled session.
    pub fn with_transport(config: ConnectorConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport: Some(transport) }
    }

    /// Service configured from `SAP_<ENV>_*` environment variables.
    pub fn from_environment(environment: DeploymentEnvironment) -> Result<Self> {
        Ok(Self::new(load_from_env(environment)?))
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Records of `company_codes` for `period` (`YYYY-MM`, default: the
    /// current UTC month)
    ///
    /// # Errors
    /// Any connect or query error of [`PupConnector`].
    pub async fn monthly_records(
        &self,
        company_codes: &[String],
        period: Option<&str>,
    ) -> Result<Vec<PupRecord>> {
        let period = period.map_or_else(current_period, str::to_string);
        let filter = QueryFilter::new().with_company_codes(company_codes.iter().cloned()).for_period(&period);

        let connector = match &self.transport {
            Some(transport) => PupConnector::with_transport(self.config.clone(), Arc::clone(transport)).await?,
            None => PupConnector::connect(self.config.clone()).await?,
        };
        let outcome = connector.query_records(&filter).await;
        connector.disconnect();

        let records = outcome?;
        info!(period = %period, companies = company_codes.len(), count = records.len(), "Monthly records retrieved");
        Ok(records)
    }
}

impl std::fmt::Debug for PupDataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PupDataService")
            .field("config", &self.config)
            .field("injected_transport", &self.transport.is_some())
            .finish()
    }
}

/// Current month as `YYYY-MM` in UTC.
pub fn current_period() -> String {
    Utc::now().format("%Y-%m").to_string()
}
