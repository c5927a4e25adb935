//! Pricing data connector
//!
//! `PupConnector` ties the pieces together: a validated configuration, one
//! transport (the pooled [`HttpSession`] unless injected), an auth strategy
//! and the retry executor. It is `Send + Sync` and intended to be shared by
//! many concurrent queries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pricelink_common::{AuthStrategy, RetryPolicy, TokenManager};
use pricelink_core::{normalize, unwrap_results, HttpRequest, HttpResponse, QueryBuilder, Transport};
use pricelink_domain::{AuthMode, ConnectorConfig, ConnectorError, PupRecord, QueryFilter, Result};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::token_source::ClientCredentialsSource;
use crate::http::{HttpSession, RetryExecutor};

/// Header that tunnels PATCH through POST.
const METHOD_OVERRIDE_HEADER: &str = "X-HTTP-Method";

/// Connector for the pricing entity collection.
pub struct PupConnector {
    config: ConnectorConfig,
    session: Option<Arc<HttpSession>>,
    executor: RetryExecutor,
    queries: QueryBuilder,
    closed: AtomicBool,
}

impl PupConnector {
    /// Validate `config`, open a pooled session and prepare authentication
    ///
    /// For oauth2 the first token is fetched here, so bad client credentials
    /// fail the connect rather than the first query.
    ///
    /// # Errors
    /// - `Config` for an invalid configuration
    /// - `AuthenticationFailed` if the first token cannot be obtained
    /// - `NotImplemented` for saml
    pub async fn connect(config: ConnectorConfig) -> Result<Self> {
        config.validate()?;
        let session = Arc::new(HttpSession::connect(&config.transport)?);
        let transport: Arc<dyn Transport> = session.clone();

        match Self::assemble(config, transport, Some(Arc::clone(&session))).await {
            Ok(connector) => Ok(connector),
            Err(err) => {
                session.disconnect();
                Err(err)
            }
        }
    }

    /// Same as [`PupConnector::connect`] over an injected transport.
    pub async fn with_transport(config: ConnectorConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        Self::assemble(config, transport, None).await
    }

    async fn assemble(
        config: ConnectorConfig,
        transport: Arc<dyn Transport>,
        session: Option<Arc<HttpSession>>,
    ) -> Result<Self> {
        let auth = build_auth_strategy(&config, Arc::clone(&transport))?;
        auth.prepare().await?;

        let policy = RetryPolicy::from_settings(&config.retry);
        let queries = QueryBuilder::new(config.collection_url());
        info!(
            collection = %queries.collection_url(),
            auth_mode = %auth.mode(),
            max_retries = policy.max_retries,
            "Connector ready"
        );

        Ok(Self {
            executor: RetryExecutor::new(transport, auth, policy),
            queries,
            session,
            config,
            closed: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.executor.auth().mode()
    }

    pub fn auth(&self) -> &AuthStrategy {
        self.executor.auth()
    }

    pub fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    /// Query the collection and normalize every entity into a record
    ///
    /// # Errors
    /// Any error from [`PupConnector::query_raw`].
    pub async fn query_records(&self, filter: &QueryFilter) -> Result<Vec<PupRecord>> {
        let raw = self.query_raw(filter).await?;
        let records = normalize(&raw);
        if records.len() != raw.len() {
            warn!(received = raw.len(), normalized = records.len(), "Some entities were skipped");
        }
        Ok(records)
    }

    /// Query the collection and return the unwrapped raw entities
    ///
    /// # Errors
    /// - `InvalidQuery` for a zero limit or blank filter value
    /// - `ClientError`, `RequestFailed`, `Timeout` from the retry executor
    /// - `InvalidResponse` for a body that is not an OData payload
    /// - `SessionClosed` after [`PupConnector::disconnect`]
    pub async fn query_raw(&self, filter: &QueryFilter) -> Result<Vec<Value>> {
        self.ensure_open()?;
        let query = self.queries.build(filter)?;
        debug!(filter = ?query.param("$filter"), top = ?query.param("$top"), "Querying collection");

        let request = HttpRequest::get(query.path).with_params(query.params);
        let payload = self.executor.execute_json(request).await?;
        let entities = unwrap_results(payload)?;

        info!(count = entities.len(), "Query returned entities");
        Ok(entities)
    }

    /// Create an entity. Succeeds on 200 or 201
    ///
    /// Only 401 is retried: a server error may have applied the write.
    ///
    /// # Errors
    /// Same as [`PupConnector::query_raw`].
    pub async fn create_record(&self, payload: Value) -> Result<Value> {
        self.ensure_open()?;
        let request = HttpRequest::post(self.queries.collection_url()).with_json(payload);

        let policy = self.executor.policy().for_mutations();
        let response = self.executor.execute_with_policy(request, &policy).await?;
        expect_status(&response, &[200, 201], "create")?;

        info!(status = response.status, "Entity created");
        json_or_empty(&response)
    }

    /// Update the entity `key` via POST with `X-HTTP-Method: PATCH`
    ///
    /// Succeeds on 200 or 204 and returns the JSON body, or an empty object
    /// when the service answers without one.
    ///
    /// # Errors
    /// `InvalidQuery` for a blank key, otherwise same as
    /// [`PupConnector::create_record`].
    pub async fn update_record(&self, key: &str, payload: Value) -> Result<Value> {
        self.ensure_open()?;
        let request = HttpRequest::post(self.queries.entity_path(key)?)
            .with_header(METHOD_OVERRIDE_HEADER, "PATCH")
            .with_json(payload);

        let policy = self.executor.policy().for_mutations();
        let response = self.executor.execute_with_policy(request, &policy).await?;
        expect_status(&response, &[200, 204], "update")?;

        info!(status = response.status, key, "Entity updated");
        json_or_empty(&response)
    }

    /// Probe the collection with `$top=1`
    ///
    /// Network failures and non-2xx answers map to `Ok(false)`.
    ///
    /// # Errors
    /// Authentication misconfiguration and use after disconnect propagate.
    pub async fn check_health(&self) -> Result<bool> {
        self.ensure_open()?;
        let probe = self.queries.probe();
        let request = HttpRequest::get(probe.path).with_params(probe.params);
        let policy = self.executor.policy().clone().with_max_retries(0);

        match self.executor.execute_with_policy(request, &policy).await {
            Ok(_) => Ok(true),
            Err(
                err @ (ConnectorError::AuthenticationFailed { .. }
                | ConnectorError::NotImplemented(_)
                | ConnectorError::SessionClosed(_)),
            ) => Err(err),
            Err(err) => {
                warn!(error = %err, error_kind = err.label(), "Health check failed");
                Ok(false)
            }
        }
    }

    /// Release the session. Returns `true` only for the first call.
    pub fn disconnect(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(session) = &self.session {
            session.disconnect();
        }
        info!(collection = %self.queries.collection_url(), "Connector disconnected");
        true
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ConnectorError::SessionClosed("connector already disconnected".to_string()))
        }
    }
}

impl std::fmt::Debug for PupConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PupConnector")
            .field("collection", &self.queries.collection_url())
            .field("executor", &self.executor)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// Auth strategy for the configured mode. Saml yields the unsupported variant.
///
/// # Errors
/// Returns `ConnectorError::Config` if oauth2 lacks client credentials.
pub fn build_auth_strategy(
    config: &ConnectorConfig,
    transport: Arc<dyn Transport>,
) -> Result<AuthStrategy> {
    match config.auth_mode {
        AuthMode::Basic => {
            Ok(AuthStrategy::basic(config.username.as_deref(), config.password.as_deref()))
        }
        AuthMode::OAuth2 => {
            let source = ClientCredentialsSource::from_config(transport, config)?;
            let manager = TokenManager::new(Arc::new(source), config.token_refresh_margin_secs);
            Ok(AuthStrategy::oauth2(Arc::new(manager)))
        }
        AuthMode::Saml => Ok(AuthStrategy::Unsupported(AuthMode::Saml)),
    }
}

fn expect_status(response: &HttpResponse, accepted: &[u16], operation: &str) -> Result<()> {
    if accepted.contains(&response.status) {
        Ok(())
    } else {
        Err(ConnectorError::InvalidResponse(format!(
            "Unexpected HTTP {} for {operation}",
            response.status
        )))
    }
}

fn json_or_empty(response: &HttpResponse) -> Result<Value> {
    if response.body.iter().all(u8::is_ascii_whitespace) || !response.is_json() {
        return Ok(Value::Object(Map::new()));
    }
    response.parse_json()
}
