//! Retry executor
//!
//! Wraps one logical request: fetches auth headers before every attempt,
//! classifies the outcome and either returns, retries or fails. 401 drops the
//! cached token and retries at once; 5xx and connection failures back off
//! exponentially; any other 4xx is terminal.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pricelink_common::{classify_status, AuthHeaders, AuthStrategy, RetryDecision, RetryPolicy};
use pricelink_core::{HttpRequest, HttpResponse, Transport, TransportError};
use pricelink_domain::{body_snippet, ConnectorError, FailureKind, Result, RetryAttempt};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn, Instrument};

/// Run `request_fn` under `policy`, attaching fresh auth headers each attempt
///
/// `request_fn` receives the headers for the attempt and performs exactly one
/// HTTP exchange.
///
/// # Errors
/// - `AuthenticationFailed` / `NotImplemented` from the auth strategy
/// - `ClientError` on a non-retryable status
/// - `RequestFailed` when the retry budget is spent
/// - `Timeout` when the policy deadline expires
pub async fn execute_with_retry<F, Fut>(
    auth: &AuthStrategy,
    policy: &RetryPolicy,
    request_fn: F,
) -> Result<HttpResponse>
where
    F: FnMut(AuthHeaders) -> Fut,
    Fut: Future<Output = std::result::Result<HttpResponse, TransportError>>,
{
    run_with_retry(auth, policy, request_fn, |_| {}).await
}

/// Same as [`execute_with_retry`], reporting every retry to `on_retry`.
pub async fn run_with_retry<F, Fut, R>(
    auth: &AuthStrategy,
    policy: &RetryPolicy,
    request_fn: F,
    on_retry: R,
) -> Result<HttpResponse>
where
    F: FnMut(AuthHeaders) -> Fut,
    Fut: Future<Output = std::result::Result<HttpResponse, TransportError>>,
    R: FnMut(&RetryAttempt),
{
    let started = Instant::now();
    let mut last_failure = None;
    let attempts = attempt_loop(auth, policy, request_fn, on_retry, &mut last_failure);

    let Some(deadline) = policy.deadline else {
        return attempts.await;
    };
    let outcome = tokio::time::timeout(deadline, attempts).await;
    match outcome {
        Ok(outcome) => outcome,
        Err(_) => {
            let elapsed_ms = millis(started.elapsed());
            warn!(
                elapsed_ms,
                deadline_ms = millis(deadline),
                last_status = ?last_failure.as_ref().and_then(ConnectorError::status),
                "Request deadline expired"
            );
            Err(ConnectorError::timeout(elapsed_ms, last_failure.as_ref()))
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

async fn attempt_loop<F, Fut, R>(
    auth: &AuthStrategy,
    policy: &RetryPolicy,
    mut request_fn: F,
    mut on_retry: R,
    last_failure: &mut Option<ConnectorError>,
) -> Result<HttpResponse>
where
    F: FnMut(AuthHeaders) -> Fut,
    Fut: Future<Output = std::result::Result<HttpResponse, TransportError>>,
    R: FnMut(&RetryAttempt),
{
    let mut budget = policy.budget();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let headers = auth.auth_headers().await?;
        let sent = headers.clone();

        let (kind, failure) = match request_fn(headers).await {
            Ok(response) => match classify_status(response.status) {
                None => {
                    debug!(attempt, status = response.status, "Request succeeded");
                    return Ok(response);
                }
                Some(kind) => (kind, attempt_failure(kind, &response)),
            },
            Err(TransportError::Io { message, .. }) => (
                FailureKind::ServerTransient,
                ConnectorError::ServerTransient { status: None, body: message },
            ),
            Err(other) => return Err(other.into()),
        };

        if kind == FailureKind::Unauthorized {
            auth.invalidate_rejected(&sent);
        }

        match budget.on_failure(kind) {
            RetryDecision::Terminal => {
                debug!(attempt, status = ?failure.status(), "Request rejected");
                return Err(failure);
            }
            RetryDecision::Exhausted => {
                warn!(attempts = attempt, error_kind = %kind, error = %failure, "Retry budget exhausted");
                return Err(ConnectorError::RequestFailed {
                    attempts: attempt,
                    status: failure.status(),
                    cause: failure.to_string(),
                });
            }
            RetryDecision::RetryAfter(delay) => {
                let retry = RetryAttempt {
                    attempt_number: attempt,
                    error_kind: kind,
                    delay_before_retry: delay,
                };
                warn!(
                    attempt = retry.attempt_number,
                    error_kind = %retry.error_kind,
                    delay_ms = millis(retry.delay_before_retry),
                    error = %failure,
                    "Retrying request"
                );
                on_retry(&retry);
                *last_failure = Some(failure);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn attempt_failure(kind: FailureKind, response: &HttpResponse) -> ConnectorError {
    let body = response.text();
    match kind {
        FailureKind::Unauthorized => ConnectorError::Unauthorized { body: body_snippet(&body) },
        FailureKind::ServerTransient => {
            ConnectorError::ServerTransient { status: Some(response.status), body: body_snippet(&body) }
        }
        FailureKind::ClientError => ConnectorError::client(response.status, &body),
    }
}

/// Executes [`HttpRequest`]s over a shared transport with auth and retries.
#[derive(Clone)]
pub struct RetryExecutor {
    transport: Arc<dyn Transport>,
    auth: AuthStrategy,
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(transport: Arc<dyn Transport>, auth: AuthStrategy, policy: RetryPolicy) -> Self {
        Self { transport, auth, policy }
    }

    pub fn auth(&self) -> &AuthStrategy {
        &self.auth
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `request` under the executor's default policy.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.execute_with_policy(request, &self.policy).await
    }

    /// Execute `request` under an explicit policy.
    pub async fn execute_with_policy(
        &self,
        request: HttpRequest,
        policy: &RetryPolicy,
    ) -> Result<HttpResponse> {
        let span = tracing::info_span!(
            "odata_request",
            request_id = %uuid::Uuid::new_v4(),
            method = %request.method,
            url = %request.url,
        );

        let transport = Arc::clone(&self.transport);
        execute_with_retry(&self.auth, policy, move |headers| {
            let transport = Arc::clone(&transport);
            let attempt = request.clone().with_headers(headers);
            async move { transport.execute(attempt).await }
        })
        .instrument(span)
        .await
    }

    /// Execute `request` and decode the body as JSON.
    ///
    /// # Errors
    /// Everything [`RetryExecutor::execute`] returns, plus `InvalidResponse`
    /// for an unparseable body.
    pub async fn execute_json(&self, request: HttpRequest) -> Result<Value> {
        self.execute(request).await?.parse_json()
    }
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("auth", &self.auth.mode())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pricelink_common::{Backoff, TokenManager, TokenSet, TokenSource};

    use super::*;

    /// Replays a scripted list of outcomes, repeating the last one.
    struct Script {
        outcomes: Mutex<VecDeque<std::result::Result<HttpResponse, TransportError>>>,
        calls: AtomicU32,
        seen_headers: Mutex<Vec<AuthHeaders>>,
    }

    impl Script {
        fn new(outcomes: Vec<std::result::Result<HttpResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicU32::new(0),
                seen_headers: Mutex::new(Vec::new()),
            })
        }

        fn next(&self, headers: AuthHeaders) -> std::result::Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_headers.lock().push(headers);
            let mut outcomes = self.outcomes.lock();
            if outcomes.len() > 1 {
                outcomes.pop_front().unwrap()
            } else {
                outcomes.front().cloned().unwrap()
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for Script {
        async fn execute(
            &self,
            request: HttpRequest,
        ) -> std::result::Result<HttpResponse, TransportError> {
            self.next(request.headers)
        }
    }

    struct CountingSource {
        fetches: AtomicU32,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn fetch_token(&self) -> Result<TokenSet> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(TokenSet::new(format!("token-{n}"), 3600))
        }
    }

    fn ok(body: &str) -> std::result::Result<HttpResponse, TransportError> {
        Ok(HttpResponse::new(200, body))
    }

    fn status(code: u16) -> std::result::Result<HttpResponse, TransportError> {
        Ok(HttpResponse::new(code, format!("status {code}")))
    }

    async fn run(
        script: &Arc<Script>,
        auth: &AuthStrategy,
        policy: &RetryPolicy,
    ) -> (Result<HttpResponse>, Vec<RetryAttempt>) {
        let mut retries = Vec::new();
        let outcome = run_with_retry(
            auth,
            policy,
            |headers| {
                let script = Arc::clone(script);
                async move { script.next(headers) }
            },
            |attempt| retries.push(*attempt),
        )
        .await;
        (outcome, retries)
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt_does_not_retry() {
        let script = Script::new(vec![ok("done")]);
        let (outcome, retries) = run(&script, &AuthStrategy::basic(None, None), &RetryPolicy::default()).await;

        assert_eq!(outcome.unwrap().text(), "done");
        assert!(retries.is_empty());
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_invalidates_token_and_retries_immediately() {
        let source = Arc::new(CountingSource { fetches: AtomicU32::new(0) });
        let manager = Arc::new(TokenManager::new(source.clone(), 300));
        let auth = AuthStrategy::oauth2(Arc::clone(&manager));
        let script = Script::new(vec![status(401), ok("fresh")]);

        let started = Instant::now();
        let (outcome, retries) = run(&script, &auth, &RetryPolicy::default()).await;

        assert_eq!(outcome.unwrap().text(), "fresh");
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(retries.len(), 1);
        assert_eq!(retries[0].error_kind, FailureKind::Unauthorized);
        assert_eq!(retries[0].delay_before_retry, Duration::ZERO);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);

        let seen = script.seen_headers.lock().clone();
        assert_eq!(seen[0][0].1, "Bearer token-1");
        assert_eq!(seen[1][0].1, "Bearer token-2");
    }

    #[tokio::test(start_paused = true)]
    async fn server_errors_back_off_exponentially_then_fail() {
        let script = Script::new(vec![status(503)]);
        let started = Instant::now();
        let (outcome, retries) = run(&script, &AuthStrategy::basic(None, None), &RetryPolicy::default()).await;

        match outcome.unwrap_err() {
            ConnectorError::RequestFailed { attempts, status, cause } => {
                assert_eq!(attempts, 4);
                assert_eq!(status, Some(503));
                assert!(cause.contains("status 503"));
            }
            other => panic!("expected RequestFailed, got {other:?}"),
        }

        let delays: Vec<_> = retries.iter().map(|r| r.delay_before_retry).collect();
        assert_eq!(delays, vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4)
        ]);
        assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(started.elapsed(), Duration::from_secs(7));
        assert_eq!(script.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn client_errors_are_terminal() {
        let script = Script::new(vec![status(404)]);
        let (outcome, retries) = run(&script, &AuthStrategy::basic(None, None), &RetryPolicy::default()).await;

        assert_eq!(outcome.unwrap_err(), ConnectorError::client(404, "status 404"));
        assert!(retries.is_empty());
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn connection_failures_are_transient() {
        let script = Script::new(vec![Err(TransportError::io("connection refused")), ok("up")]);
        let (outcome, retries) = run(&script, &AuthStrategy::basic(None, None), &RetryPolicy::default()).await;

        assert_eq!(outcome.unwrap().text(), "up");
        assert_eq!(retries[0].error_kind, FailureKind::ServerTransient);
        assert_eq!(retries[0].delay_before_retry, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_io_failures_carry_no_status() {
        let script = Script::new(vec![Err(TransportError::io("connection reset"))]);
        let policy = RetryPolicy::default().with_max_retries(1);
        let (outcome, _) = run(&script, &AuthStrategy::basic(None, None), &policy).await;

        match outcome.unwrap_err() {
            ConnectorError::RequestFailed { attempts: 2, status: None, cause } => {
                assert!(cause.contains("connection reset"));
            }
            other => panic!("expected RequestFailed without status, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn closed_session_is_not_retried() {
        let script = Script::new(vec![Err(TransportError::Closed)]);
        let (outcome, _) = run(&script, &AuthStrategy::basic(None, None), &RetryPolicy::default()).await;

        assert!(matches!(outcome, Err(ConnectorError::SessionClosed(_))));
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn mutations_do_not_replay_after_server_errors() {
        let script = Script::new(vec![status(500), ok("late")]);
        let policy = RetryPolicy::default().for_mutations();
        let (outcome, retries) = run(&script, &AuthStrategy::basic(None, None), &policy).await;

        assert!(matches!(
            outcome,
            Err(ConnectorError::RequestFailed { attempts: 1, status: Some(500), .. })
        ));
        assert!(retries.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_abandons_backoff_with_timeout() {
        let script = Script::new(vec![status(503)]);
        let policy = RetryPolicy::default().with_deadline(Duration::from_millis(2_500));
        let (outcome, _) = run(&script, &AuthStrategy::basic(None, None), &policy).await;

        let err = outcome.unwrap_err();
        match &err {
            ConnectorError::Timeout { elapsed_ms, status, cause } => {
                assert_eq!(*elapsed_ms, 2_500);
                assert_eq!(*status, Some(503));
                assert!(cause.as_deref().is_some_and(|cause| cause.contains("status 503")));
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
        assert_eq!(err.status(), Some(503));
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_before_any_failure_has_no_status() {
        let policy = RetryPolicy::default().with_deadline(Duration::from_millis(50));
        let outcome = execute_with_retry(&AuthStrategy::basic(None, None), &policy, |_| async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, TransportError>(HttpResponse::new(200, "late"))
        })
        .await;

        assert_eq!(outcome.unwrap_err(), ConnectorError::timeout(50, None));
    }

    /// Answers 401 to every request carrying `token-1`, after `delay`.
    struct RevokedFirstToken {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Transport for RevokedFirstToken {
        async fn execute(
            &self,
            request: HttpRequest,
        ) -> std::result::Result<HttpResponse, TransportError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let bearer = request.headers.iter().find(|(name, _)| name == "Authorization");
            if bearer.is_some_and(|(_, value)| value == "Bearer token-1") {
                tokio::time::sleep(Duration::from_millis(40 * u64::from(n))).await;
                return Ok(HttpResponse::new(401, "token revoked"));
            }
            Ok(HttpResponse::new(200, "ok"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn late_unauthorized_keeps_token_refreshed_by_another_request() {
        let source = Arc::new(CountingSource { fetches: AtomicU32::new(0) });
        let manager = Arc::new(TokenManager::new(source.clone(), 300));
        let auth = AuthStrategy::oauth2(Arc::clone(&manager));
        auth.prepare().await.unwrap();

        let transport = Arc::new(RevokedFirstToken { calls: AtomicU32::new(0) });
        let executor = RetryExecutor::new(transport, auth, RetryPolicy::default());

        let (first, second) = tokio::join!(
            executor.execute(HttpRequest::get("http://svc/Set")),
            executor.execute(HttpRequest::get("http://svc/Set")),
        );

        assert_eq!(first.unwrap().text(), "ok");
        assert_eq!(second.unwrap().text(), "ok");
        assert_eq!(manager.refresh_count(), 2);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn millis_saturates_instead_of_truncating() {
        assert_eq!(millis(Duration::from_millis(2_500)), 2_500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn unsupported_auth_fails_before_any_request() {
        let script = Script::new(vec![ok("never")]);
        let auth = AuthStrategy::Unsupported(pricelink_domain::AuthMode::Saml);
        let (outcome, _) = run(&script, &auth, &RetryPolicy::default()).await;

        assert!(matches!(outcome, Err(ConnectorError::NotImplemented(_))));
        assert_eq!(script.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn executor_attaches_auth_and_decodes_json() {
        let script = Script::new(vec![Ok(HttpResponse::json(200, &serde_json::json!({"ok": true})))]);
        let policy = RetryPolicy::default().with_backoff(Backoff::new(
            Duration::from_millis(10),
            Duration::from_millis(100),
        ));
        let executor = RetryExecutor::new(
            script.clone(),
            AuthStrategy::basic(Some("alice"), Some("s3cret")),
            policy,
        );

        let body = executor.execute_json(HttpRequest::get("http://svc/Set")).await.unwrap();
        assert_eq!(body["ok"], true);

        let seen = script.seen_headers.lock().clone();
        assert_eq!(seen[0], vec![(
            "Authorization".to_string(),
            "Basic YWxpY2U6czNjcmV0".to_string()
        )]);
    }
}
