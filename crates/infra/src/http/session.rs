//! Pooled HTTP transport session
//!
//! One `HttpSession` owns one keep-alive reqwest pool for the lifetime of a
//! connector. In-flight requests are bounded in total and per host by
//! semaphores. The pool is released exactly once: by `disconnect()`, or by
//! `Drop` when the owner never disconnected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use pricelink_core::{HttpMethod, HttpRequest, HttpResponse, RequestBody, Transport, TransportError};
use pricelink_domain::{ConnectorError, Result, TransportSettings};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, Method};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::errors::{transport_error, InfraError};

/// Pooled, keep-alive HTTP session implementing the `Transport` port.
pub struct HttpSession {
    id: uuid::Uuid,
    client: RwLock<Option<ReqwestClient>>,
    total: Arc<Semaphore>,
    per_host: DashMap<String, Arc<Semaphore>>,
    per_host_limit: usize,
    released: AtomicBool,
}

impl HttpSession {
    /// Create the session and its connection pool
    ///
    /// # Errors
    /// Returns `ConnectorError::Config` if the limits are zero or the client
    /// cannot be built.
    pub fn connect(settings: &TransportSettings) -> Result<Self> {
        if settings.max_connections == 0 || settings.max_connections_per_host == 0 {
            return Err(ConnectorError::Config(
                "Connection limits must be greater than zero".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = ReqwestClient::builder()
            .user_agent(settings.user_agent.clone())
            .default_headers(headers)
            .timeout(settings.request_timeout())
            .connect_timeout(settings.connect_timeout())
            .pool_idle_timeout(settings.keepalive())
            .pool_max_idle_per_host(settings.max_connections_per_host)
            .no_proxy()
            .build()
            .map_err(|err| ConnectorError::from(InfraError::from(err)))?;

        let id = uuid::Uuid::new_v4();
        info!(
            session_id = %id,
            max_connections = settings.max_connections,
            max_per_host = settings.max_connections_per_host,
            keepalive_secs = settings.keepalive_secs,
            "HTTP session opened"
        );

        Ok(Self {
            id,
            client: RwLock::new(Some(client)),
            total: Arc::new(Semaphore::new(settings.max_connections)),
            per_host: DashMap::new(),
            per_host_limit: settings.max_connections_per_host,
            released: AtomicBool::new(false),
        })
    }

    /// Release the pool. Returns `true` only for the call that released it.
    pub fn disconnect(&self) -> bool {
        let released = self.release();
        if released {
            info!(session_id = %self.id, "HTTP session closed");
        }
        released
    }

    pub fn is_open(&self) -> bool {
        !self.released.load(Ordering::Acquire)
    }

    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    /// Request slots currently free across all hosts.
    pub fn available_slots(&self) -> usize {
        self.total.available_permits()
    }

    fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.total.close();
        for entry in &self.per_host {
            entry.value().close();
        }
        self.client.write().take();
        true
    }

    fn host_semaphore(&self, url: &str) -> Arc<Semaphore> {
        let key = host_key(url);
        self.per_host
            .entry(key)
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_host_limit)))
            .clone()
    }
}

/// `host:port` of `url`, or the raw URL when it cannot be parsed.
fn host_key(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => format!(
            "{}:{}",
            parsed.host_str().unwrap_or_default(),
            parsed.port_or_known_default().unwrap_or_default()
        ),
        Err(_) => url.to_string(),
    }
}

#[async_trait]
impl Transport for HttpSession {
    async fn execute(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let client = self.client.read().clone().ok_or(TransportError::Closed)?;

        let _total = Arc::clone(&self.total).acquire_owned().await.map_err(|_| TransportError::Closed)?;
        let _host = self
            .host_semaphore(&request.url)
            .acquire_owned()
            .await
            .map_err(|_| TransportError::Closed)?;

        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };
        debug!(session_id = %self.id, %method, url = %request.url, "Sending HTTP request");

        let mut builder = client.request(method, &request.url);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.body {
            Some(RequestBody::Json(body)) => builder.json(body),
            Some(RequestBody::Form(fields)) => builder.form(fields),
            None => builder,
        };

        let response = builder.send().await.map_err(|err| transport_error(&err))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|err| transport_error(&err))?.to_vec();

        debug!(session_id = %self.id, status, bytes = body.len(), "Received HTTP response");
        Ok(HttpResponse { status, content_type, body })
    }
}

impl Drop for HttpSession {
    fn drop(&mut self) {
        if self.release() {
            warn!(session_id = %self.id, "HTTP session dropped without disconnect; released implicitly");
        }
    }
}

impl std::fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSession")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .field("available_slots", &self.available_slots())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn settings() -> TransportSettings {
        TransportSettings::default()
    }

    #[tokio::test]
    async fn sends_params_headers_and_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Set"))
            .and(query_param("$format", "json"))
            .and(header("X-HTTP-Method", "PATCH"))
            .and(header("User-Agent", "Pricelink-Connector/0.1"))
            .and(body_json(json!({"PUPValue": 1.5})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let session = HttpSession::connect(&settings()).unwrap();
        let request = HttpRequest::post(format!("{}/Set", server.uri()))
            .with_params(vec![("$format".into(), "json".into())])
            .with_header("X-HTTP-Method", "PATCH")
            .with_json(json!({"PUPValue": 1.5}));

        let response = session.execute(request).await.unwrap();
        assert_eq!(response.status, 204);
        assert!(session.disconnect());
    }

    #[tokio::test]
    async fn does_not_interpret_error_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(503).set_body_string("maintenance"),
            )
            .mount(&server)
            .await;

        let session = HttpSession::connect(&settings()).unwrap();
        let response = session.execute(HttpRequest::get(server.uri())).await.unwrap();
        assert_eq!(response.status, 503);
        assert_eq!(response.text(), "maintenance");
        session.disconnect();
    }

    #[tokio::test]
    async fn disconnect_releases_exactly_once() {
        let session = HttpSession::connect(&settings()).unwrap();
        assert!(session.is_open());
        assert!(session.disconnect());
        assert!(!session.disconnect());
        assert!(!session.is_open());

        let err = session.execute(HttpRequest::get("http://127.0.0.1:1/")).await.unwrap_err();
        assert_eq!(err, TransportError::Closed);
    }

    #[tokio::test]
    async fn permits_are_returned_after_each_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

        let session = HttpSession::connect(&settings()).unwrap();
        let before = session.available_slots();
        for _ in 0..3 {
            session.execute(HttpRequest::get(server.uri())).await.unwrap();
        }
        assert_eq!(session.available_slots(), before);
        session.disconnect();
    }

    #[test]
    fn zero_limits_are_rejected() {
        let settings = TransportSettings { max_connections_per_host: 0, ..TransportSettings::default() };
        assert!(matches!(HttpSession::connect(&settings), Err(ConnectorError::Config(_))));
    }

    #[test]
    fn host_key_includes_default_port() {
        assert_eq!(host_key("https://sap.example.com/odata"), "sap.example.com:443");
        assert_eq!(host_key("http://10.0.0.1:50000/x"), "10.0.0.1:50000");
    }
}
