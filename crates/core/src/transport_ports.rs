//! Transport port interfaces
//!
//! The connector issues every HTTP call through `Transport`. The production
//! adapter is the pooled reqwest session in `pricelink-infra`; tests inject
//! stubs. A transport never interprets status codes.

use async_trait::async_trait;
use pricelink_domain::{ConnectorError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// HTTP methods used by the connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    /// `application/x-www-form-urlencoded` pairs
    Form(Vec<(String, String)>),
}

/// One outgoing HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self { method, url: url.into(), params: Vec::new(), headers: Vec::new(), body: None }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    #[must_use]
    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_headers<I>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.headers.extend(headers);
        self
    }

    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    #[must_use]
    pub fn with_form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(fields));
        self
    }

    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Raw HTTP response. Status is not interpreted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, content_type: None, body: body.into() }
    }

    /// JSON response with `application/json` content type.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: body.to_string().into_bytes(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
    }

    /// Body decoded as UTF-8, lossy.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    /// Returns `ConnectorError::InvalidResponse` if the body is not valid
    /// JSON for `T`.
    pub fn parse_json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ConnectorError::InvalidResponse(format!("Malformed JSON body (HTTP {}): {}", self.status, e))
        })
    }
}

/// Failure to obtain any HTTP response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection-level failure (DNS, refused, reset, timeout).
    #[error("Transport I/O failure: {message}")]
    Io { message: String, timeout: bool, connect: bool },

    /// The request could not be built (malformed URL or header).
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The session was already released.
    #[error("Transport session is closed")]
    Closed,
}

impl TransportError {
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io { message: message.into(), timeout: false, connect: false }
    }

    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Io { timeout: true, .. })
    }

    pub const fn is_connect(&self) -> bool {
        matches!(self, Self::Io { connect: true, .. })
    }
}

impl From<TransportError> for ConnectorError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io { message, .. } => {
                ConnectorError::ServerTransient { status: None, body: message }
            }
            TransportError::InvalidRequest { message } => ConnectorError::InvalidQuery(message),
            TransportError::Closed => {
                ConnectorError::SessionClosed("transport session already released".to_string())
            }
        }
    }
}

/// Trait for HTTP transport operations
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one request and return the raw response
    ///
    /// # Errors
    /// Returns `TransportError` only when no HTTP response was received.
    async fn execute(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError>;
}
