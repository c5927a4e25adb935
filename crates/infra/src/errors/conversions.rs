//! Conversions from external infrastructure errors into connector errors.

use pricelink_core::TransportError;
use pricelink_domain::ConnectorError;
use reqwest::Error as HttpError;
use toml::de::Error as TomlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
///
/// JSON errors have no conversion here: a malformed config file and a
/// malformed response body need different variants, so callers map them.
#[derive(Debug)]
pub struct InfraError(pub ConnectorError);

impl From<InfraError> for ConnectorError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoConnectorError {
    fn into_connector(self) -> ConnectorError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TransportError / ConnectorError */
/* -------------------------------------------------------------------------- */

/// Classify a reqwest failure for the transport port.
///
/// Builder errors (bad URL, bad header) are not retryable; everything else is
/// a connection-level I/O failure.
pub fn transport_error(err: &HttpError) -> TransportError {
    if err.is_builder() {
        return TransportError::InvalidRequest { message: err.to_string() };
    }

    let timeout = err.is_timeout();
    #[cfg(not(target_arch = "wasm32"))]
    let connect = err.is_connect();
    #[cfg(target_arch = "wasm32")]
    let connect = false;

    let message = if timeout {
        format!("HTTP request timed out: {err}")
    } else if connect {
        format!("HTTP connection failure: {err}")
    } else {
        format!("HTTP transport error: {err}")
    };

    TransportError::Io { message, timeout, connect }
}

impl IntoConnectorError for HttpError {
    fn into_connector(self) -> ConnectorError {
        if self.is_builder() {
            return ConnectorError::Config(format!("Failed to build HTTP client: {self}"));
        }
        transport_error(&self).into()
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_connector())
    }
}

/* -------------------------------------------------------------------------- */
/* toml::de::Error → ConnectorError */
/* -------------------------------------------------------------------------- */

impl IntoConnectorError for TomlError {
    fn into_connector(self) -> ConnectorError {
        ConnectorError::Config(format!("Invalid TOML format: {self}"))
    }
}

impl From<TomlError> for InfraError {
    fn from(value: TomlError) -> Self {
        InfraError(value.into_connector())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
