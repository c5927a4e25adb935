//! OData response envelopes
//!
//! Results arrive as `{"d":{"results":[...]}}` (v2), `{"value":[...]}` (v4),
//! a bare array, or a single entity. Everything is unwrapped into a list.

use pricelink_domain::{ConnectorError, Result};
use serde_json::Value;
use tracing::debug;

/// Unwrap a response payload into its list of raw entities
///
/// # Errors
/// Returns `ConnectorError::InvalidResponse` for scalar or null payloads.
pub fn unwrap_results(payload: Value) -> Result<Vec<Value>> {
    match payload {
        Value::Array(items) => Ok(items),
        Value::Object(mut envelope) => {
            if has_next_link(&envelope) {
                debug!("Response is paged; returning the first page only");
            }

            match envelope.remove("d") {
                Some(Value::Object(mut inner)) => match inner.remove("results") {
                    Some(Value::Array(results)) => Ok(results),
                    Some(other) => {
                        inner.insert("results".to_string(), other);
                        Ok(vec![Value::Object(inner)])
                    }
                    // OData v2 single entity
                    None => Ok(vec![Value::Object(inner)]),
                },
                Some(Value::Array(items)) => Ok(items),
                Some(other) => {
                    envelope.insert("d".to_string(), other);
                    Ok(vec![Value::Object(envelope)])
                }
                None => match envelope.remove("value") {
                    Some(Value::Array(items)) => Ok(items),
                    Some(other) => {
                        envelope.insert("value".to_string(), other);
                        Ok(vec![Value::Object(envelope)])
                    }
                    None => Ok(vec![Value::Object(envelope)]),
                },
            }
        }
        other => Err(ConnectorError::InvalidResponse(format!(
            "Expected an object or array payload, got {}",
            kind(&other)
        ))),
    }
}

fn has_next_link(envelope: &serde_json::Map<String, Value>) -> bool {
    envelope.contains_key("@odata.nextLink")
        || envelope.get("d").and_then(|d| d.get("__next")).is_some()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
