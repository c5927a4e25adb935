//! OData query construction
//!
//! Translates a [`QueryFilter`] into `$format`, `$top` and `$filter` query
//! parameters against the configured entity collection.

use pricelink_domain::{ConnectorError, QueryFilter, Result};

use super::fields;

/// Collection path plus ordered query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ODataQuery {
    pub path: String,
    pub params: Vec<(String, String)>,
}

impl ODataQuery {
    /// Value of the parameter named `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }
}

/// Builds queries and entity paths for one entity collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBuilder {
    collection_url: String,
}

impl QueryBuilder {
    pub fn new(collection_url: impl Into<String>) -> Self {
        Self { collection_url: collection_url.into() }
    }

    pub fn collection_url(&self) -> &str {
        &self.collection_url
    }

    /// Build the collection query for `filter`
    ///
    /// `$format=json` and `$top` are always present; `$filter` only when at
    /// least one clause exists.
    ///
    /// # Errors
    /// Returns `ConnectorError::InvalidQuery` for a zero limit or a blank
    /// filter value.
    pub fn build(&self, filter: &QueryFilter) -> Result<ODataQuery> {
        if filter.limit == 0 {
            return Err(ConnectorError::InvalidQuery(
                "limit must be a positive integer".to_string(),
            ));
        }

        let mut params = vec![
            ("$format".to_string(), "json".to_string()),
            ("$top".to_string(), filter.limit.to_string()),
        ];
        if let Some(expression) = filter_expression(filter)? {
            params.push(("$filter".to_string(), expression));
        }

        Ok(ODataQuery { path: self.collection_url.clone(), params })
    }

    /// Single-row probe used for health checks.
    pub fn probe(&self) -> ODataQuery {
        ODataQuery {
            path: self.collection_url.clone(),
            params: vec![
                ("$format".to_string(), "json".to_string()),
                ("$top".to_string(), "1".to_string()),
            ],
        }
    }

    /// Path of a single entity: `<collection>('<key>')`.
    ///
    /// # Errors
    /// Returns `ConnectorError::InvalidQuery` for a blank key.
    pub fn entity_path(&self, key: &str) -> Result<String> {
        if key.trim().is_empty() {
            return Err(ConnectorError::InvalidQuery("entity key cannot be empty".to_string()));
        }
        Ok(format!("{}({})", self.collection_url, literal(key)))
    }
}

/// `$filter` expression for `filter`, or `None` when unrestricted.
///
/// Clauses are joined with `and` in the order company, material, plant,
/// period-from, period-to.
///
/// # Errors
/// Returns `ConnectorError::InvalidQuery` for a blank value.
pub fn filter_expression(filter: &QueryFilter) -> Result<Option<String>> {
    let mut clauses = Vec::new();

    for (field, values) in [
        (fields::COMPANY_CODE, &filter.company_codes),
        (fields::MATERIAL_NUMBER, &filter.materials),
        (fields::PLANT, &filter.plants),
    ] {
        if let Some(clause) = any_of(field, values)? {
            clauses.push(clause);
        }
    }

    if let Some(from) = &filter.period_from {
        clauses.push(comparison(fields::PERIOD, "ge", from)?);
    }
    if let Some(to) = &filter.period_to {
        clauses.push(comparison(fields::PERIOD, "le", to)?);
    }

    Ok((!clauses.is_empty()).then(|| clauses.join(" and ")))
}

/// `(Field eq 'a' or Field eq 'b')`
fn any_of(field: &str, values: &[String]) -> Result<Option<String>> {
    if values.is_empty() {
        return Ok(None);
    }
    let terms = values
        .iter()
        .map(|value| comparison(field, "eq", value))
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(format!("({})", terms.join(" or "))))
}

fn comparison(field: &str, op: &str, value: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(ConnectorError::InvalidQuery(format!("{field} filter value cannot be empty")));
    }
    Ok(format!("{field} {op} {}", literal(value)))
}

/// OData string literal: single-quoted, embedded quotes doubled.
fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
