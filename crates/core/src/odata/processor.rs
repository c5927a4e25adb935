//! Raw entity to [`PupRecord`] normalization
//!
//! Missing, null or unparseable fields fall back to zero or an empty string.
//! A malformed entity never aborts the batch.

use pricelink_domain::PupRecord;
use serde_json::Value;
use tracing::warn;

use super::fields;

/// Normalize raw entities into domain records.
///
/// Non-object entries are skipped.
pub fn normalize(raw_records: &[Value]) -> Vec<PupRecord> {
    raw_records
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            let record = normalize_record(raw);
            if record.is_none() {
                warn!(index, "Skipping non-object entity in response");
            }
            record
        })
        .collect()
}

/// Normalize one raw entity. `None` if it is not a JSON object.
pub fn normalize_record(raw: &Value) -> Option<PupRecord> {
    static NULL: Value = Value::Null;

    let entity = raw.as_object()?;
    let field = |name: &str| entity.get(name).unwrap_or(&NULL);

    Some(PupRecord {
        company_code: coerce_string(field(fields::COMPANY_CODE)),
        material: coerce_string(field(fields::MATERIAL_NUMBER)),
        current_pup: coerce_f64(field(fields::PUP_VALUE)),
        standard_price: coerce_f64(field(fields::STANDARD_PRICE)),
        quantity: coerce_i64(field(fields::QUANTITY)),
        plant: coerce_string(field(fields::PLANT)),
        period: coerce_string(field(fields::PERIOD)),
    })
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

// OData v2 serializes Edm.Decimal as a string
fn coerce_f64(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Integers accept float input by truncation toward zero.
#[allow(clippy::cast_possible_truncation)]
fn coerce_i64(value: &Value) -> i64 {
    match value {
        Value::Number(n) => {
            n.as_i64().or_else(|| n.as_f64().filter(|v| v.is_finite()).map(|v| v as i64))
        }
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v as i64))
        }
        _ => None,
    }
    .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn maps_protocol_fields_to_domain_fields() {
        let raw = json!({
            "CompanyCode": "1000",
            "MaterialNumber": "MAT-42",
            "PUPValue": 12.75,
            "StandardPrice": "10.50",
            "Quantity": 8,
            "Plant": "P01",
            "Period": "2024-05",
            "__metadata": {"type": "ACM_APPLWC.PUPOptimization"}
        });

        let record = normalize_record(&raw).unwrap();
        assert_eq!(record, PupRecord {
            company_code: "1000".into(),
            material: "MAT-42".into(),
            current_pup: 12.75,
            standard_price: 10.5,
            quantity: 8,
            plant: "P01".into(),
            period: "2024-05".into(),
        });
    }

    #[test]
    fn missing_quantity_defaults_to_zero() {
        let record = normalize_record(&json!({"CompanyCode": "1000", "PUPValue": 1.5})).unwrap();
        assert_eq!(record.quantity, 0);
        assert_eq!(record.material, "");
        assert!((record.current_pup - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn unparseable_and_null_fields_default() {
        let record = normalize_record(&json!({
            "PUPValue": "n/a",
            "Quantity": null,
            "StandardPrice": "NaN",
            "Plant": null
        }))
        .unwrap();
        assert_eq!(record.current_pup, 0.0);
        assert_eq!(record.standard_price, 0.0);
        assert_eq!(record.quantity, 0);
        assert_eq!(record.plant, "");
    }

    #[test]
    fn numeric_strings_and_floats_coerce_to_int() {
        assert_eq!(normalize_record(&json!({"Quantity": "17"})).unwrap().quantity, 17);
        assert_eq!(normalize_record(&json!({"Quantity": "17.9"})).unwrap().quantity, 17);
        assert_eq!(normalize_record(&json!({"Quantity": 3.2})).unwrap().quantity, 3);
        assert_eq!(normalize_record(&json!({"CompanyCode": 1000})).unwrap().company_code, "1000");
    }

    #[test]
    fn malformed_entries_do_not_abort_the_batch() {
        let raw = vec![
            json!({"MaterialNumber": "A"}),
            json!("not an entity"),
            json!(null),
            json!({"MaterialNumber": "B"}),
        ];
        let records = normalize(&raw);
        let materials: Vec<_> = records.iter().map(|r| r.material.as_str()).collect();
        assert_eq!(materials, vec!["A", "B"]);
    }
}
