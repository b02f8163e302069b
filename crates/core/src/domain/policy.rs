use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyId(pub String);

/// One insurance policy as the rule engine sees it. Every field has a
/// defined default, so a record can always be built from a partial document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub id: PolicyId,
    pub tiv: Decimal,
    pub total_premium: Decimal,
    pub line_of_business: String,
    pub construction_type: String,
    pub primary_risk_state: String,
    pub oldest_building: i32,
    pub winnability: i64,
    pub renewal_or_new_business: String,
    pub loss_value: Decimal,
}

/// A field that was present in a raw document but could not be coerced into
/// its expected shape. Normalization still applies the default; callers that
/// need stricter guarantees surface these through `validate_document`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: &'static str,
    pub raw: String,
}

impl PolicyRecord {
    /// Normalize a raw policy document into a record. Never fails: missing
    /// or unusable numerics become zero, missing strings become empty, and a
    /// missing `oldest_building` becomes `reference_year` so an unknown
    /// construction date reads as new.
    pub fn from_document(fallback_id: &str, document: &Value, reference_year: i32) -> Self {
        let id = match document.get("id") {
            Some(Value::String(raw)) if !raw.trim().is_empty() => raw.trim().to_string(),
            Some(Value::Number(number)) => number.to_string(),
            _ => fallback_id.to_string(),
        };

        Self {
            id: PolicyId(id),
            tiv: decimal_field(document, "tiv"),
            total_premium: decimal_field(document, "total_premium"),
            line_of_business: string_field(document, "line_of_business"),
            construction_type: string_field(document, "construction_type"),
            primary_risk_state: string_field(document, "primary_risk_state"),
            oldest_building: int_field(document, "oldest_building")
                .and_then(|year| i32::try_from(year).ok())
                .unwrap_or(reference_year),
            winnability: int_field(document, "winnability").unwrap_or(0),
            renewal_or_new_business: string_field(document, "renewal_or_new_business"),
            loss_value: decimal_field(document, "loss_value"),
        }
    }

    /// Premium-to-TIV ratio in percent. Guarded: a zero (or negative) TIV
    /// yields zero instead of dividing.
    pub fn premium_ratio_pct(&self) -> Decimal {
        if self.tiv > Decimal::ZERO {
            (self.total_premium / self.tiv) * Decimal::from(100)
        } else {
            Decimal::ZERO
        }
    }

    /// Strict companion to `from_document`: reports fields that are present
    /// but malformed, without changing the defaulting behavior.
    pub fn validate_document(document: &Value) -> Result<(), DomainError> {
        let issues = field_issues(document);
        if issues.is_empty() {
            return Ok(());
        }

        let summary = issues
            .iter()
            .map(|issue| format!("{}=`{}`", issue.field, issue.raw))
            .collect::<Vec<_>>()
            .join(", ");
        Err(DomainError::MalformedRecord(summary))
    }
}

pub fn field_issues(document: &Value) -> Vec<FieldIssue> {
    let mut issues = Vec::new();

    for field in ["tiv", "total_premium", "loss_value"] {
        if let Some(value) = document.get(field) {
            match coerce_decimal(value) {
                Some(amount) if amount >= Decimal::ZERO => {}
                _ => issues.push(FieldIssue { field, raw: render_raw(value) }),
            }
        }
    }

    for field in ["oldest_building", "winnability"] {
        if let Some(value) = document.get(field) {
            if coerce_int(value).is_none() {
                issues.push(FieldIssue { field, raw: render_raw(value) });
            }
        }
    }

    if let Some(value) = document.get("winnability") {
        if let Some(score) = coerce_int(value) {
            if !(0..=100).contains(&score) {
                issues.push(FieldIssue { field: "winnability", raw: render_raw(value) });
            }
        }
    }

    issues
}

fn decimal_field(document: &Value, key: &str) -> Decimal {
    document.get(key).and_then(coerce_decimal).unwrap_or_default()
}

fn int_field(document: &Value, key: &str) -> Option<i64> {
    document.get(key).and_then(coerce_int)
}

fn string_field(document: &Value, key: &str) -> String {
    match document.get(key) {
        Some(Value::String(raw)) => raw.clone(),
        _ => String::new(),
    }
}

fn coerce_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .map(Decimal::from)
            .or_else(|| number.as_u64().map(Decimal::from))
            .or_else(|| number.as_f64().and_then(|float| Decimal::try_from(float).ok())),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => {
            number.as_i64().or_else(|| number.as_f64().map(|float| float.trunc() as i64))
        }
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

fn render_raw(value: &Value) -> String {
    match value {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{field_issues, PolicyRecord};

    #[test]
    fn empty_document_normalizes_to_defaults() {
        let record = PolicyRecord::from_document("policy_0", &json!({}), 2026);

        assert_eq!(record.id.0, "policy_0");
        assert_eq!(record.tiv, Decimal::ZERO);
        assert_eq!(record.total_premium, Decimal::ZERO);
        assert_eq!(record.line_of_business, "");
        assert_eq!(record.oldest_building, 2026);
        assert_eq!(record.winnability, 0);
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let document = json!({
            "id": "P-100",
            "tiv": "60000000",
            "total_premium": "80000.50",
            "oldest_building": "2015",
        });
        let record = PolicyRecord::from_document("fallback", &document, 2026);

        assert_eq!(record.id.0, "P-100");
        assert_eq!(record.tiv, Decimal::from(60_000_000_i64));
        assert_eq!(record.total_premium, Decimal::new(8_000_050, 2));
        assert_eq!(record.oldest_building, 2015);
    }

    #[test]
    fn unparseable_numerics_fall_back_without_raising() {
        let document = json!({"tiv": "not-a-number", "winnability": {"nested": true}});
        let record = PolicyRecord::from_document("policy_1", &document, 2026);

        assert_eq!(record.tiv, Decimal::ZERO);
        assert_eq!(record.winnability, 0);
    }

    #[test]
    fn numeric_id_is_stringified() {
        let record = PolicyRecord::from_document("fallback", &json!({"id": 4417}), 2026);
        assert_eq!(record.id.0, "4417");
    }

    #[test]
    fn premium_ratio_guards_zero_tiv() {
        let record =
            PolicyRecord::from_document("policy_2", &json!({"total_premium": 80000}), 2026);
        assert_eq!(record.premium_ratio_pct(), Decimal::ZERO);
    }

    #[test]
    fn premium_ratio_is_percentage_of_tiv() {
        let record = PolicyRecord::from_document(
            "policy_3",
            &json!({"tiv": 10_000_000, "total_premium": 100_000}),
            2026,
        );
        assert_eq!(record.premium_ratio_pct(), Decimal::from(1));
    }

    #[test]
    fn strict_validation_flags_malformed_fields_that_defaulting_hides() {
        let document = json!({"tiv": "abc", "winnability": 140});

        let issues = field_issues(&document);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].field, "tiv");
        assert_eq!(issues[1].field, "winnability");

        let error = PolicyRecord::validate_document(&document)
            .expect_err("malformed document should fail strict validation");
        assert!(error.to_string().contains("tiv=`abc`"));

        // The defaulting path stays total regardless.
        let record = PolicyRecord::from_document("policy_4", &document, 2026);
        assert_eq!(record.tiv, Decimal::ZERO);
    }

    #[test]
    fn strict_validation_passes_absent_fields() {
        assert!(PolicyRecord::validate_document(&json!({})).is_ok());
    }
}
