use serde_json::Value;

use crate::client::SourceError;

/// Unwrap the policy API response envelope into raw policy documents.
///
/// The API wraps results as `{"output": [{"data": [...]}]}`. Some handler
/// versions return `data` as a single object, and some omit the `data`
/// wrapper entirely; both are tolerated.
pub fn parse_policy_envelope(payload: &Value) -> Result<Vec<Value>, SourceError> {
    let output = payload
        .get("output")
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::UnexpectedPayload("missing `output` array".to_string()))?;

    let first = output
        .first()
        .ok_or_else(|| SourceError::UnexpectedPayload("`output` array is empty".to_string()))?;

    match first.get("data") {
        Some(Value::Array(documents)) => Ok(documents.clone()),
        Some(document @ Value::Object(_)) => Ok(vec![document.clone()]),
        Some(other) => Err(SourceError::UnexpectedPayload(format!(
            "`data` field has unexpected type: {}",
            json_type_name(other)
        ))),
        None => Ok(vec![first.clone()]),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::client::SourceError;

    use super::parse_policy_envelope;

    #[test]
    fn unwraps_data_array() {
        let payload = json!({
            "output": [{"data": [{"id": "P-1"}, {"id": "P-2"}]}]
        });

        let documents = parse_policy_envelope(&payload).expect("parse");
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0]["id"], "P-1");
    }

    #[test]
    fn accepts_single_object_data() {
        let payload = json!({"output": [{"data": {"id": "P-1"}}]});

        let documents = parse_policy_envelope(&payload).expect("parse");
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0]["id"], "P-1");
    }

    #[test]
    fn falls_back_to_bare_output_item() {
        let payload = json!({"output": [{"id": "P-1", "tiv": 1_000_000}]});

        let documents = parse_policy_envelope(&payload).expect("parse");
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0]["tiv"], 1_000_000);
    }

    #[test]
    fn rejects_missing_output() {
        let error = parse_policy_envelope(&json!({"items": []}))
            .expect_err("missing output should fail");
        assert!(matches!(error, SourceError::UnexpectedPayload(ref message)
            if message.contains("output")));
    }

    #[test]
    fn rejects_empty_output() {
        let error =
            parse_policy_envelope(&json!({"output": []})).expect_err("empty output should fail");
        assert!(matches!(error, SourceError::UnexpectedPayload(ref message)
            if message.contains("empty")));
    }

    #[test]
    fn rejects_scalar_data_field() {
        let error = parse_policy_envelope(&json!({"output": [{"data": 42}]}))
            .expect_err("scalar data should fail");
        assert!(matches!(error, SourceError::UnexpectedPayload(ref message)
            if message.contains("number")));
    }
}
