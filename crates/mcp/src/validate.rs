//! Argument validation against a tool's advertised JSON schema.
//!
//! Mismatches are rejected before the remote call is made, so a backend
//! never fails ambiguously on malformed arguments. Only the checks that the
//! schemas in the wild actually express are enforced: the arguments must be
//! an object, required properties must be present, and declared primitive
//! types must match.

use ferrochat_core::error::ToolError;
use serde_json::Value;

/// Validate `arguments` against `schema`. A schema that is not an object
/// schema (absent, empty, or unconstrained) accepts anything.
pub fn validate_arguments(schema: &Value, arguments: &Value) -> Result<(), ToolError> {
    let Some(schema_obj) = schema.as_object() else {
        return Ok(());
    };
    if schema_obj.get("type").and_then(|t| t.as_str()) != Some("object") {
        return Ok(());
    }

    let args_obj = arguments
        .as_object()
        .ok_or_else(|| ToolError::InvalidArguments("arguments must be a JSON object".into()))?;

    if let Some(required) = schema_obj.get("required").and_then(|r| r.as_array()) {
        for name in required.iter().filter_map(|r| r.as_str()) {
            if !args_obj.contains_key(name) {
                return Err(ToolError::InvalidArguments(format!(
                    "missing required property '{name}'"
                )));
            }
        }
    }

    if let Some(properties) = schema_obj.get("properties").and_then(|p| p.as_object()) {
        for (name, value) in args_obj {
            let Some(prop) = properties.get(name) else {
                continue; // unknown extras pass through to the server
            };
            let Some(expected) = prop.get("type").and_then(|t| t.as_str()) else {
                continue;
            };
            if !type_matches(expected, value) {
                return Err(ToolError::InvalidArguments(format!(
                    "property '{name}' expected type '{expected}'"
                )));
            }
        }
    }

    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "top_k": { "type": "integer" },
                "verbose": { "type": "boolean" }
            },
            "required": ["query"]
        })
    }

    #[test]
    fn accepts_valid_arguments() {
        let args = json!({"query": "build module", "top_k": 5});
        assert!(validate_arguments(&schema(), &args).is_ok());
    }

    #[test]
    fn rejects_missing_required() {
        let args = json!({"top_k": 5});
        let err = validate_arguments(&schema(), &args).unwrap_err();
        assert!(err.to_string().contains("query"));
    }

    #[test]
    fn rejects_wrong_type() {
        let args = json!({"query": 42});
        let err = validate_arguments(&schema(), &args).unwrap_err();
        assert!(err.to_string().contains("string"));
    }

    #[test]
    fn rejects_non_object_arguments() {
        let args = json!(["positional"]);
        assert!(validate_arguments(&schema(), &args).is_err());
    }

    #[test]
    fn unknown_extras_pass_through() {
        let args = json!({"query": "x", "extra": {"anything": true}});
        assert!(validate_arguments(&schema(), &args).is_ok());
    }

    #[test]
    fn unconstrained_schema_accepts_anything() {
        assert!(validate_arguments(&json!({}), &json!({"a": 1})).is_ok());
        assert!(validate_arguments(&Value::Null, &json!("text")).is_ok());
    }
}
