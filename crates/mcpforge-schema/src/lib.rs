// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! Minimal JSON-Schema-subset validator (spec §4.3).
//!
//! Supports `type`, `enum`, `properties`, `required`, `items`, `minItems`,
//! `maxItems`, and `additionalProperties: false`. Deliberately does not
//! pull in a general-purpose JSON-Schema crate (see DESIGN.md) — the
//! dispatcher only ever needs this subset, and a hand-rolled recursive
//! walk keeps failure messages path-qualified exactly as spec requires.

use serde_json::Value;

/// A schema validation failure, always anchored to the first violating
/// field encountered during a depth-first walk (spec §4.3: "fail fast...
/// always include the path of the first violating field").
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {reason}")]
pub struct SchemaViolation {
    /// JSONPath-ish locator, e.g. `$.textures[0].width`.
    pub path: String,
    /// Human-readable reason.
    pub reason: String,
}

/// Validate `instance` against `schema`. Returns the first violation found,
/// depth-first, or `Ok(())` if the instance satisfies every constraint in
/// the supported dialect.
pub fn validate(schema: &Value, instance: &Value) -> Result<(), SchemaViolation> {
    walk(schema, instance, "$")
}

fn walk(schema: &Value, instance: &Value, path: &str) -> Result<(), SchemaViolation> {
    let Some(schema_obj) = schema.as_object() else {
        // A schema that isn't an object imposes no constraints.
        return Ok(());
    };

    if let Some(ty) = schema_obj.get("type") {
        check_type(ty, instance, path)?;
    }

    if let Some(allowed) = schema_obj.get("enum").and_then(Value::as_array) {
        if !allowed.contains(instance) {
            return Err(violation(path, format!("value is not one of the allowed enum values {allowed:?}")));
        }
    }

    if let Value::Number(n) = instance {
        let finite = n.as_f64().map(f64::is_finite).unwrap_or(false);
        if !finite {
            return Err(violation(path, "number must be finite (NaN/Infinity are not allowed)"));
        }
    }

    if let Some(props) = schema_obj.get("properties").and_then(Value::as_object) {
        let instance_obj = instance.as_object();
        for (key, sub_schema) in props {
            if let Some(obj) = instance_obj {
                if let Some(value) = obj.get(key) {
                    let sub_path = format!("{path}.{key}");
                    walk(sub_schema, value, &sub_path)?;
                }
            }
        }
    }

    if let Some(required) = schema_obj.get("required").and_then(Value::as_array) {
        let instance_obj = instance.as_object();
        for req in required {
            let Some(name) = req.as_str() else { continue };
            let present = instance_obj.is_some_and(|o| o.contains_key(name));
            if !present {
                return Err(violation(
                    &format!("{path}.{name}"),
                    "required property is missing",
                ));
            }
        }
    }

    if schema_obj.get("additionalProperties") == Some(&Value::Bool(false)) {
        if let (Some(props), Some(instance_obj)) = (
            schema_obj.get("properties").and_then(Value::as_object),
            instance.as_object(),
        ) {
            for key in instance_obj.keys() {
                if !props.contains_key(key) {
                    return Err(violation(
                        &format!("{path}.{key}"),
                        "additional property not allowed by schema",
                    ));
                }
            }
        }
    }

    if let Some(items_schema) = schema_obj.get("items") {
        if let Some(arr) = instance.as_array() {
            for (i, item) in arr.iter().enumerate() {
                let sub_path = format!("{path}[{i}]");
                walk(items_schema, item, &sub_path)?;
            }
        }
    }

    if let Some(arr) = instance.as_array() {
        if let Some(min) = schema_obj.get("minItems").and_then(Value::as_u64) {
            if (arr.len() as u64) < min {
                return Err(violation(path, format!("array has fewer than minItems={min} items")));
            }
        }
        if let Some(max) = schema_obj.get("maxItems").and_then(Value::as_u64) {
            if (arr.len() as u64) > max {
                return Err(violation(path, format!("array has more than maxItems={max} items")));
            }
        }
    }

    Ok(())
}

fn check_type(ty: &Value, instance: &Value, path: &str) -> Result<(), SchemaViolation> {
    let Some(expected) = ty.as_str() else {
        return Ok(());
    };
    let matches = match expected {
        "object" => instance.is_object(),
        "array" => instance.is_array(),
        "string" => instance.is_string(),
        "number" => instance.is_number(),
        "boolean" => instance.is_boolean(),
        "null" => instance.is_null(),
        _ => true,
    };
    if matches {
        Ok(())
    } else {
        Err(violation(path, format!("expected type '{expected}', got {}", kind_name(instance))))
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn violation(path: &str, reason: impl Into<String>) -> SchemaViolation {
    SchemaViolation {
        path: path.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_mismatch_reports_path() {
        let schema = json!({"type": "object", "properties": {"width": {"type": "number"}}});
        let instance = json!({"width": "16"});
        let err = validate(&schema, &instance).unwrap_err();
        assert_eq!(err.path, "$.width");
    }

    #[test]
    fn nested_array_index_in_path() {
        let schema = json!({
            "type": "object",
            "properties": {
                "textures": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {"width": {"type": "number"}}
                    }
                }
            }
        });
        let instance = json!({"textures": [{"width": 16}, {"width": "bad"}]});
        let err = validate(&schema, &instance).unwrap_err();
        assert_eq!(err.path, "$.textures[1].width");
    }

    #[test]
    fn missing_required_field() {
        let schema = json!({"type": "object", "required": ["name"]});
        let instance = json!({});
        let err = validate(&schema, &instance).unwrap_err();
        assert_eq!(err.path, "$.name");
    }

    #[test]
    fn additional_properties_false_rejects_extras() {
        let schema = json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "additionalProperties": false
        });
        let instance = json!({"a": "x", "b": "y"});
        let err = validate(&schema, &instance).unwrap_err();
        assert_eq!(err.path, "$.b");
    }

    #[test]
    fn min_max_items_enforced() {
        let schema = json!({"type": "array", "minItems": 1, "maxItems": 2});
        assert!(validate(&schema, &json!([])).is_err());
        assert!(validate(&schema, &json!([1])).is_ok());
        assert!(validate(&schema, &json!([1, 2, 3])).is_err());
    }

    #[test]
    fn enum_constraint_enforced() {
        let schema = json!({"enum": ["a", "b"]});
        assert!(validate(&schema, &json!("a")).is_ok());
        assert!(validate(&schema, &json!("z")).is_err());
    }

    #[test]
    fn valid_instance_passes() {
        let schema = json!({
            "type": "object",
            "required": ["name"],
            "properties": {"name": {"type": "string"}, "count": {"type": "number"}}
        });
        let instance = json!({"name": "cube", "count": 3});
        assert!(validate(&schema, &instance).is_ok());
    }
}
