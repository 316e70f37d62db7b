//! Schema descriptors and structural validation
//!
//! A [`SchemaDescriptor`] is the caller-supplied contract for what one chunk's
//! result must look like. It is loaded from JSON, rendered into JSON Schema for
//! backends that constrain decoding, and used to validate every value a
//! generator returns before the value is accepted as a result.

use crate::error::ConfigurationError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::fmt;

/// Declarative description of the expected output shape
///
/// # Examples
///
/// ```
/// use chunkwise_domain::SchemaDescriptor;
/// use serde_json::json;
///
/// let schema = SchemaDescriptor::from_json(r#"{
///     "name": "Summary",
///     "fields": [
///         {"name": "summary", "type": "string"},
///         {"name": "score", "type": "number", "constraints": {"minimum": 0, "maximum": 1}}
///     ]
/// }"#).unwrap();
///
/// assert!(schema.validate(&json!({"summary": "ok", "score": 0.5})).is_ok());
/// assert!(schema.validate(&json!({"summary": "ok", "score": 2.0})).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// Name of the result type (e.g., "LogAnalysis")
    pub name: String,

    /// Optional description forwarded to the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Top-level fields, in declaration order
    pub fields: Vec<FieldDef>,
}

/// One named field of an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name as it appears in the JSON result
    pub name: String,

    /// Value type
    #[serde(flatten)]
    pub ty: FieldType,

    /// Required fields must be present and non-null
    #[serde(default = "default_required")]
    pub required: bool,

    /// Optional description forwarded to the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Value constraints
    #[serde(default, skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,
}

/// Value types a field can hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// Whole number
    Integer,
    /// Any JSON number
    Number,
    /// true / false
    Boolean,
    /// String restricted to a fixed set of values
    Enum {
        /// Allowed values
        values: Vec<String>,
    },
    /// Homogeneous list
    Array {
        /// Element type
        items: Box<FieldType>,

        /// Constraints applied to every element
        #[serde(default, skip_serializing_if = "Constraints::is_empty")]
        item_constraints: Constraints,
    },
    /// Object with arbitrary string keys and uniformly typed values
    Map {
        /// Value type
        values: Box<FieldType>,
    },
    /// Nested object
    Object {
        /// Nested fields, in declaration order
        fields: Vec<FieldDef>,
    },
}

/// Optional bounds on a field's value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Inclusive lower bound for numbers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    /// Inclusive upper bound for numbers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    /// Minimum string length in characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    /// Maximum string length in characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    /// Minimum array length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,

    /// Maximum array length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,

    /// Regular expression a string must match somewhere (anchor with `^...$`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl Constraints {
    /// True when no bound is set
    pub fn is_empty(&self) -> bool {
        *self == Constraints::default()
    }
}

fn default_required() -> bool {
    true
}

/// A single way in which a value failed to match the schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON path of the offending value (e.g., `$.events[0].severity`)
    pub path: String,

    /// What was wrong
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl SchemaDescriptor {
    /// Parse a descriptor from JSON and check that it is well formed
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let schema: SchemaDescriptor = serde_json::from_str(json)
            .map_err(|e| ConfigurationError::InvalidSchema(e.to_string()))?;
        schema.check()?;
        Ok(schema)
    }

    /// Check the descriptor itself: names present and unique, bounds ordered
    pub fn check(&self) -> Result<(), ConfigurationError> {
        if self.name.trim().is_empty() {
            return Err(ConfigurationError::InvalidSchema("schema name is empty".to_string()));
        }
        if self.fields.is_empty() {
            return Err(ConfigurationError::InvalidSchema(format!(
                "schema '{}' declares no fields",
                self.name
            )));
        }
        check_fields(&self.name, &self.fields)
    }

    /// Top-level field names, in declaration order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Validate a value against this schema
    ///
    /// Returns every violation found, not just the first. Fields not declared
    /// in the schema are ignored.
    pub fn validate(&self, value: &Value) -> Result<(), Vec<Violation>> {
        let mut violations = Vec::new();
        validate_object(&self.fields, value, "$", &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Render as a JSON Schema object, preserving field order
    pub fn to_json_schema(&self) -> Value {
        let mut schema = object_schema(&self.fields);
        if let Value::Object(map) = &mut schema {
            map.insert("title".to_string(), Value::String(self.name.clone()));
            if let Some(description) = &self.description {
                map.insert("description".to_string(), Value::String(description.clone()));
            }
        }
        schema
    }
}

fn check_fields(owner: &str, fields: &[FieldDef]) -> Result<(), ConfigurationError> {
    let mut seen = HashSet::new();
    for field in fields {
        if field.name.trim().is_empty() {
            return Err(ConfigurationError::InvalidSchema(format!(
                "'{}' has a field with an empty name",
                owner
            )));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(ConfigurationError::InvalidSchema(format!(
                "'{}' declares field '{}' twice",
                owner, field.name
            )));
        }
        let path = format!("{}.{}", owner, field.name);
        check_constraints(&path, &field.constraints)?;
        check_type(&path, &field.ty)?;
    }
    Ok(())
}

fn check_type(path: &str, ty: &FieldType) -> Result<(), ConfigurationError> {
    match ty {
        FieldType::Enum { values } if values.is_empty() => Err(ConfigurationError::InvalidSchema(
            format!("enum '{}' has no values", path),
        )),
        FieldType::Array { items, item_constraints } => {
            let item_path = format!("{}[]", path);
            check_constraints(&item_path, item_constraints)?;
            check_type(&item_path, items)
        }
        FieldType::Map { values } => check_type(&format!("{}{{}}", path), values),
        FieldType::Object { fields } => check_fields(path, fields),
        _ => Ok(()),
    }
}

fn check_constraints(path: &str, c: &Constraints) -> Result<(), ConfigurationError> {
    let inverted = matches!((c.minimum, c.maximum), (Some(lo), Some(hi)) if lo > hi)
        || matches!((c.min_length, c.max_length), (Some(lo), Some(hi)) if lo > hi)
        || matches!((c.min_items, c.max_items), (Some(lo), Some(hi)) if lo > hi);
    if inverted {
        return Err(ConfigurationError::InvalidSchema(format!(
            "'{}' has a lower bound above its upper bound",
            path
        )));
    }
    if let Some(pattern) = &c.pattern {
        Regex::new(pattern).map_err(|e| {
            ConfigurationError::InvalidSchema(format!("'{}' has an invalid pattern: {}", path, e))
        })?;
    }
    Ok(())
}

fn validate_object(fields: &[FieldDef], value: &Value, path: &str, out: &mut Vec<Violation>) {
    let Some(obj) = value.as_object() else {
        out.push(violation(path, format!("expected object, got {}", type_name(value))));
        return;
    };

    for field in fields {
        let field_path = format!("{}.{}", path, field.name);
        match obj.get(&field.name) {
            None | Some(Value::Null) => {
                if field.required {
                    out.push(violation(&field_path, "missing required field".to_string()));
                }
            }
            Some(v) => validate_value(&field.ty, &field.constraints, v, &field_path, out),
        }
    }
}

fn validate_value(
    ty: &FieldType,
    constraints: &Constraints,
    value: &Value,
    path: &str,
    out: &mut Vec<Violation>,
) {
    match ty {
        FieldType::String => match value.as_str() {
            Some(s) => {
                check_length(s, constraints, path, out);
                check_pattern(s, constraints, path, out);
            }
            None => out.push(mismatch(path, "string", value)),
        },
        FieldType::Integer => {
            if value.is_i64() || value.is_u64() {
                check_range(value, constraints, path, out);
            } else {
                out.push(mismatch(path, "integer", value));
            }
        }
        FieldType::Number => {
            if value.is_number() {
                check_range(value, constraints, path, out);
            } else {
                out.push(mismatch(path, "number", value));
            }
        }
        FieldType::Boolean => {
            if !value.is_boolean() {
                out.push(mismatch(path, "boolean", value));
            }
        }
        FieldType::Enum { values } => match value.as_str() {
            Some(s) if values.iter().any(|v| v == s) => {}
            Some(s) => out.push(violation(
                path,
                format!("expected one of [{}], got \"{}\"", values.join(", "), s),
            )),
            None => out.push(mismatch(path, "string", value)),
        },
        FieldType::Array { items, item_constraints } => match value.as_array() {
            Some(elements) => {
                if let Some(min) = constraints.min_items {
                    if elements.len() < min {
                        out.push(violation(path, format!("expected at least {} items, got {}", min, elements.len())));
                    }
                }
                if let Some(max) = constraints.max_items {
                    if elements.len() > max {
                        out.push(violation(path, format!("expected at most {} items, got {}", max, elements.len())));
                    }
                }
                for (i, element) in elements.iter().enumerate() {
                    validate_value(items, item_constraints, element, &format!("{}[{}]", path, i), out);
                }
            }
            None => out.push(mismatch(path, "array", value)),
        },
        FieldType::Map { values } => match value.as_object() {
            Some(entries) => {
                let none = Constraints::default();
                for (key, entry) in entries {
                    validate_value(values, &none, entry, &format!("{}.{}", path, key), out);
                }
            }
            None => out.push(mismatch(path, "object", value)),
        },
        FieldType::Object { fields } => validate_object(fields, value, path, out),
    }
}

fn check_length(s: &str, c: &Constraints, path: &str, out: &mut Vec<Violation>) {
    let len = s.chars().count();
    if let Some(min) = c.min_length {
        if len < min {
            out.push(violation(path, format!("expected at least {} characters, got {}", min, len)));
        }
    }
    if let Some(max) = c.max_length {
        if len > max {
            out.push(violation(path, format!("expected at most {} characters, got {}", max, len)));
        }
    }
}

fn check_pattern(s: &str, c: &Constraints, path: &str, out: &mut Vec<Violation>) {
    let Some(pattern) = &c.pattern else { return };
    match Regex::new(pattern) {
        Ok(re) if re.is_match(s) => {}
        Ok(_) => out.push(violation(path, format!("\"{}\" does not match pattern '{}'", s, pattern))),
        Err(e) => out.push(violation(path, format!("invalid pattern '{}': {}", pattern, e))),
    }
}

fn check_range(value: &Value, c: &Constraints, path: &str, out: &mut Vec<Violation>) {
    let Some(n) = value.as_f64() else { return };
    if let Some(min) = c.minimum {
        if n < min {
            out.push(violation(path, format!("{} is below minimum {}", n, min)));
        }
    }
    if let Some(max) = c.maximum {
        if n > max {
            out.push(violation(path, format!("{} is above maximum {}", n, max)));
        }
    }
}

fn violation(path: &str, message: String) -> Violation {
    Violation {
        path: path.to_string(),
        message,
    }
}

fn mismatch(path: &str, expected: &str, got: &Value) -> Violation {
    violation(path, format!("expected {}, got {}", expected, type_name(got)))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn object_schema(fields: &[FieldDef]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in fields {
        let mut prop = type_schema(&field.ty);
        if let Value::Object(map) = &mut prop {
            if let Some(description) = &field.description {
                map.insert("description".to_string(), Value::String(description.clone()));
            }
            apply_constraints(map, &field.constraints);
        }
        properties.insert(field.name.clone(), prop);
        if field.required {
            required.push(Value::String(field.name.clone()));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn type_schema(ty: &FieldType) -> Value {
    match ty {
        FieldType::String => json!({"type": "string"}),
        FieldType::Integer => json!({"type": "integer"}),
        FieldType::Number => json!({"type": "number"}),
        FieldType::Boolean => json!({"type": "boolean"}),
        FieldType::Enum { values } => json!({"type": "string", "enum": values}),
        FieldType::Array { items, item_constraints } => {
            let mut item = type_schema(items);
            if let Value::Object(map) = &mut item {
                apply_constraints(map, item_constraints);
            }
            json!({"type": "array", "items": item})
        }
        FieldType::Map { values } => json!({"type": "object", "additionalProperties": type_schema(values)}),
        FieldType::Object { fields } => object_schema(fields),
    }
}

fn apply_constraints(map: &mut Map<String, Value>, c: &Constraints) {
    if let Some(v) = c.minimum {
        map.insert("minimum".to_string(), json!(v));
    }
    if let Some(v) = c.maximum {
        map.insert("maximum".to_string(), json!(v));
    }
    if let Some(v) = c.min_length {
        map.insert("minLength".to_string(), json!(v));
    }
    if let Some(v) = c.max_length {
        map.insert("maxLength".to_string(), json!(v));
    }
    if let Some(v) = c.min_items {
        map.insert("minItems".to_string(), json!(v));
    }
    if let Some(v) = c.max_items {
        map.insert("maxItems".to_string(), json!(v));
    }
    if let Some(v) = &c.pattern {
        map.insert("pattern".to_string(), json!(v));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_schema() -> SchemaDescriptor {
        SchemaDescriptor::from_json(
            r#"{
                "name": "LogAnalysis",
                "fields": [
                    {"name": "summary", "type": "string", "constraints": {"min_length": 1}},
                    {"name": "observations", "type": "array", "items": {"type": "string"}},
                    {"name": "events", "type": "array", "items": {
                        "type": "object",
                        "fields": [
                            {"name": "severity", "type": "enum", "values": ["CRITICAL", "HIGH", "LOW"]},
                            {"name": "confidence_score", "type": "number",
                             "constraints": {"minimum": 0.0, "maximum": 1.0}}
                        ]
                    }},
                    {"name": "highest_severity", "type": "string", "required": false}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_value_passes() {
        let value = json!({
            "summary": "Two failed logins",
            "observations": ["repeated 401s"],
            "events": [{"severity": "HIGH", "confidence_score": 0.8}]
        });
        assert!(log_schema().validate(&value).is_ok());
    }

    #[test]
    fn test_optional_field_may_be_null() {
        let value = json!({
            "summary": "quiet",
            "observations": [],
            "events": [],
            "highest_severity": null
        });
        assert!(log_schema().validate(&value).is_ok());
    }

    #[test]
    fn test_missing_required_field() {
        let value = json!({"observations": [], "events": []});
        let violations = log_schema().validate(&value).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "$.summary");
    }

    #[test]
    fn test_nested_violations_report_paths() {
        let value = json!({
            "summary": "x",
            "observations": ["ok", 3],
            "events": [{"severity": "SEVERE", "confidence_score": 1.5}]
        });
        let violations = log_schema().validate(&value).unwrap_err();
        let paths: Vec<_> = violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "$.observations[1]",
                "$.events[0].severity",
                "$.events[0].confidence_score"
            ]
        );
    }

    #[test]
    fn test_root_must_be_object() {
        let violations = log_schema().validate(&json!([1, 2])).unwrap_err();
        assert_eq!(violations[0].message, "expected object, got array");
    }

    #[test]
    fn test_integer_rejects_fraction() {
        let schema = SchemaDescriptor::from_json(
            r#"{"name": "Row", "fields": [{"name": "year", "type": "integer"}]}"#,
        )
        .unwrap();
        assert!(schema.validate(&json!({"year": 2024})).is_ok());
        assert!(schema.validate(&json!({"year": 2024.5})).is_err());
    }

    #[test]
    fn test_string_length_counts_chars() {
        let schema = SchemaDescriptor::from_json(
            r#"{"name": "T", "fields": [{"name": "s", "type": "string", "constraints": {"max_length": 3}}]}"#,
        )
        .unwrap();
        assert!(schema.validate(&json!({"s": "äöü"})).is_ok());
        assert!(schema.validate(&json!({"s": "äöüx"})).is_err());
    }

    #[test]
    fn test_array_item_bounds() {
        let schema = SchemaDescriptor::from_json(
            r#"{"name": "T", "fields": [{"name": "rows", "type": "array",
                "items": {"type": "integer"}, "constraints": {"max_items": 2}}]}"#,
        )
        .unwrap();
        assert!(schema.validate(&json!({"rows": [1, 2]})).is_ok());
        assert!(schema.validate(&json!({"rows": [1, 2, 3]})).is_err());
    }

    #[test]
    fn test_pattern_checked_locally() {
        let schema = SchemaDescriptor::from_json(
            r#"{"name": "T", "fields": [{"name": "log_id", "type": "string",
                "constraints": {"pattern": "^LOGID-[A-Z]+$"}}]}"#,
        )
        .unwrap();
        assert!(schema.validate(&json!({"log_id": "LOGID-AB"})).is_ok());

        let violations = schema.validate(&json!({"log_id": "not a log id"})).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "$.log_id");
        assert!(violations[0].message.contains("does not match pattern"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let result = SchemaDescriptor::from_json(
            r#"{"name": "T", "fields": [{"name": "s", "type": "string",
                "constraints": {"pattern": "([A-Z"}}]}"#,
        );
        match result {
            Err(ConfigurationError::InvalidSchema(msg)) => assert!(msg.contains("T.s")),
            other => panic!("expected InvalidSchema, got {:?}", other),
        }
    }

    #[test]
    fn test_item_constraints_apply_to_each_element() {
        let schema = SchemaDescriptor::from_json(
            r#"{"name": "T", "fields": [{"name": "source_ips", "type": "array",
                "items": {"type": "string"},
                "item_constraints": {"pattern": "^\\d{1,3}\\.\\d{1,3}\\.\\d{1,3}\\.\\d{1,3}$"}}]}"#,
        )
        .unwrap();
        assert!(schema.validate(&json!({"source_ips": ["10.0.0.1", "192.168.1.20"]})).is_ok());

        let violations = schema
            .validate(&json!({"source_ips": ["10.0.0.1", "localhost"]}))
            .unwrap_err();
        assert_eq!(violations[0].path, "$.source_ips[1]");

        let rendered = schema.to_json_schema();
        assert_eq!(
            rendered["properties"]["source_ips"]["items"]["pattern"],
            r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$"
        );
    }

    #[test]
    fn test_invalid_item_pattern_rejected() {
        let result = SchemaDescriptor::from_json(
            r#"{"name": "T", "fields": [{"name": "ids", "type": "array",
                "items": {"type": "string"}, "item_constraints": {"pattern": "*"}}]}"#,
        );
        assert!(matches!(result, Err(ConfigurationError::InvalidSchema(_))));
    }

    #[test]
    fn test_map_values_validated() {
        let schema = SchemaDescriptor::from_json(
            r#"{"name": "T", "fields": [{"name": "response_codes", "type": "map",
                "values": {"type": "integer"}}]}"#,
        )
        .unwrap();
        assert!(schema.validate(&json!({"response_codes": {"200": 14, "404": 2}})).is_ok());

        let violations = schema
            .validate(&json!({"response_codes": {"200": 14, "500": "many"}}))
            .unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "$.response_codes.500");

        assert!(schema.validate(&json!({"response_codes": [200]})).is_err());

        let rendered = schema.to_json_schema();
        assert_eq!(
            rendered["properties"]["response_codes"],
            json!({"type": "object", "additionalProperties": {"type": "integer"}})
        );
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = SchemaDescriptor::from_json(
            r#"{"name": "T", "fields": [{"name": "a", "type": "string"}, {"name": "a", "type": "number"}]}"#,
        );
        assert!(matches!(result, Err(ConfigurationError::InvalidSchema(_))));
    }

    #[test]
    fn test_empty_enum_rejected() {
        let result = SchemaDescriptor::from_json(
            r#"{"name": "T", "fields": [{"name": "level", "type": "enum", "values": []}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let result = SchemaDescriptor::from_json(
            r#"{"name": "T", "fields": [{"name": "n", "type": "number",
                "constraints": {"minimum": 5, "maximum": 1}}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_json_schema_keeps_field_order_and_required() {
        let schema = log_schema().to_json_schema();
        assert_eq!(schema["title"], "LogAnalysis");
        let names: Vec<_> = schema["properties"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(names, vec!["summary", "observations", "events", "highest_severity"]);
        assert_eq!(schema["required"], json!(["summary", "observations", "events"]));
        assert_eq!(schema["properties"]["summary"]["minLength"], 1);
        assert_eq!(
            schema["properties"]["events"]["items"]["properties"]["severity"]["enum"],
            json!(["CRITICAL", "HIGH", "LOW"])
        );
    }

    #[test]
    fn test_descriptor_serde_round_trip() {
        let schema = log_schema();
        let json = serde_json::to_string(&schema).unwrap();
        let back = SchemaDescriptor::from_json(&json).unwrap();
        assert_eq!(back, schema);
    }
}
