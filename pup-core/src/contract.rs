//! Output contracts: the schema a final answer must satisfy to count as
//! Success, and the validation/coercion pipeline that checks it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{PupError, TechnicalError};
use crate::tool::json_type_name;

/// The run engine's sole successful return value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunOutput {
    /// Raw final text, trimmed. Produced when no contract is configured.
    Text(String),
    /// Validated, defaulted structured value matching the contract.
    Structured(Value),
}

/// Type of one contract field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// Closed set of allowed string values.
    Enum(Vec<String>),
    /// Homogeneous array of the given item type.
    Array(Box<FieldType>),
    /// Nested object with its own contract.
    Object(OutputContract),
    /// Union: the value must match at least one listed type. This is the
    /// only sanctioned way a string can satisfy a slot where a number is
    /// also allowed; there is no silent cross-type coercion.
    OneOf(Vec<FieldType>),
}

impl FieldType {
    fn expected(&self) -> String {
        match self {
            Self::String => "string".into(),
            Self::Integer => "integer".into(),
            Self::Number => "number".into(),
            Self::Boolean => "boolean".into(),
            Self::Enum(values) => format!("one of [{}]", values.join(", ")),
            Self::Array(_) => "array".into(),
            Self::Object(_) => "object".into(),
            Self::OneOf(arms) => {
                let names: Vec<String> = arms.iter().map(|a| a.expected()).collect();
                format!("one of: {}", names.join(" | "))
            }
        }
    }

    fn check(&self, value: &mut Value, path: &str) -> Result<(), TechnicalError> {
        let matches = match self {
            Self::String => value.is_string(),
            Self::Integer => value.as_i64().is_some() || value.as_u64().is_some(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Enum(allowed) => match value.as_str() {
                Some(s) => allowed.iter().any(|a| a == s),
                None => false,
            },
            Self::Array(item_type) => match value.as_array_mut() {
                Some(items) => {
                    for (index, item) in items.iter_mut().enumerate() {
                        item_type.check(item, &format!("{path}[{index}]"))?;
                    }
                    true
                }
                None => false,
            },
            Self::Object(contract) => match value.as_object_mut() {
                Some(object) => {
                    contract.check_object(object, path)?;
                    true
                }
                None => false,
            },
            Self::OneOf(arms) => {
                let mut matched = false;
                for arm in arms {
                    let mut candidate = value.clone();
                    if arm.check(&mut candidate, path).is_ok() {
                        *value = candidate;
                        matched = true;
                        break;
                    }
                }
                matched
            }
        };

        if matches {
            Ok(())
        } else {
            Err(TechnicalError::SchemaViolation {
                field_path: path.to_string(),
                reason: format!(
                    "expected {}, got {}",
                    self.expected(),
                    json_type_name(value)
                ),
            })
        }
    }

    fn schema_value(&self) -> Value {
        match self {
            Self::String => json!({ "type": "string" }),
            Self::Integer => json!({ "type": "integer" }),
            Self::Number => json!({ "type": "number" }),
            Self::Boolean => json!({ "type": "boolean" }),
            Self::Enum(values) => json!({ "type": "string", "enum": values }),
            Self::Array(item_type) => {
                json!({ "type": "array", "items": item_type.schema_value() })
            }
            Self::Object(contract) => contract.schema_value(),
            Self::OneOf(arms) => {
                let schemas: Vec<Value> = arms.iter().map(FieldType::schema_value).collect();
                json!({ "oneOf": schemas })
            }
        }
    }
}

/// Declaration of one named field in a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
}

fn default_required() -> bool {
    true
}

impl FieldSpec {
    pub fn required(field_type: FieldType) -> Self {
        Self {
            field_type,
            description: None,
            required: true,
            default: None,
        }
    }

    pub fn optional(field_type: FieldType) -> Self {
        Self {
            field_type,
            description: None,
            required: false,
            default: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self.required = false;
        self
    }
}

/// A structured-output contract: named, typed fields a final answer must
/// provide. Immutable once attached to a pup; applies to every terminal
/// success with no per-call override.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputContract {
    pub fields: BTreeMap<String, FieldSpec>,
}

impl OutputContract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    /// JSON Schema form, sent to the provider and echoed into the system
    /// prompt when structured output is requested.
    pub fn schema_value(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, spec) in &self.fields {
            let mut schema = spec.field_type.schema_value();
            if let (Some(obj), Some(description)) = (schema.as_object_mut(), &spec.description) {
                obj.insert("description".into(), json!(description));
            }
            properties.insert(name.clone(), schema);
            if spec.required {
                required.push(json!(name));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Validate raw final-answer text against this contract.
    ///
    /// Locates the first balanced JSON object in the text (stripping
    /// surrounding prose and markdown code fences), then checks every
    /// declared field: required fields must be present with a compatible
    /// type, optional fields are defaulted when absent, unknown fields are
    /// ignored. Numeric strings are not coerced to numbers.
    pub fn validate(&self, raw: &str) -> Result<Value, PupError> {
        let Some(mut value) = extract_json_object(raw) else {
            return Err(TechnicalError::InvalidJson {
                reason: "no balanced JSON object found".into(),
                content: raw.trim().to_string(),
            }
            .into());
        };

        let object = value
            .as_object_mut()
            .unwrap_or_else(|| unreachable!("extract_json_object only yields objects"));
        self.check_object(object, "")?;
        Ok(value)
    }

    fn check_object(
        &self,
        object: &mut Map<String, Value>,
        path: &str,
    ) -> Result<(), TechnicalError> {
        for (name, spec) in &self.fields {
            let field_path = if path.is_empty() {
                name.clone()
            } else {
                format!("{path}.{name}")
            };
            match object.get_mut(name) {
                Some(value) => spec.field_type.check(value, &field_path)?,
                None if spec.required => {
                    return Err(TechnicalError::SchemaViolation {
                        field_path,
                        reason: "required field is missing".into(),
                    });
                }
                None => {
                    let default = spec.default.clone().unwrap_or(Value::Null);
                    object.insert(name.clone(), default);
                }
            }
        }
        Ok(())
    }
}

/// Classify final text against an optional contract.
pub fn classify_final(
    text: &str,
    contract: Option<&OutputContract>,
) -> Result<RunOutput, PupError> {
    match contract {
        None => Ok(RunOutput::Text(text.trim().to_string())),
        Some(contract) => contract.validate(text).map(RunOutput::Structured),
    }
}

/// Find the first balanced, parseable JSON object embedded in `text`.
fn extract_json_object(text: &str) -> Option<Value> {
    let candidate = strip_code_fences(text);
    let bytes = candidate.as_bytes();
    for start in 0..bytes.len() {
        if bytes[start] != b'{' {
            continue;
        }
        if let Some(len) = balanced_object_len(&candidate[start..]) {
            let slice = &candidate[start..start + len];
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(slice) {
                return Some(value);
            }
        }
    }
    None
}

/// Prefer the contents of a fenced code block when one holds an object.
fn strip_code_fences(text: &str) -> &str {
    if !text.contains("```") {
        return text;
    }
    for (index, segment) in text.split("```").enumerate() {
        // Odd segments sit inside a fence pair.
        if index % 2 == 1 {
            let inner = segment.strip_prefix("json").unwrap_or(segment);
            if inner.contains('{') {
                return inner;
            }
        }
    }
    text
}

/// Byte length of the balanced object starting at the leading `{`, scanning
/// with string and escape awareness.
fn balanced_object_len(text: &str) -> Option<usize> {
    let mut depth = 0u32;
    let mut in_string = false;
    let mut escaped = false;
    for (index, byte) in text.bytes().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(index + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather_contract() -> OutputContract {
        OutputContract::new()
            .field("temperature", FieldSpec::required(FieldType::Number))
            .field("conditions", FieldSpec::required(FieldType::String))
    }

    #[test]
    fn no_contract_returns_trimmed_text() {
        let output = classify_final("  a haiku about rain\n", None).unwrap();
        assert_eq!(output, RunOutput::Text("a haiku about rain".into()));
    }

    #[test]
    fn extracts_object_from_surrounding_prose() {
        let raw = r#"here you go: {"temperature": 22, "conditions": "sunny"}"#;
        let value = weather_contract().validate(raw).unwrap();
        assert_eq!(value["temperature"], json!(22));
        assert_eq!(value["conditions"], json!("sunny"));
    }

    #[test]
    fn extracts_object_from_markdown_fence() {
        let raw = "Sure!\n```json\n{\"temperature\": -3.5, \"conditions\": \"snow\"}\n```\nEnjoy.";
        let value = weather_contract().validate(raw).unwrap();
        assert_eq!(value["temperature"], json!(-3.5));
    }

    #[test]
    fn braces_inside_strings_do_not_break_extraction() {
        let raw = r#"{"conditions": "cloudy {maybe}", "temperature": 10}"#;
        let value = weather_contract().validate(raw).unwrap();
        assert_eq!(value["conditions"], json!("cloudy {maybe}"));
    }

    #[test]
    fn missing_json_is_invalid_json() {
        let err = weather_contract().validate("no structure here").unwrap_err();
        assert_eq!(err.subtype(), "invalid_json");
    }

    #[test]
    fn missing_required_field_names_it() {
        let err = weather_contract()
            .validate(r#"{"temperature": 22}"#)
            .unwrap_err();
        assert_eq!(err.subtype(), "schema_violation");
        assert_eq!(err.details()["field_path"], json!("conditions"));
    }

    #[test]
    fn numeric_strings_are_not_coerced() {
        let err = weather_contract()
            .validate(r#"{"temperature": "22", "conditions": "sunny"}"#)
            .unwrap_err();
        assert_eq!(err.details()["field_path"], json!("temperature"));
        assert!(err.to_string().contains("expected number, got string"));
    }

    #[test]
    fn union_accepts_any_listed_arm() {
        let contract = OutputContract::new().field(
            "temperature",
            FieldSpec::required(FieldType::OneOf(vec![FieldType::Number, FieldType::String])),
        );
        assert!(contract.validate(r#"{"temperature": 22}"#).is_ok());
        assert!(contract.validate(r#"{"temperature": "22"}"#).is_ok());
        assert!(contract.validate(r#"{"temperature": true}"#).is_err());
    }

    #[test]
    fn optional_fields_are_defaulted_when_absent() {
        let contract = weather_contract().field(
            "humidity",
            FieldSpec::optional(FieldType::Number).with_default(json!(50)),
        );
        let value = contract
            .validate(r#"{"temperature": 22, "conditions": "sunny"}"#)
            .unwrap();
        assert_eq!(value["humidity"], json!(50));
    }

    #[test]
    fn optional_field_without_default_becomes_null() {
        let contract = weather_contract().field("source", FieldSpec::optional(FieldType::String));
        let value = contract
            .validate(r#"{"temperature": 22, "conditions": "sunny"}"#)
            .unwrap();
        assert_eq!(value["source"], Value::Null);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let value = weather_contract()
            .validate(r#"{"temperature": 22, "conditions": "sunny", "extra": []}"#)
            .unwrap();
        assert_eq!(value["extra"], json!([]));
    }

    #[test]
    fn nested_violations_carry_the_full_path() {
        let contract = OutputContract::new().field(
            "readings",
            FieldSpec::required(FieldType::Array(Box::new(FieldType::Object(
                OutputContract::new().field("value", FieldSpec::required(FieldType::Number)),
            )))),
        );
        let err = contract
            .validate(r#"{"readings": [{"value": 1}, {"value": "x"}]}"#)
            .unwrap_err();
        assert_eq!(err.details()["field_path"], json!("readings[1].value"));
    }

    #[test]
    fn integer_type_rejects_fractions() {
        let contract =
            OutputContract::new().field("count", FieldSpec::required(FieldType::Integer));
        assert!(contract.validate(r#"{"count": 3}"#).is_ok());
        assert!(contract.validate(r#"{"count": 3.5}"#).is_err());
    }

    #[test]
    fn schema_value_lists_required_fields() {
        let schema = weather_contract().schema_value();
        assert_eq!(schema["type"], json!("object"));
        assert_eq!(schema["required"], json!(["conditions", "temperature"]));
        assert_eq!(schema["properties"]["temperature"]["type"], json!("number"));
    }

    #[test]
    fn contract_round_trips_through_serde() {
        let contract = OutputContract::new()
            .field("mood", FieldSpec::required(FieldType::Enum(vec!["up".into(), "down".into()])))
            .field("note", FieldSpec::optional(FieldType::String));
        let encoded = serde_json::to_string(&contract).expect("serialize");
        let decoded: OutputContract = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(contract, decoded);
    }
}
