//! Tool capabilities: the `ToolCapability` trait, authored parameter
//! descriptors, the provider-facing schema builder, and the resolved
//! `ToolSet` with validated dispatch.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{PupError, TechnicalError};

/// A capability's own runtime failure.
///
/// Never fatal to a run: the engine folds it back into the conversation as a
/// tool result so the model can react. Only registry-level dispatch failures
/// (unknown tool, bad arguments) surface as [`PupError`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ToolExecutionError(pub String);

impl ToolExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Type tag for a tool parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    /// Closed set of allowed string values.
    Enum(Vec<String>),
}

impl ParamType {
    fn json_type(&self) -> &'static str {
        match self {
            Self::String | Self::Enum(_) => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// Authored descriptor for one tool parameter. Descriptors are data the
/// capability declares, never inferred via reflection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn required(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: true,
            default: None,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: false,
            default: None,
        }
    }

    /// Attach a default value, injected at dispatch when the argument is
    /// absent. A parameter with a default is never required.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self.required = false;
        self
    }

    fn schema_value(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".into(), json!(self.param_type.json_type()));
        schema.insert("description".into(), json!(self.description));
        if let ParamType::Enum(values) = &self.param_type {
            schema.insert("enum".into(), json!(values));
        }
        if let Some(default) = &self.default {
            schema.insert("default".into(), default.clone());
        }
        Value::Object(schema)
    }
}

/// A tool call requested by the model inside an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Result of one tool call, paired 1:1 with the request by `call_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub output: ToolOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ToolOutput {
    Success(String),
    Error(String),
}

impl ToolOutput {
    /// Text form as seen by the model in the conversation.
    pub fn as_conversation_text(&self) -> String {
        match self {
            Self::Success(text) => text.clone(),
            Self::Error(err) => format!("Error: {err}"),
        }
    }
}

/// A named, schema-described unit of async work callable by the model.
///
/// Implementations must be safe for concurrent invocation; the engine does
/// not serialize tool execution across overlapping runs.
#[async_trait]
pub trait ToolCapability: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> Vec<ParamSpec>;

    /// Execute with arguments already validated against [`Self::parameters`].
    async fn execute(&self, arguments: Map<String, Value>) -> Result<String, ToolExecutionError>;
}

/// Derive the provider-facing function-call schema from a capability's
/// declared parameter descriptors.
pub fn call_schema(tool: &dyn ToolCapability) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for spec in tool.parameters() {
        if spec.required {
            required.push(json!(spec.name));
        }
        properties.insert(spec.name.clone(), spec.schema_value());
    }
    json!({
        "type": "function",
        "function": {
            "name": tool.name(),
            "description": tool.description(),
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": required,
            },
        },
    })
}

/// The resolved, run-facing set of capabilities handed to a pup.
///
/// Immutable after construction and safe for concurrent read dispatch.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn ToolCapability>>,
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSet").field("tools", &self.names()).finish()
    }
}

impl ToolSet {
    /// Build a set, rejecting name collisions with `DuplicateToolName`.
    pub fn new(tools: Vec<Arc<dyn ToolCapability>>) -> Result<Self, PupError> {
        let mut seen: Vec<&str> = Vec::with_capacity(tools.len());
        for tool in &tools {
            if seen.contains(&tool.name()) {
                return Err(TechnicalError::DuplicateToolName {
                    name: tool.name().to_string(),
                }
                .into());
            }
            seen.push(tool.name());
        }
        Ok(Self { tools })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolCapability>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Provider-facing call schemas, in set order.
    pub fn schemas(&self) -> Vec<Value> {
        self.tools.iter().map(|t| call_schema(t.as_ref())).collect()
    }

    /// Dispatch one tool call.
    ///
    /// Arguments are validated and coerced against the declared parameter
    /// descriptors before the capability body runs. An unknown tool name or
    /// invalid arguments fail the run; the capability's own runtime failure
    /// does not, and comes back as an error-carrying [`ToolResult`].
    pub async fn dispatch(&self, call: &ToolCall) -> Result<ToolResult, PupError> {
        let Some(tool) = self.get(&call.name) else {
            return Err(TechnicalError::UnknownTool {
                names: vec![call.name.clone()],
            }
            .into());
        };

        let arguments = validate_arguments(tool.as_ref(), &call.arguments)?;

        match tool.execute(arguments).await {
            Ok(text) => Ok(ToolResult {
                call_id: call.id.clone(),
                output: ToolOutput::Success(text),
            }),
            Err(err) => {
                tracing::warn!(tool = %call.name, error = %err, "tool execution failed");
                Ok(ToolResult {
                    call_id: call.id.clone(),
                    output: ToolOutput::Error(err.to_string()),
                })
            }
        }
    }
}

/// Check a raw argument payload against a capability's parameter descriptors.
///
/// Required parameters must be present with a compatible type, defaults are
/// injected for absent optionals, enum values must be members of the closed
/// set, and unknown keys are rejected. Numeric strings are not accepted for
/// numeric parameters.
fn validate_arguments(
    tool: &dyn ToolCapability,
    raw: &Value,
) -> Result<Map<String, Value>, PupError> {
    let provided = match raw {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => {
            return Err(argument_error(
                tool.name(),
                format!("expected an argument object, got {}", json_type_name(other)),
            ));
        }
    };

    let specs = tool.parameters();

    for key in provided.keys() {
        if !specs.iter().any(|spec| spec.name == *key) {
            return Err(argument_error(
                tool.name(),
                format!("unknown argument `{key}`"),
            ));
        }
    }

    let mut validated = Map::new();
    for spec in &specs {
        match provided.get(&spec.name) {
            Some(value) => {
                check_argument_type(tool.name(), spec, value)?;
                validated.insert(spec.name.clone(), value.clone());
            }
            None if spec.required => {
                return Err(argument_error(
                    tool.name(),
                    format!("missing required argument `{}`", spec.name),
                ));
            }
            None => {
                if let Some(default) = &spec.default {
                    validated.insert(spec.name.clone(), default.clone());
                }
            }
        }
    }
    Ok(validated)
}

fn check_argument_type(tool: &str, spec: &ParamSpec, value: &Value) -> Result<(), PupError> {
    let ok = match &spec.param_type {
        ParamType::String => value.is_string(),
        ParamType::Integer => value.as_i64().is_some() || value.as_u64().is_some(),
        ParamType::Number => value.is_number(),
        ParamType::Boolean => value.is_boolean(),
        ParamType::Enum(allowed) => match value.as_str() {
            Some(s) => {
                if allowed.iter().any(|a| a == s) {
                    true
                } else {
                    return Err(argument_error(
                        tool,
                        format!(
                            "argument `{}` must be one of [{}], got {value}",
                            spec.name,
                            allowed.join(", ")
                        ),
                    ));
                }
            }
            None => false,
        },
    };

    if ok {
        Ok(())
    } else {
        Err(argument_error(
            tool,
            format!(
                "argument `{}` expected {}, got {}",
                spec.name,
                spec.param_type.json_type(),
                json_type_name(value)
            ),
        ))
    }
}

fn argument_error(tool: &str, reason: String) -> PupError {
    TechnicalError::ToolArgument {
        tool: tool.to_string(),
        reason,
    }
    .into()
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct EchoTool {
        calls: AtomicU32,
    }

    impl EchoTool {
        fn new() -> Self {
            Self {
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ToolCapability for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo a message back"
        }

        fn parameters(&self) -> Vec<ParamSpec> {
            vec![
                ParamSpec::required("message", ParamType::String, "The message to echo"),
                ParamSpec::optional("repeat", ParamType::Integer, "Repeat count")
                    .with_default(json!(1)),
                ParamSpec::optional(
                    "tone",
                    ParamType::Enum(vec!["plain".into(), "loud".into()]),
                    "Echo tone",
                ),
            ]
        }

        async fn execute(
            &self,
            arguments: Map<String, Value>,
        ) -> Result<String, ToolExecutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let message = arguments
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let repeat = arguments
                .get("repeat")
                .and_then(Value::as_i64)
                .unwrap_or(1);
            Ok(vec![message; repeat as usize].join(" "))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl ToolCapability for FailingTool {
        fn name(&self) -> &str {
            "flaky"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn parameters(&self) -> Vec<ParamSpec> {
            vec![]
        }

        async fn execute(&self, _: Map<String, Value>) -> Result<String, ToolExecutionError> {
            Err(ToolExecutionError::new("backend unavailable"))
        }
    }

    fn echo_set() -> (Arc<EchoTool>, ToolSet) {
        let tool = Arc::new(EchoTool::new());
        let set = ToolSet::new(vec![tool.clone()]).unwrap();
        (tool, set)
    }

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            id: "call-1".into(),
            name: name.into(),
            arguments,
        }
    }

    #[test]
    fn call_schema_marks_parameters_without_default_required() {
        let schema = call_schema(&EchoTool::new());
        assert_eq!(schema["function"]["name"], json!("echo"));
        assert_eq!(schema["function"]["parameters"]["required"], json!(["message"]));
        let properties = &schema["function"]["parameters"]["properties"];
        assert_eq!(properties["repeat"]["default"], json!(1));
        assert_eq!(properties["tone"]["enum"], json!(["plain", "loud"]));
        assert_eq!(properties["tone"]["type"], json!("string"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = ToolSet::new(vec![
            Arc::new(EchoTool::new()) as Arc<dyn ToolCapability>,
            Arc::new(EchoTool::new()),
        ])
        .unwrap_err();
        assert_eq!(err.subtype(), "duplicate_tool_name");
    }

    #[tokio::test]
    async fn dispatch_injects_defaults_and_executes() {
        let (_, set) = echo_set();
        let result = set
            .dispatch(&call("echo", json!({ "message": "hi" })))
            .await
            .unwrap();
        assert_eq!(result.call_id, "call-1");
        assert!(matches!(result.output, ToolOutput::Success(ref s) if s == "hi"));
    }

    #[tokio::test]
    async fn dispatch_rejects_missing_required_argument_without_invoking_body() {
        let (tool, set) = echo_set();
        let err = set.dispatch(&call("echo", json!({}))).await.unwrap_err();
        assert_eq!(err.subtype(), "tool_argument_error");
        assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dispatch_rejects_unknown_argument_key() {
        let (_, set) = echo_set();
        let err = set
            .dispatch(&call("echo", json!({ "message": "hi", "volume": 11 })))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown argument `volume`"));
    }

    #[tokio::test]
    async fn dispatch_does_not_coerce_numeric_strings() {
        let (_, set) = echo_set();
        let err = set
            .dispatch(&call("echo", json!({ "message": "hi", "repeat": "3" })))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expected integer, got string"));
    }

    #[tokio::test]
    async fn dispatch_rejects_enum_outsiders() {
        let (_, set) = echo_set();
        let err = set
            .dispatch(&call("echo", json!({ "message": "hi", "tone": "whisper" })))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("must be one of [plain, loud]"));
    }

    #[tokio::test]
    async fn dispatch_unknown_tool_is_fatal() {
        let (_, set) = echo_set();
        let err = set
            .dispatch(&call("nonexistent_tool", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.subtype(), "unknown_tool");
    }

    #[tokio::test]
    async fn execution_failure_folds_into_result() {
        let set = ToolSet::new(vec![Arc::new(FailingTool) as Arc<dyn ToolCapability>]).unwrap();
        let result = set.dispatch(&call("flaky", json!({}))).await.unwrap();
        match result.output {
            ToolOutput::Error(err) => assert_eq!(err, "backend unavailable"),
            other => panic!("expected error output, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatch_holds_no_call_history() {
        let (tool, set) = echo_set();
        let request = call("echo", json!({ "message": "twice", "repeat": 2 }));
        let first = set.dispatch(&request).await.unwrap();
        let second = set.dispatch(&request).await.unwrap();
        assert!(matches!(first.output, ToolOutput::Success(ref s) if s == "twice twice"));
        assert!(matches!(second.output, ToolOutput::Success(ref s) if s == "twice twice"));
        assert_eq!(tool.calls.load(Ordering::SeqCst), 2);
    }
}
