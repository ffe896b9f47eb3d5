//! Pups as tools: a configured pup wrapped as a `ToolCapability`, so an
//! outer pup can delegate a sub-task exactly like any other tool call.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use pup_core::contract::RunOutput;
use pup_core::tool::{ParamSpec, ParamType, ToolCapability, ToolExecutionError};

use crate::engine::Pup;

/// A pup exposed as a tool with a single required `task` parameter.
///
/// Any failure of the inner run, a Cognitive bail included, surfaces as a
/// `ToolExecutionError` and is non-fatal to the outer run.
pub struct PupTool {
    pup: Pup,
    description: String,
}

impl Pup {
    pub fn into_tool(self, description: impl Into<String>) -> PupTool {
        PupTool {
            pup: self,
            description: description.into(),
        }
    }
}

#[async_trait]
impl ToolCapability for PupTool {
    fn name(&self) -> &str {
        self.pup.name()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required(
            "task",
            ParamType::String,
            "Task for this agent to perform",
        )]
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<String, ToolExecutionError> {
        let task = arguments
            .get("task")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolExecutionError::new("task argument missing"))?;

        debug!(pup = %self.pup.name(), "running nested pup");
        match self.pup.run(task).await {
            Ok(RunOutput::Text(text)) => Ok(text),
            Ok(RunOutput::Structured(value)) => serde_json::to_string_pretty(&value)
                .map_err(|e| ToolExecutionError::new(format!("unserializable output: {e}"))),
            Err(err) => Err(ToolExecutionError::new(err.to_string())),
        }
    }
}
