//! `remember` / `recall`: the memory capability pair over a shared
//! [`MemoryStore`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use pup_core::tool::{ParamSpec, ParamType, ToolCapability, ToolExecutionError};

use crate::memory::MemoryStore;

pub struct RememberTool {
    store: Arc<dyn MemoryStore>,
}

impl RememberTool {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ToolCapability for RememberTool {
    fn name(&self) -> &str {
        "remember"
    }

    fn description(&self) -> &str {
        "Save information to memory for future use"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("key", ParamType::String, "The key to store the value under"),
            ParamSpec::required("value", ParamType::String, "The value to remember"),
        ]
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<String, ToolExecutionError> {
        let key = require_str(&arguments, "key")?;
        let value = require_str(&arguments, "value")?;
        self.store
            .save(key, value)
            .await
            .map_err(|e| ToolExecutionError::new(format!("failed to save to memory: {e}")))?;
        Ok(format!("Successfully saved: {key} = {value}"))
    }
}

pub struct RecallTool {
    store: Arc<dyn MemoryStore>,
}

impl RecallTool {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ToolCapability for RecallTool {
    fn name(&self) -> &str {
        "recall"
    }

    fn description(&self) -> &str {
        "Recall information from key-value memory by key"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required(
            "key",
            ParamType::String,
            "The key to recall the value for",
        )]
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<String, ToolExecutionError> {
        let key = require_str(&arguments, "key")?;
        let value = self
            .store
            .get(key)
            .await
            .map_err(|e| ToolExecutionError::new(format!("failed to recall from memory: {e}")))?;
        // Absence is reported as result text, not as an error.
        match value {
            Some(value) => Ok(format!("Remembered value for {key}: {value}")),
            None => Ok(format!("No memory found for key: {key}")),
        }
    }
}

fn require_str<'a>(
    arguments: &'a Map<String, Value>,
    name: &str,
) -> Result<&'a str, ToolExecutionError> {
    arguments
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolExecutionError::new(format!("{name} argument missing")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::JsonFileMemory;
    use serde_json::json;
    use std::path::PathBuf;

    fn temp_store() -> Arc<JsonFileMemory> {
        let path: PathBuf =
            std::env::temp_dir().join(format!("pup_memory_tools_{}.json", uuid::Uuid::new_v4()));
        Arc::new(JsonFileMemory::new(path))
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn remember_then_recall_round_trips() {
        let store = temp_store();
        let remember = RememberTool::new(store.clone());
        let recall = RecallTool::new(store.clone());

        let saved = remember
            .execute(args(json!({ "key": "owner", "value": "Ada" })))
            .await
            .unwrap();
        assert_eq!(saved, "Successfully saved: owner = Ada");

        let remembered = recall
            .execute(args(json!({ "key": "owner" })))
            .await
            .unwrap();
        assert_eq!(remembered, "Remembered value for owner: Ada");
        let _ = std::fs::remove_file(store.path());
    }

    #[tokio::test]
    async fn recall_of_absent_key_reports_absence_as_text() {
        let recall = RecallTool::new(temp_store());
        let out = recall
            .execute(args(json!({ "key": "missing" })))
            .await
            .unwrap();
        assert_eq!(out, "No memory found for key: missing");
    }
}
