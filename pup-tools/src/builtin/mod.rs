//! The built-in capability catalog: the workspace's known capability
//! source, walked by `ToolRegistry::discover`.

pub mod datetime;
pub mod memory;
pub mod translate;
pub mod weather;

use std::sync::Arc;

use pup_core::llm::ModelClient;
use pup_core::tool::ToolCapability;

use crate::memory::MemoryStore;

/// Shared collaborators the built-in capabilities are constructed around.
pub struct BuiltinCatalog {
    memory: Arc<dyn MemoryStore>,
    translator: Option<Arc<dyn ModelClient>>,
}

impl BuiltinCatalog {
    pub fn new(memory: Arc<dyn MemoryStore>) -> Self {
        Self {
            memory,
            translator: None,
        }
    }

    /// Model client the `translate` capability delegates to. Without one,
    /// `translate` fails to construct and discovery skips it.
    pub fn with_translator(mut self, translator: Arc<dyn ModelClient>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Construct every built-in capability, in catalog order. Construction
    /// failures are returned per entry so discovery can skip and record them.
    pub fn build_all(&self) -> Vec<(&'static str, Result<Arc<dyn ToolCapability>, String>)> {
        vec![
            (
                "get_datetime",
                Ok(Arc::new(datetime::GetDateTimeTool) as Arc<dyn ToolCapability>),
            ),
            (
                "get_weather",
                weather::GetWeatherTool::new()
                    .map(|tool| Arc::new(tool) as Arc<dyn ToolCapability>)
                    .map_err(|e| format!("http client construction failed: {e}")),
            ),
            (
                "remember",
                Ok(Arc::new(memory::RememberTool::new(self.memory.clone()))
                    as Arc<dyn ToolCapability>),
            ),
            (
                "recall",
                Ok(Arc::new(memory::RecallTool::new(self.memory.clone()))
                    as Arc<dyn ToolCapability>),
            ),
            (
                "translate",
                match &self.translator {
                    Some(client) => Ok(Arc::new(translate::TranslateTool::new(client.clone()))
                        as Arc<dyn ToolCapability>),
                    None => Err("translate requires a model client and none was configured".into()),
                },
            ),
        ]
    }
}
