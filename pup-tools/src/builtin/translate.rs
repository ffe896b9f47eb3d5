//! Translation capability: a nested single-shot completion against an
//! injected model client.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use pup_core::llm::{ModelClient, ModelReply};
use pup_core::message::ChatMessage;
use pup_core::tool::{ParamSpec, ParamType, ToolCapability, ToolExecutionError};

pub struct TranslateTool {
    client: Arc<dyn ModelClient>,
}

impl TranslateTool {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolCapability for TranslateTool {
    fn name(&self) -> &str {
        "translate"
    }

    fn description(&self) -> &str {
        "Translate text from one language to another"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("text", ParamType::String, "Text to translate"),
            ParamSpec::required(
                "target_language",
                ParamType::String,
                "Language to translate to (e.g. 'Spanish', 'French')",
            ),
            ParamSpec::optional(
                "source_language",
                ParamType::String,
                "Source language, if known",
            ),
        ]
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<String, ToolExecutionError> {
        let text = arguments
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolExecutionError::new("text argument missing"))?;
        let target = arguments
            .get("target_language")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolExecutionError::new("target_language argument missing"))?;

        let mut system_prompt = format!(
            "You are a translator. Translate the following text to {target}. \
             Respond with ONLY the translated text, no explanations."
        );
        if let Some(source) = arguments.get("source_language").and_then(Value::as_str) {
            system_prompt.push_str(&format!(" The source language is {source}."));
        }

        let messages = vec![ChatMessage::system(system_prompt), ChatMessage::user(text)];
        let completion = self
            .client
            .complete(&messages, &[], None)
            .await
            .map_err(|e| ToolExecutionError::new(format!("translation failed: {e}")))?;

        match completion.into_reply() {
            ModelReply::Final(translated) => Ok(translated.trim().to_string()),
            ModelReply::ToolCalls(_) => Err(ToolExecutionError::new(
                "translation model replied with tool calls instead of text",
            )),
        }
    }
}
