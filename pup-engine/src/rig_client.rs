//! `ModelClient` adapter over a rig `CompletionModel`, plus construction
//! from settings for OpenAI-compatible endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use pup_core::config::PupSettings;
use pup_core::error::{PupError, TechnicalError};
use pup_core::llm::{ModelClient, RawCompletion};
use pup_core::message::{ChatMessage, MessageContent, MessageRole};
use pup_core::tool::ToolCall;

/// A `ModelClient` backed by a rig completion model. Holds the model id
/// and sampling temperature; the engine stays provider-agnostic.
pub struct RigModelClient<M: rig::completion::CompletionModel> {
    model: M,
    temperature: f64,
}

impl<M: rig::completion::CompletionModel> RigModelClient<M> {
    pub fn new(model: M, temperature: f64) -> Self {
        Self { model, temperature }
    }
}

/// Build a client against the configured OpenAI-compatible endpoint.
///
/// The API key is resolved here, so a missing key fails at client
/// construction rather than at settings load.
pub fn client_from_settings(
    settings: &PupSettings,
    model_override: Option<&str>,
) -> Result<Arc<dyn ModelClient>, PupError> {
    let key = settings.api_key()?;
    let client = rig::providers::openai::Client::builder(&key)
        .base_url(&settings.base_url)
        .build()
        .map_err(|e| TechnicalError::Provider {
            reason: format!("failed to create model client: {e}"),
        })?;

    let model_id = model_override.unwrap_or(&settings.model);
    Ok(Arc::new(RigModelClient::new(
        rig::providers::openai::CompletionModel::new(client, model_id),
        settings.temperature,
    )))
}

#[async_trait]
impl<M> ModelClient for RigModelClient<M>
where
    M: rig::completion::CompletionModel + Send + Sync + 'static,
    M::Response: Send + Sync,
{
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tool_schemas: &[Value],
        output_schema: Option<&Value>,
    ) -> Result<RawCompletion, PupError> {
        let preamble = system_prompt(messages);
        let rig_messages = to_rig_messages(messages);
        let (prompt, history) = split_prompt_and_history(rig_messages);

        let mut builder = self
            .model
            .completion_request(prompt)
            .messages(history)
            .tools(to_tool_definitions(tool_schemas))
            .temperature(self.temperature);
        if let Some(preamble) = preamble {
            builder = builder.preamble(preamble);
        }
        if output_schema.is_some() {
            // OpenAI-compatible structured output switch; the schema itself
            // is carried in the system prompt.
            builder = builder.additional_params(json!({
                "response_format": { "type": "json_object" },
            }));
        }
        let request = builder.build();

        let response = self.model.completion(request).await.map_err(|e| {
            PupError::from(TechnicalError::Provider {
                reason: e.to_string(),
            })
        })?;

        let mut text = None;
        let mut tool_calls = Vec::new();
        for content in response.choice.iter() {
            match content {
                rig::message::AssistantContent::Text(t) => {
                    text = Some(t.text.clone());
                }
                rig::message::AssistantContent::ToolCall(tc) => {
                    tool_calls.push(ToolCall {
                        id: tc.id.clone(),
                        name: tc.function.name.clone(),
                        arguments: tc.function.arguments.clone(),
                    });
                }
                _ => {} // Reasoning, Image, etc.
            }
        }

        Ok(RawCompletion { text, tool_calls })
    }
}

/// First system message text, sent as the request preamble.
fn system_prompt(messages: &[ChatMessage]) -> Option<String> {
    messages.iter().find_map(|msg| {
        if msg.role == MessageRole::System {
            msg.text().map(str::to_string)
        } else {
            None
        }
    })
}

/// Convert the conversation to rig Message format. System messages are
/// carried via the preamble, not chat history.
fn to_rig_messages(messages: &[ChatMessage]) -> Vec<rig::completion::Message> {
    let mut out = Vec::new();
    for msg in messages {
        match (&msg.role, &msg.content) {
            (MessageRole::User, MessageContent::Text(text)) => {
                out.push(rig::completion::Message::user(text.clone()));
            }
            (MessageRole::Assistant, MessageContent::Text(text)) => {
                out.push(rig::completion::Message::assistant(text.clone()));
            }
            (MessageRole::Assistant, MessageContent::ToolCalls(calls)) => {
                // One assistant turn even when multiple tools are requested.
                if let Ok(content) = rig::OneOrMany::many(calls.iter().map(|call| {
                    rig::message::AssistantContent::tool_call(
                        &call.id,
                        &call.name,
                        call.arguments.clone(),
                    )
                })) {
                    out.push(rig::completion::Message::Assistant { id: None, content });
                }
            }
            (MessageRole::Tool, MessageContent::ToolResult(result)) => {
                let text = result.output.as_conversation_text();
                out.push(rig::completion::Message::User {
                    content: rig::OneOrMany::one(rig::message::UserContent::tool_result(
                        &result.call_id,
                        rig::OneOrMany::one(rig::message::ToolResultContent::text(text)),
                    )),
                });
            }
            (MessageRole::System, _) => {}
            _ => {}
        }
    }
    out
}

/// rig wants the current prompt separate from the chat history; use the
/// last message's user text when it has one.
fn split_prompt_and_history(
    messages: Vec<rig::completion::Message>,
) -> (String, Vec<rig::completion::Message>) {
    let Some(last) = messages.last() else {
        return (String::new(), vec![]);
    };

    if let Some(text) = extract_user_text(last) {
        let history = if messages.len() > 1 {
            messages[..messages.len() - 1].to_vec()
        } else {
            vec![]
        };
        return (text, history);
    }

    (String::new(), messages)
}

fn extract_user_text(message: &rig::completion::Message) -> Option<String> {
    match message {
        rig::completion::Message::User { content } => content.iter().find_map(|c| {
            if let rig::message::UserContent::Text(t) = c {
                Some(t.text.clone())
            } else {
                None
            }
        }),
        _ => None,
    }
}

fn to_tool_definitions(tool_schemas: &[Value]) -> Vec<rig::completion::ToolDefinition> {
    tool_schemas
        .iter()
        .filter_map(|schema| {
            let function = schema.get("function")?;
            Some(rig::completion::ToolDefinition {
                name: function.get("name")?.as_str()?.to_string(),
                description: function
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                parameters: function
                    .get("parameters")
                    .cloned()
                    .unwrap_or_else(|| json!({})),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pup_core::tool::{ToolOutput, ToolResult};
    use serde_json::json;

    #[test]
    fn system_message_becomes_preamble_not_history() {
        let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("hi")];
        assert_eq!(system_prompt(&messages), Some("be brief".to_string()));
        assert_eq!(to_rig_messages(&messages).len(), 1);
    }

    #[test]
    fn split_prompt_uses_last_user_text() {
        let rig_messages = to_rig_messages(&[
            ChatMessage::user("earlier"),
            ChatMessage::assistant_text("noted"),
            ChatMessage::user("what now"),
        ]);
        let (prompt, history) = split_prompt_and_history(rig_messages);
        assert_eq!(prompt, "what now");
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn tool_result_stays_in_history() {
        let rig_messages = to_rig_messages(&[
            ChatMessage::user("question"),
            ChatMessage::assistant_tool_calls(vec![ToolCall {
                id: "call-1".into(),
                name: "get_weather".into(),
                arguments: json!({}),
            }]),
            ChatMessage::tool_result(ToolResult {
                call_id: "call-1".into(),
                output: ToolOutput::Success("sunny".into()),
            }),
        ]);
        let (prompt, history) = split_prompt_and_history(rig_messages);
        assert_eq!(prompt, "");
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn tool_definitions_come_from_the_function_envelope() {
        let schemas = vec![json!({
            "type": "function",
            "function": {
                "name": "get_weather",
                "description": "Get the current weather",
                "parameters": { "type": "object", "properties": {}, "required": [] },
            },
        })];
        let defs = to_tool_definitions(&schemas);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "get_weather");
        assert_eq!(defs[0].parameters["type"], json!("object"));
    }
}
