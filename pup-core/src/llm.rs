//! The model-client seam: the `ModelClient` trait the run engine suspends
//! on, its reply types, and scripted implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::PupError;
use crate::message::ChatMessage;
use crate::tool::ToolCall;

/// Raw completion as the provider returned it: optional text plus zero or
/// more tool call requests.
#[derive(Debug, Clone, Default)]
pub struct RawCompletion {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl RawCompletion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            text: None,
            tool_calls: calls,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Resolve the tagged union exactly once per model round.
    ///
    /// Tool calls take precedence: a turn carrying both calls and text is a
    /// tool-call batch and the text is dropped. An empty batch is a final
    /// answer; absent text becomes the empty string.
    pub fn into_reply(self) -> ModelReply {
        if self.has_tool_calls() {
            if let Some(text) = self.text.as_deref().filter(|t| !t.trim().is_empty()) {
                tracing::debug!(text, "ignoring text accompanying tool calls");
            }
            ModelReply::ToolCalls(self.tool_calls)
        } else {
            ModelReply::Final(self.text.unwrap_or_default())
        }
    }
}

/// One model reply, already resolved to exactly one of its two shapes.
#[derive(Debug, Clone)]
pub enum ModelReply {
    ToolCalls(Vec<ToolCall>),
    Final(String),
}

/// Abstraction over one completion round against a remote model.
///
/// Transport or provider failure maps to `ProviderError` and is fatal to
/// the run; retries, if any, belong to the implementation, not the engine.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tool_schemas: &[Value],
        output_schema: Option<&Value>,
    ) -> Result<RawCompletion, PupError>;
}

/// A mock client that replays a fixed queue of completions.
pub struct MockModelClient {
    completions: Mutex<Vec<RawCompletion>>,
}

impl MockModelClient {
    pub fn new(completions: Vec<RawCompletion>) -> Self {
        Self {
            completions: Mutex::new(completions),
        }
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _tool_schemas: &[Value],
        _output_schema: Option<&Value>,
    ) -> Result<RawCompletion, PupError> {
        let mut completions = self.completions.lock().unwrap();
        if completions.is_empty() {
            Ok(RawCompletion::text("No more mock completions"))
        } else {
            Ok(completions.remove(0))
        }
    }
}

/// What a [`ScriptedModelClient`] observed for one completion request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub message_count: usize,
    pub tool_schema_count: usize,
    pub output_schema_sent: bool,
}

/// A scripted client: pops one step per call (completions or errors) and
/// records each request for assertions.
pub struct ScriptedModelClient {
    steps: Mutex<Vec<Result<RawCompletion, PupError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedModelClient {
    pub fn new(steps: Vec<Result<RawCompletion, PupError>>) -> Self {
        Self {
            steps: Mutex::new(steps),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tool_schemas: &[Value],
        output_schema: Option<&Value>,
    ) -> Result<RawCompletion, PupError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            message_count: messages.len(),
            tool_schema_count: tool_schemas.len(),
            output_schema_sent: output_schema.is_some(),
        });

        let mut steps = self.steps.lock().unwrap();
        if steps.is_empty() {
            Ok(RawCompletion::text("script exhausted"))
        } else {
            steps.remove(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather_call() -> ToolCall {
        ToolCall {
            id: "call-1".into(),
            name: "get_weather".into(),
            arguments: json!({ "location": "Chicago" }),
        }
    }

    #[test]
    fn tool_calls_take_precedence_over_text() {
        let completion = RawCompletion {
            text: Some("checking the weather now".into()),
            tool_calls: vec![weather_call()],
        };
        match completion.into_reply() {
            ModelReply::ToolCalls(batch) => assert_eq!(batch.len(), 1),
            other => panic!("expected tool calls, got {other:?}"),
        }
    }

    #[test]
    fn empty_batch_is_a_final_answer() {
        let completion = RawCompletion {
            text: Some("all done".into()),
            tool_calls: vec![],
        };
        match completion.into_reply() {
            ModelReply::Final(text) => assert_eq!(text, "all done"),
            other => panic!("expected final answer, got {other:?}"),
        }
    }

    #[test]
    fn absent_text_becomes_empty_final() {
        match RawCompletion::default().into_reply() {
            ModelReply::Final(text) => assert!(text.is_empty()),
            other => panic!("expected final answer, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn scripted_client_records_requests() {
        let client = ScriptedModelClient::new(vec![Ok(RawCompletion::text("hi"))]);
        let messages = vec![
            crate::message::ChatMessage::system("sys"),
            crate::message::ChatMessage::user("task"),
        ];
        client
            .complete(&messages, &[json!({})], None)
            .await
            .unwrap();

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].message_count, 2);
        assert_eq!(requests[0].tool_schema_count, 1);
        assert!(!requests[0].output_schema_sent);
    }
}
