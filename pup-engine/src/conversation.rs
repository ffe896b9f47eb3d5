//! Per-run conversation context. Built fresh at the start of every
//! `Pup::run` and discarded with it; a pup keeps no state between runs.

use pup_core::message::ChatMessage;
use pup_core::tool::{ToolCall, ToolResult};

/// Ordered transcript of one run: system message, task, then alternating
/// assistant turns and tool results.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Start a conversation from the system prompt and the task text.
    pub fn start(system_prompt: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(task),
            ],
        }
    }

    pub fn push_tool_calls(&mut self, calls: Vec<ToolCall>) {
        self.messages.push(ChatMessage::assistant_tool_calls(calls));
    }

    pub fn push_tool_result(&mut self, result: ToolResult) {
        self.messages.push(ChatMessage::tool_result(result));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
