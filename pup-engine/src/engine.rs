//! The `Pup` run engine: one bounded task, one model loop, exactly one
//! `RunOutput` or `PupError` per run.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use pup_core::contract::{classify_final, OutputContract, RunOutput};
use pup_core::error::{CognitiveError, PupError, TechnicalError};
use pup_core::llm::{ModelClient, ModelReply};
use pup_core::tool::ToolSet;

use crate::conversation::Conversation;
use crate::prompt::{bail_explanation, build_system_prompt};

pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// A single-task agent: instructions, an optional output contract, an
/// optional tool set, and a model client.
///
/// A pup is immutable once built and keeps no state between runs; it can
/// be shared across concurrent runs behind `&` or `Arc`.
pub struct Pup {
    name: String,
    instructions: String,
    contract: Option<OutputContract>,
    tools: ToolSet,
    max_iterations: u32,
    client: Arc<dyn ModelClient>,
}

impl Pup {
    pub fn new(client: Arc<dyn ModelClient>, instructions: impl Into<String>) -> Self {
        Self {
            name: "pup".into(),
            instructions: instructions.into(),
            contract: None,
            tools: ToolSet::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            client,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_contract(mut self, contract: OutputContract) -> Self {
        self.contract = Some(contract);
        self
    }

    pub fn with_tools(mut self, tools: ToolSet) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute one task to a terminal state.
    ///
    /// The conversation is built fresh here and dropped on return. Each
    /// loop round makes exactly one model call; tool-call batches are
    /// dispatched sequentially in emission order, and the iteration counter
    /// increments after each processed batch. A `max_iterations` of N fails
    /// after exactly N processed batches.
    pub async fn run(&self, task: &str) -> Result<RunOutput, PupError> {
        let system_prompt = build_system_prompt(&self.instructions, self.contract.as_ref());
        let mut conversation = Conversation::start(system_prompt, task);

        // A zero iteration budget means a single tool-less round: no
        // schemas are offered, and a tool-call reply is a configuration
        // failure rather than a loop entry.
        let tool_schemas: Vec<Value> = if self.max_iterations == 0 {
            Vec::new()
        } else {
            self.tools.schemas()
        };
        let output_schema = self.contract.as_ref().map(OutputContract::schema_value);

        info!(
            pup = %self.name,
            tool_count = tool_schemas.len(),
            max_iterations = self.max_iterations,
            "starting run"
        );

        let mut iteration = 0u32;
        loop {
            let completion = self
                .client
                .complete(
                    conversation.messages(),
                    &tool_schemas,
                    output_schema.as_ref(),
                )
                .await?;

            match completion.into_reply() {
                ModelReply::Final(text) => {
                    if let Some(explanation) = bail_explanation(&text) {
                        warn!(pup = %self.name, iteration, %explanation, "model bailed");
                        return Err(CognitiveError::Uncertain { explanation }.into());
                    }
                    debug!(pup = %self.name, iteration, "classifying final answer");
                    return classify_final(&text, self.contract.as_ref());
                }
                ModelReply::ToolCalls(batch) => {
                    if self.max_iterations == 0 {
                        return Err(TechnicalError::MissingRequirements {
                            reason: "model requested tool calls but the iteration budget is zero"
                                .into(),
                        }
                        .into());
                    }

                    conversation.push_tool_calls(batch.clone());
                    for call in batch {
                        debug!(pup = %self.name, iteration, tool = %call.name, "dispatching tool call");
                        let result = self.tools.dispatch(&call).await?;
                        conversation.push_tool_result(result);
                    }

                    iteration += 1;
                    if iteration >= self.max_iterations {
                        warn!(pup = %self.name, max_iterations = self.max_iterations, "iteration budget exhausted");
                        return Err(TechnicalError::MaxIterationsExceeded {
                            max: self.max_iterations,
                        }
                        .into());
                    }
                }
            }
        }
    }
}
