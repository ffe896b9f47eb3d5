//! System prompt assembly and bail detection.
//!
//! The marker here and the instruction block must stay in lockstep: the
//! model is told to bail with exactly the prefix the detector looks for.

use pup_core::contract::OutputContract;

/// Prefix a final answer must carry for the run to classify as a bail.
pub const BAIL_MARKER: &str = "BAIL:";

const BAIL_INSTRUCTIONS: &str = "\
Important Instructions:
1. You are a specialized assistant with a specific task. Stay focused on that task.
2. Do not engage in conversation or ask follow-up questions.
3. If you cannot complete the task with the information and tools provided, respond with BAIL.

When to BAIL:
- If required information is missing
- If the request is unclear or ambiguous
- If you're unsure about anything
- If the task is outside your specific role

How to BAIL:
Respond with: BAIL: <clear explanation of why you cannot proceed>

Remember: It's better to bail clearly than to guess wildly or ask for clarification.";

/// Assemble the system prompt: instructions, the bail block, and the
/// contract's JSON schema when structured output is requested.
pub fn build_system_prompt(instructions: &str, contract: Option<&OutputContract>) -> String {
    let mut prompt = format!("{}\n\n{}", instructions.trim(), BAIL_INSTRUCTIONS);
    if let Some(contract) = contract {
        let schema = serde_json::to_string_pretty(&contract.schema_value())
            .unwrap_or_else(|_| "{}".to_string());
        prompt.push_str(&format!(
            "\n\nYou MUST respond with valid JSON matching this schema:\n{schema}\n\
             Always respond with properly formatted JSON, never with plain text."
        ));
    }
    prompt
}

/// If the final text is a bail, return the model's explanation (the text
/// after the marker, trimmed).
pub fn bail_explanation(text: &str) -> Option<String> {
    text.trim()
        .strip_prefix(BAIL_MARKER)
        .map(|explanation| explanation.trim().to_string())
}
