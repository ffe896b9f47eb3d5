use serde_json::json;

/// Top-level classification of a run failure.
///
/// `Technical` means a system, configuration, or provider defect; `Cognitive`
/// means the model itself declined to complete the task. The two are disjoint
/// and every non-success run termination produces exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Technical,
    Cognitive,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Technical => write!(f, "technical"),
            Self::Cognitive => write!(f, "cognitive"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PupError {
    #[error("technical({}): {0}", .0.subtype())]
    Technical(#[from] TechnicalError),

    #[error("cognitive({}): {0}", .0.subtype())]
    Cognitive(#[from] CognitiveError),
}

impl PupError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Technical(_) => ErrorCategory::Technical,
            Self::Cognitive(_) => ErrorCategory::Cognitive,
        }
    }

    pub fn subtype(&self) -> &'static str {
        match self {
            Self::Technical(err) => err.subtype(),
            Self::Cognitive(err) => err.subtype(),
        }
    }

    /// Structured details for the failure, suitable for logging or a JSON
    /// error envelope.
    pub fn details(&self) -> serde_json::Value {
        match self {
            Self::Technical(err) => err.details(),
            Self::Cognitive(err) => err.details(),
        }
    }
}

/// System, configuration, or provider defects. Always fatal to the current
/// run; never retried inside the engine.
#[derive(Debug, thiserror::Error)]
pub enum TechnicalError {
    #[error("no parseable JSON object in final answer: {reason}")]
    InvalidJson { reason: String, content: String },

    #[error("final answer violates the output contract at `{field_path}`: {reason}")]
    SchemaViolation { field_path: String, reason: String },

    #[error("{reason}")]
    MissingRequirements { reason: String },

    #[error("invalid arguments for tool `{tool}`: {reason}")]
    ToolArgument { tool: String, reason: String },

    #[error("unknown tool(s): {}", .names.join(", "))]
    UnknownTool { names: Vec<String> },

    #[error("duplicate tool name: {name}")]
    DuplicateToolName { name: String },

    #[error("model provider error: {reason}")]
    Provider { reason: String },

    #[error("max iterations ({max}) reached without a final answer")]
    MaxIterationsExceeded { max: u32 },
}

impl TechnicalError {
    pub fn subtype(&self) -> &'static str {
        match self {
            Self::InvalidJson { .. } => "invalid_json",
            Self::SchemaViolation { .. } => "schema_violation",
            Self::MissingRequirements { .. } => "missing_requirements",
            Self::ToolArgument { .. } => "tool_argument_error",
            Self::UnknownTool { .. } => "unknown_tool",
            Self::DuplicateToolName { .. } => "duplicate_tool_name",
            Self::Provider { .. } => "provider_error",
            Self::MaxIterationsExceeded { .. } => "max_iterations_exceeded",
        }
    }

    pub fn details(&self) -> serde_json::Value {
        match self {
            Self::InvalidJson { reason, content } => {
                json!({ "reason": reason, "content": content })
            }
            Self::SchemaViolation { field_path, reason } => {
                json!({ "field_path": field_path, "reason": reason })
            }
            Self::MissingRequirements { reason } => json!({ "reason": reason }),
            Self::ToolArgument { tool, reason } => json!({ "tool": tool, "reason": reason }),
            Self::UnknownTool { names } => json!({ "missing": names }),
            Self::DuplicateToolName { name } => json!({ "name": name }),
            Self::Provider { reason } => json!({ "reason": reason }),
            Self::MaxIterationsExceeded { max } => json!({ "max_iterations": max }),
        }
    }
}

/// The model's own refusal. Carries its explanation verbatim.
#[derive(Debug, thiserror::Error)]
pub enum CognitiveError {
    #[error("{explanation}")]
    Uncertain { explanation: String },
}

impl CognitiveError {
    pub fn subtype(&self) -> &'static str {
        match self {
            Self::Uncertain { .. } => "uncertain",
        }
    }

    pub fn details(&self) -> serde_json::Value {
        match self {
            Self::Uncertain { explanation } => json!({ "explanation": explanation }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn technical_error_formats_with_subtype() {
        let err = PupError::from(TechnicalError::UnknownTool {
            names: vec!["nonexistent_tool".into(), "other".into()],
        });
        assert_eq!(err.category(), ErrorCategory::Technical);
        assert_eq!(err.subtype(), "unknown_tool");
        assert_eq!(
            err.to_string(),
            "technical(unknown_tool): unknown tool(s): nonexistent_tool, other"
        );
    }

    #[test]
    fn cognitive_error_carries_explanation_verbatim() {
        let err = PupError::from(CognitiveError::Uncertain {
            explanation: "location not recognized".into(),
        });
        assert_eq!(err.category(), ErrorCategory::Cognitive);
        assert_eq!(err.subtype(), "uncertain");
        assert_eq!(
            err.to_string(),
            "cognitive(uncertain): location not recognized"
        );
        assert_eq!(
            err.details(),
            json!({ "explanation": "location not recognized" })
        );
    }

    #[test]
    fn schema_violation_details_name_the_field_path() {
        let err = PupError::from(TechnicalError::SchemaViolation {
            field_path: "readings[2].temperature".into(),
            reason: "expected number, got string".into(),
        });
        assert_eq!(
            err.details()["field_path"],
            json!("readings[2].temperature")
        );
    }
}
