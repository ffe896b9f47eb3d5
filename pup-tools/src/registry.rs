//! The tool registry: name → capability, populated once at startup by
//! explicit registration or a discovery pass over the built-in catalog.

use std::sync::Arc;

use tracing::{debug, info, warn};

use pup_core::error::{PupError, TechnicalError};
use pup_core::tool::{ParamSpec, ToolCapability, ToolSet};

use crate::builtin::BuiltinCatalog;

/// Record of a capability skipped during discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryDiagnostic {
    pub tool: String,
    pub error: String,
}

/// Display summary for one registered capability.
#[derive(Debug, Clone)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
}

/// Registry of tool capabilities.
///
/// Registration (`register`/`discover`) is a startup-time `&mut` surface;
/// once populated, the registry and every `ToolSet` resolved from it are
/// read-only and safe for concurrent dispatch.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn ToolCapability>>,
    diagnostics: Vec<DiscoveryDiagnostic>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability under its declared name. A name collision is a
    /// reported error, never a silent last-write-wins.
    pub fn register(&mut self, capability: Arc<dyn ToolCapability>) -> Result<(), PupError> {
        if self.get(capability.name()).is_some() {
            return Err(TechnicalError::DuplicateToolName {
                name: capability.name().to_string(),
            }
            .into());
        }
        debug!(tool = %capability.name(), "registered tool");
        self.tools.push(capability);
        Ok(())
    }

    /// Walk the built-in catalog and register each capability, or only
    /// those matching the filter. A capability that fails to construct is
    /// skipped with a recorded diagnostic; discovery of the rest continues.
    /// Returns the number registered.
    pub fn discover(&mut self, catalog: &BuiltinCatalog, filter: Option<&[String]>) -> usize {
        let mut count = 0;
        for (name, built) in catalog.build_all() {
            if let Some(wanted) = filter {
                if !wanted.iter().any(|w| w == name) {
                    debug!(tool = name, "skipping tool not in requested set");
                    continue;
                }
            }
            match built {
                Ok(capability) => match self.register(capability) {
                    Ok(()) => count += 1,
                    Err(err) => {
                        warn!(tool = name, error = %err, "failed to register discovered tool");
                        self.diagnostics.push(DiscoveryDiagnostic {
                            tool: name.to_string(),
                            error: err.to_string(),
                        });
                    }
                },
                Err(error) => {
                    warn!(tool = name, error = %error, "failed to load tool, skipping");
                    self.diagnostics.push(DiscoveryDiagnostic {
                        tool: name.to_string(),
                        error,
                    });
                }
            }
        }
        info!(tool_count = count, "tool discovery complete");
        count
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolCapability>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Resolve the requested names into a [`ToolSet`], in requested order.
    /// Any absent name fails with `UnknownTool` listing every missing one.
    pub fn resolve(&self, names: &[String]) -> Result<ToolSet, PupError> {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| self.get(name).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(TechnicalError::UnknownTool { names: missing }.into());
        }

        let tools = names
            .iter()
            .filter_map(|name| self.get(name).cloned())
            .collect();
        ToolSet::new(tools)
    }

    /// Summaries of every registered capability, in registration order.
    pub fn list(&self) -> Vec<ToolSummary> {
        self.tools
            .iter()
            .map(|tool| ToolSummary {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    /// Capabilities skipped during discovery, with the reason for each.
    pub fn diagnostics(&self) -> &[DiscoveryDiagnostic] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
