//! Built-in tool capabilities and the registry that discovers them.

pub mod builtin;
pub mod memory;
pub mod registry;

pub use builtin::BuiltinCatalog;
pub use memory::{JsonFileMemory, MemoryError, MemoryStore};
pub use registry::{DiscoveryDiagnostic, ToolRegistry, ToolSummary};
