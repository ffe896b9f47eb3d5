//! Shared vocabulary for the pup workspace: the two-tier error taxonomy,
//! chat message types, tool capabilities and their dispatch surface, the
//! output contract validator, the model-client seam, and settings.

pub mod config;
pub mod contract;
pub mod error;
pub mod llm;
pub mod message;
pub mod tool;
