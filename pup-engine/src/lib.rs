//! The run engine: a `Pup` executes one bounded task against a model,
//! looping through tool calls until a final answer is classified.

pub mod conversation;
pub mod engine;
pub mod prompt;
pub mod pup_tool;
pub mod rig_client;

pub use conversation::Conversation;
pub use engine::Pup;
pub use pup_tool::PupTool;
pub use rig_client::{client_from_settings, RigModelClient};
