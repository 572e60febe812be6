//! Dynamic loading of remotely executed agent tools.
//!
//! A [`ToolLoader`] asks the executor service to describe each requested tool,
//! wraps the description in a callable [`RemoteTool`], and caches that wrapper by
//! `(package, export)` for the life of the loader. Conversation-scoped secrets live
//! in the [`ConversationStore`] and are read on every call, so one cached wrapper
//! serves every conversation.

#![warn(missing_docs, clippy::pedantic)]

pub mod cache;
pub mod conversation;
pub mod factory;
pub mod loader;
pub mod tool;

#[cfg(test)]
mod test_support;

pub use cache::ToolCache;
pub use conversation::ConversationStore;
pub use factory::ToolFactory;
pub use loader::{ToolLoader, ToolRequest};
pub use tool::{ConversationTool, RemoteTool, Tool, ToolDefinition, ToolError, ToolResult};
