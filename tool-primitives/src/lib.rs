//! Core shared types for loading remote agent tools.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;

/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Tool identity, cache key, and conversation scoping types.
pub use ids::{ConversationId, Env, KEY_DELIMITER, ToolIdentity, ToolKey};
