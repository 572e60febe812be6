//! Facade for loading remotely executed agent tools.
//!
//! Depend on this crate via `cargo add remote-tools`. It bundles the internal crates
//! behind feature flags so hosts can pull in only the HTTP adapters or telemetry
//! when they do not need the caching loader.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use tool_primitives as primitives;

/// Environment-resolved configuration.
pub use tool_config as config;

/// Caching loader, conversation store, and tool wrappers (enabled by `loader` feature).
#[cfg(feature = "loader")]
pub use tool_loader as loader;

/// Executor and health-report HTTP adapters (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use tool_adapters as adapters;

/// Tracing setup and health reporting (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use tool_telemetry as telemetry;

#[cfg(feature = "loader")]
pub use tool_loader::{ConversationTool, Tool, ToolError, ToolLoader, ToolRequest};
