//! Shared error definitions for tool primitives.

use thiserror::Error;

/// Result alias used by the primitive constructors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building identity values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Tool identity failed validation.
    #[error("invalid tool identity: {reason}")]
    InvalidIdentity {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Tool key could not be split into package and export.
    #[error("invalid tool key `{key}`")]
    InvalidKey {
        /// The offending key string.
        key: String,
    },

    /// Conversation identifier failed validation.
    #[error("invalid conversation id: {reason}")]
    InvalidConversationId {
        /// Human-readable reason for rejection.
        reason: String,
    },
}
