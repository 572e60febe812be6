//! Per-conversation active tool keys and environment variables.
//!
//! Records are created on first write and only removed by [`ConversationStore::clear`].
//! Nothing expires on its own, so hosts must clear conversations they end.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};

use tool_primitives::{ConversationId, Env, ToolKey};
use tracing::debug;

#[derive(Debug, Default)]
struct ConversationInner {
    tool_keys: HashMap<ConversationId, BTreeSet<ToolKey>>,
    env: HashMap<ConversationId, Env>,
}

/// Store of conversation-scoped tool state.
#[derive(Debug, Default)]
pub struct ConversationStore {
    inner: RwLock<ConversationInner>,
}

impl ConversationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the conversation's environment.
    pub fn set_env(&self, conversation: &ConversationId, env: Env) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.env.insert(conversation.clone(), env);
    }

    /// Returns the conversation's current environment, empty when none was set.
    #[must_use]
    pub fn env(&self, conversation: &ConversationId) -> Env {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.env.get(conversation).cloned().unwrap_or_default()
    }

    /// Marks tools as active for the conversation. Adding a key twice is a no-op.
    pub fn add_tool_keys<I>(&self, conversation: &ConversationId, keys: I)
    where
        I: IntoIterator<Item = ToolKey>,
    {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner
            .tool_keys
            .entry(conversation.clone())
            .or_default()
            .extend(keys);
    }

    /// Returns the conversation's active tool keys in sorted order.
    #[must_use]
    pub fn tool_keys(&self, conversation: &ConversationId) -> Vec<ToolKey> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .tool_keys
            .get(conversation)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Forgets both the tool keys and the environment of a conversation.
    pub fn clear(&self, conversation: &ConversationId) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let had_keys = inner.tool_keys.remove(conversation).is_some();
        let had_env = inner.env.remove(conversation).is_some();
        debug!(%conversation, had_keys, had_env, "conversation state cleared");
    }

    /// Number of conversations holding any state.
    #[must_use]
    pub fn conversation_count(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let with_env_only = inner
            .env
            .keys()
            .filter(|id| !inner.tool_keys.contains_key(*id))
            .count();
        inner.tool_keys.len() + with_env_only
    }
}
