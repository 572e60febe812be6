//! Process-wide store of loaded tools keyed by identity.
//!
//! Entries are never evicted or refreshed; a loaded tool lives as long as the store.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tool_primitives::ToolKey;

use crate::tool::RemoteTool;

/// Identity-keyed cache of [`RemoteTool`] wrappers.
#[derive(Default)]
pub struct ToolCache {
    inner: RwLock<HashMap<ToolKey, Arc<RemoteTool>>>,
}

impl std::fmt::Debug for ToolCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCache")
            .field("cached", &self.keys())
            .finish()
    }
}

impl ToolCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached wrapper, if any.
    #[must_use]
    pub fn get(&self, key: &ToolKey) -> Option<Arc<RemoteTool>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.get(key).cloned()
    }

    /// Stores a wrapper, replacing any previous entry.
    pub fn put(&self, key: ToolKey, tool: Arc<RemoteTool>) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.insert(key, tool);
    }

    /// Stores `tool` unless an entry already exists, returning whichever is cached.
    ///
    /// Two loads of one identity that both missed end up sharing the first stored
    /// wrapper.
    pub fn get_or_insert(&self, key: ToolKey, tool: Arc<RemoteTool>) -> Arc<RemoteTool> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(inner.entry(key).or_insert(tool))
    }

    /// Returns `true` when the identity has been loaded.
    #[must_use]
    pub fn contains(&self, key: &ToolKey) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.contains_key(key)
    }

    /// Number of loaded tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when nothing has been loaded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lists the cached keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<ToolKey> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<_> = inner.keys().cloned().collect();
        keys.sort();
        keys
    }
}
