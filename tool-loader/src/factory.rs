//! Builds callable wrappers from successful describe results.

use std::fmt;
use std::sync::Arc;

use tool_adapters::traits::{Descriptor, ToolExecutor, ToolSource};
use tool_primitives::ConversationId;
use tool_telemetry::health::HealthReporter;

use crate::conversation::ConversationStore;
use crate::tool::{ConversationTool, RemoteTool, ToolDefinition};

/// Factory sharing the executor, conversation store, and health reporter with every
/// wrapper it creates.
#[derive(Clone)]
pub struct ToolFactory {
    executor: Arc<dyn ToolExecutor>,
    conversations: Arc<ConversationStore>,
    health: Arc<dyn HealthReporter>,
}

impl fmt::Debug for ToolFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolFactory")
            .field("executor", &"dyn ToolExecutor")
            .field("health", &"dyn HealthReporter")
            .finish_non_exhaustive()
    }
}

impl ToolFactory {
    /// Creates a factory.
    #[must_use]
    pub fn new(
        executor: Arc<dyn ToolExecutor>,
        conversations: Arc<ConversationStore>,
        health: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            executor,
            conversations,
            health,
        }
    }

    /// Creates the shared, cacheable wrapper. The export name becomes the tool name.
    #[must_use]
    pub fn create(&self, source: ToolSource, descriptor: Descriptor) -> Arc<RemoteTool> {
        let (description, input_schema) = descriptor.into_parts();
        let definition =
            ToolDefinition::new(source.identity().export_name(), description, input_schema);
        Arc::new(RemoteTool::new(
            source,
            definition,
            Arc::clone(&self.executor),
            Arc::clone(&self.conversations),
            Arc::clone(&self.health),
        ))
    }

    /// Creates a wrapper and binds it to `conversation`.
    #[must_use]
    pub fn build(
        &self,
        source: ToolSource,
        conversation: ConversationId,
        descriptor: Descriptor,
    ) -> ConversationTool {
        self.create(source, descriptor).bind(conversation)
    }
}
