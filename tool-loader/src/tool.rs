//! Callable wrappers around remotely executed tools.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tool_adapters::executor::DEFAULT_EXECUTION_ERROR;
use tool_adapters::traits::{RemoteError, ToolExecutor, ToolSource};
use tool_primitives::{ConversationId, ToolIdentity, ToolKey};
use tool_telemetry::health::{self, HealthReport, HealthReporter};
use tracing::{debug, warn};

use crate::conversation::ConversationStore;

/// Result alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Trait implemented by anything an agent framework can call as a tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the name, description, and parameter schema advertised to the model.
    fn definition(&self) -> &ToolDefinition;

    /// Invokes the tool with the given JSON input, returning JSON output.
    async fn invoke(&self, input: Value) -> ToolResult<Value>;
}

/// Declared shape of a tool as advertised to the agent framework.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    name: String,
    description: String,
    input_schema: Value,
}

impl ToolDefinition {
    /// Creates a definition, substituting an empty object schema when none is given.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Option<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: input_schema.unwrap_or_else(empty_object_schema),
        }
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the JSON Schema for the parameters.
    #[must_use]
    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }
}

fn empty_object_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// Cached, conversation-independent proxy for one remote tool.
///
/// Holds no mutable state: the environment forwarded on each call is read from the
/// [`ConversationStore`] at call time.
pub struct RemoteTool {
    source: ToolSource,
    definition: ToolDefinition,
    executor: Arc<dyn ToolExecutor>,
    conversations: Arc<ConversationStore>,
    health: Arc<dyn HealthReporter>,
}

impl fmt::Debug for RemoteTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTool")
            .field("source", &self.source)
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

impl RemoteTool {
    pub(crate) fn new(
        source: ToolSource,
        definition: ToolDefinition,
        executor: Arc<dyn ToolExecutor>,
        conversations: Arc<ConversationStore>,
        health: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            source,
            definition,
            executor,
            conversations,
            health,
        }
    }

    /// Returns the tool identity.
    #[must_use]
    pub fn identity(&self) -> &ToolIdentity {
        self.source.identity()
    }

    /// Returns the cache key.
    #[must_use]
    pub fn key(&self) -> ToolKey {
        self.source.identity().key()
    }

    /// Returns the version and import URL the tool was loaded with.
    #[must_use]
    pub fn source(&self) -> &ToolSource {
        &self.source
    }

    /// Returns the advertised definition.
    #[must_use]
    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    /// Executes the tool remotely on behalf of `conversation`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Execution`] when the executor fails or reports
    /// `success: false`. The reason is the remote message, a timeout or HTTP
    /// description, or the default message when the executor was unreachable.
    pub async fn invoke(&self, conversation: &ConversationId, params: Value) -> ToolResult<Value> {
        let env = self.conversations.env(conversation);
        let identity = self.source.identity();

        match self.executor.execute(&self.source, params, &env).await {
            Ok(output) => {
                debug!(
                    tool = %identity,
                    %conversation,
                    execution_time_ms = output.execution_time_ms(),
                    "remote tool executed"
                );
                health::dispatch(Arc::clone(&self.health), HealthReport::success(identity));
                Ok(output.into_output())
            }
            Err(err) => {
                warn!(tool = %identity, %conversation, kind = err.kind(), ?err, "remote tool failed");
                let detail = err.to_string();
                // Network and configuration errors carry executor URLs.
                let reason = match err {
                    RemoteError::Application { message } => message,
                    RemoteError::Network { .. } | RemoteError::Configuration { .. } => {
                        DEFAULT_EXECUTION_ERROR.to_owned()
                    }
                    _ => detail.clone(),
                };
                health::dispatch(
                    Arc::clone(&self.health),
                    HealthReport::failure(identity, detail),
                );
                Err(ToolError::Execution { reason })
            }
        }
    }

    /// Binds the shared tool to a conversation.
    #[must_use]
    pub fn bind(self: &Arc<Self>, conversation: ConversationId) -> ConversationTool {
        ConversationTool {
            tool: Arc::clone(self),
            conversation,
        }
    }
}

/// Handle returned to the agent framework: a cached [`RemoteTool`] scoped to one
/// conversation.
#[derive(Clone, Debug)]
pub struct ConversationTool {
    tool: Arc<RemoteTool>,
    conversation: ConversationId,
}

impl ConversationTool {
    /// Returns the shared cached tool.
    #[must_use]
    pub fn remote(&self) -> &Arc<RemoteTool> {
        &self.tool
    }

    /// Returns the conversation this handle executes for.
    #[must_use]
    pub fn conversation(&self) -> &ConversationId {
        &self.conversation
    }
}

#[async_trait]
impl Tool for ConversationTool {
    fn definition(&self) -> &ToolDefinition {
        self.tool.definition()
    }

    async fn invoke(&self, input: Value) -> ToolResult<Value> {
        self.tool.invoke(&self.conversation, input).await
    }
}

/// Errors produced by tool loading input and invocation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// Tool request failed validation.
    #[error("invalid tool request: {reason}")]
    InvalidRequest {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Tool execution failed.
    #[error("{reason}")]
    Execution {
        /// Message returned by the remote executor, or a default.
        reason: String,
    },
}

impl ToolError {
    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }
}

impl From<tool_primitives::Error> for ToolError {
    fn from(value: tool_primitives::Error) -> Self {
        Self::InvalidRequest {
            reason: value.to_string(),
        }
    }
}
