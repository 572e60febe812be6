//! Shared executor traits and data structures.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use thiserror::Error;
use tool_primitives::{Env, ToolIdentity};

/// Result alias used by executor adapters.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Failure reaching or interpreting the remote executor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Transport-level failure (connection refused, reset, DNS, body read).
    #[error("executor unreachable: {reason}")]
    Network {
        /// Additional context about the error.
        reason: String,
    },

    /// The call did not complete within its bounded wait.
    #[error("executor did not respond within {after:?}")]
    Timeout {
        /// The bound that was exceeded.
        after: Duration,
    },

    /// The executor answered with a non-2xx status.
    #[error("executor returned HTTP {status}: {body}")]
    Http {
        /// Response status code.
        status: u16,
        /// Raw response body text.
        body: String,
    },

    /// Well-formed response whose envelope reports `success: false`.
    #[error("{message}")]
    Application {
        /// Message supplied by the remote service.
        message: String,
    },

    /// 2xx response missing the fields the envelope requires.
    #[error("malformed executor response: {reason}")]
    Malformed {
        /// What was missing or undecodable.
        reason: String,
    },

    /// Endpoint URL or request could not be constructed.
    #[error("executor not configured: {reason}")]
    Configuration {
        /// Additional context for the failure.
        reason: String,
    },
}

impl RemoteError {
    /// Convenience constructor for transport failures.
    #[must_use]
    pub fn network(reason: impl Into<String>) -> Self {
        Self::Network {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for malformed responses.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for configuration issues.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Stable label for logs and monitoring.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::Timeout { .. } => "timeout",
            Self::Http { .. } => "http",
            Self::Application { .. } => "application",
            Self::Malformed { .. } => "malformed",
            Self::Configuration { .. } => "configuration",
        }
    }
}

/// Where a tool's code lives: identity, pinned version, and module URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolSource {
    identity: ToolIdentity,
    version: String,
    import_url: String,
}

impl ToolSource {
    /// Creates a source with an already resolved import URL.
    #[must_use]
    pub fn new(
        identity: ToolIdentity,
        version: impl Into<String>,
        import_url: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            version: version.into(),
            import_url: import_url.into(),
        }
    }

    /// Returns the tool identity.
    #[must_use]
    pub fn identity(&self) -> &ToolIdentity {
        &self.identity
    }

    /// Returns the requested package version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the module URL the executor imports.
    #[must_use]
    pub fn import_url(&self) -> &str {
        &self.import_url
    }

    pub(crate) fn describe_payload(&self, env: &Env) -> Value {
        json!({
            "packageName": self.identity.package_name(),
            "exportName": self.identity.export_name(),
            "version": self.version,
            "importUrl": self.import_url,
            "env": env,
        })
    }

    pub(crate) fn execute_payload(&self, params: Value, env: &Env) -> Value {
        json!({
            "packageName": self.identity.package_name(),
            "exportName": self.identity.export_name(),
            "version": self.version,
            "importUrl": self.import_url,
            "params": params,
            "env": env,
        })
    }
}

/// Description and parameter schema returned by a successful describe call.
#[derive(Clone, Debug, PartialEq)]
pub struct Descriptor {
    description: String,
    input_schema: Option<Value>,
}

impl Descriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(description: impl Into<String>, input_schema: Option<Value>) -> Self {
        Self {
            description: description.into(),
            input_schema,
        }
    }

    /// Human-readable tool description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// JSON Schema of the tool parameters, when the tool declares any.
    #[must_use]
    pub fn input_schema(&self) -> Option<&Value> {
        self.input_schema.as_ref()
    }

    /// Splits the descriptor into its parts.
    #[must_use]
    pub fn into_parts(self) -> (String, Option<Value>) {
        (self.description, self.input_schema)
    }
}

/// Successful execute response.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecuteOutput {
    output: Value,
    execution_time_ms: Option<u64>,
}

impl ExecuteOutput {
    /// Creates an execute output.
    #[must_use]
    pub fn new(output: Value, execution_time_ms: Option<u64>) -> Self {
        Self {
            output,
            execution_time_ms,
        }
    }

    /// Returns the tool output without consuming.
    #[must_use]
    pub fn output(&self) -> &Value {
        &self.output
    }

    /// Remote-reported execution time, in milliseconds.
    #[must_use]
    pub const fn execution_time_ms(&self) -> Option<u64> {
        self.execution_time_ms
    }

    /// Consumes the response and returns the tool output.
    #[must_use]
    pub fn into_output(self) -> Value {
        self.output
    }
}

/// Remote service that can describe and execute packaged tools.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Imports the tool and returns its description and schema.
    async fn describe(&self, source: &ToolSource, env: &Env) -> RemoteResult<Descriptor>;

    /// Runs the tool with the supplied parameters.
    async fn execute(
        &self,
        source: &ToolSource,
        params: Value,
        env: &Env,
    ) -> RemoteResult<ExecuteOutput>;
}

impl fmt::Display for ToolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.identity, self.version)
    }
}
