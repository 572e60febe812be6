//! HTTP client for the remote tool execution service.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use hyper::body::Bytes;
use hyper::{StatusCode, Uri};
use serde::Deserialize;
use serde_json::Value;
use tool_config::LoaderConfig;
use tool_primitives::Env;
use tracing::debug;

use crate::http_client::{HyperClient, endpoint, https_client, post_json};
use crate::traits::{
    Descriptor, ExecuteOutput, RemoteError, RemoteResult, ToolExecutor, ToolSource,
};

const DESCRIBE_PATH: &str = "load-and-describe";
const EXECUTE_PATH: &str = "execute-tool";

/// Message used when the executor reports a failed execution without saying why.
pub const DEFAULT_EXECUTION_ERROR: &str = "Tool execution failed";
const DEFAULT_DESCRIBE_ERROR: &str = "Tool load failed";

/// Executor adapter that talks to the sandbox service over HTTP/HTTPS.
pub struct HttpToolExecutor {
    client: HyperClient,
    describe_endpoint: Uri,
    execute_endpoint: Uri,
    describe_timeout: Duration,
    execute_timeout: Duration,
}

impl fmt::Debug for HttpToolExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpToolExecutor")
            .field("describe_endpoint", &self.describe_endpoint)
            .field("execute_endpoint", &self.execute_endpoint)
            .field("describe_timeout", &self.describe_timeout)
            .finish_non_exhaustive()
    }
}

impl HttpToolExecutor {
    /// Constructs a new executor client from the supplied configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Configuration`] if an endpoint is invalid.
    pub fn new(config: &LoaderConfig) -> RemoteResult<Self> {
        let base = config.executor_base_url();
        Ok(Self {
            client: https_client(),
            describe_endpoint: endpoint(base, DESCRIBE_PATH)?,
            execute_endpoint: endpoint(base, EXECUTE_PATH)?,
            describe_timeout: config.describe_timeout(),
            execute_timeout: config.execute_timeout(),
        })
    }
}

#[async_trait]
impl ToolExecutor for HttpToolExecutor {
    async fn describe(&self, source: &ToolSource, env: &Env) -> RemoteResult<Descriptor> {
        debug!(tool = %source, import_url = source.import_url(), "describing remote tool");
        let (status, bytes) = post_json(
            &self.client,
            &self.describe_endpoint,
            &source.describe_payload(env),
            self.describe_timeout,
        )
        .await?;
        parse_describe(status, &bytes)
    }

    async fn execute(
        &self,
        source: &ToolSource,
        params: Value,
        env: &Env,
    ) -> RemoteResult<ExecuteOutput> {
        let (status, bytes) = post_json(
            &self.client,
            &self.execute_endpoint,
            &source.execute_payload(params, env),
            self.execute_timeout,
        )
        .await?;
        parse_execute(status, &bytes)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    tool: Option<ToolPayload>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolPayload {
    #[serde(default)]
    description: String,
    #[serde(default)]
    input_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    execution_time_ms: Option<u64>,
    #[serde(default)]
    error: Option<Value>,
}

fn parse_describe(status: StatusCode, bytes: &Bytes) -> RemoteResult<Descriptor> {
    ensure_success(status, bytes)?;
    let envelope: DescribeEnvelope = serde_json::from_slice(bytes)
        .map_err(|err| RemoteError::malformed(format!("failed to decode describe response: {err}")))?;

    if envelope.success != Some(true) {
        return Err(RemoteError::Application {
            message: error_message(envelope.error, DEFAULT_DESCRIBE_ERROR),
        });
    }

    let tool = envelope
        .tool
        .ok_or_else(|| RemoteError::malformed("describe response missing `tool` payload"))?;
    let input_schema = tool.input_schema.filter(|schema| !schema.is_null());
    Ok(Descriptor::new(tool.description, input_schema))
}

fn parse_execute(status: StatusCode, bytes: &Bytes) -> RemoteResult<ExecuteOutput> {
    let decoded = serde_json::from_slice::<ExecuteEnvelope>(bytes);

    // Executors reject bad input with a 4xx carrying the usual `error` envelope.
    if !status.is_success() {
        return Err(match decoded {
            Ok(ExecuteEnvelope { error: Some(error), .. }) => RemoteError::Application {
                message: error_message(Some(error), DEFAULT_EXECUTION_ERROR),
            },
            _ => http_error(status, bytes),
        });
    }

    let envelope = decoded
        .map_err(|err| RemoteError::malformed(format!("failed to decode execute response: {err}")))?;

    if envelope.success != Some(true) {
        return Err(RemoteError::Application {
            message: error_message(envelope.error, DEFAULT_EXECUTION_ERROR),
        });
    }

    Ok(ExecuteOutput::new(
        envelope.output.unwrap_or(Value::Null),
        envelope.execution_time_ms,
    ))
}

fn ensure_success(status: StatusCode, bytes: &Bytes) -> RemoteResult<()> {
    if status.is_success() {
        return Ok(());
    }
    Err(http_error(status, bytes))
}

fn http_error(status: StatusCode, bytes: &Bytes) -> RemoteError {
    RemoteError::Http {
        status: status.as_u16(),
        body: String::from_utf8_lossy(bytes).into_owned(),
    }
}

// Executors send `error` either as a plain string or as a structured object.
fn error_message(error: Option<Value>, default: &str) -> String {
    match error {
        Some(Value::String(message)) if !message.trim().is_empty() => message,
        Some(Value::Object(map)) => map
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| Value::Object(map.clone()).to_string(), str::to_owned),
        _ => default.to_owned(),
    }
}
