//! Batch loading of remote tools for a conversation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use tool_adapters::executor::HttpToolExecutor;
use tool_adapters::health::HttpHealthReporter;
use tool_adapters::traits::{Descriptor, RemoteResult, ToolExecutor, ToolSource};
use tool_config::LoaderConfig;
use tool_primitives::{ConversationId, Env, ToolIdentity, ToolKey};
use tool_telemetry::health::{self, HealthReport, HealthReporter};
use tracing::{debug, info, warn};

use crate::cache::ToolCache;
use crate::conversation::ConversationStore;
use crate::factory::ToolFactory;
use crate::tool::{ConversationTool, RemoteTool, ToolResult};

/// One tool the caller wants available.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolRequest {
    identity: ToolIdentity,
    version: String,
    import_url: Option<String>,
}

impl ToolRequest {
    /// Requests `export_name` from `package_name` at `version`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ToolError::InvalidRequest`] if any part is blank.
    pub fn new(
        package_name: impl Into<String>,
        export_name: impl Into<String>,
        version: impl Into<String>,
    ) -> ToolResult<Self> {
        let identity = ToolIdentity::new(package_name, export_name)?;
        let version = version.into();
        if version.trim().is_empty() {
            return Err(crate::ToolError::InvalidRequest {
                reason: "tool version cannot be empty".into(),
            });
        }
        Ok(Self {
            identity,
            version,
            import_url: None,
        })
    }

    /// Overrides the module URL the executor imports.
    #[must_use]
    pub fn with_import_url(mut self, import_url: impl Into<String>) -> Self {
        self.import_url = Some(import_url.into());
        self
    }

    /// Returns the tool identity.
    #[must_use]
    pub fn identity(&self) -> &ToolIdentity {
        &self.identity
    }

    /// Returns the cache key.
    #[must_use]
    pub fn key(&self) -> ToolKey {
        self.identity.key()
    }

    /// Returns the requested version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the explicit import URL, if one was supplied.
    #[must_use]
    pub fn import_url(&self) -> Option<&str> {
        self.import_url.as_deref()
    }
}

/// Loads remote tools, caching one wrapper per identity for the life of the loader.
///
/// A failed load is never cached, so the next request for the same identity
/// describes it again from scratch.
pub struct ToolLoader {
    config: LoaderConfig,
    executor: Arc<dyn ToolExecutor>,
    health: Arc<dyn HealthReporter>,
    cache: ToolCache,
    conversations: Arc<ConversationStore>,
    factory: ToolFactory,
}

impl fmt::Debug for ToolLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolLoader")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .field("conversations", &self.conversations.conversation_count())
            .finish_non_exhaustive()
    }
}

impl ToolLoader {
    /// Creates a loader over the supplied executor and health reporter.
    #[must_use]
    pub fn new(
        config: LoaderConfig,
        executor: Arc<dyn ToolExecutor>,
        health: Arc<dyn HealthReporter>,
    ) -> Self {
        let conversations = Arc::new(ConversationStore::new());
        let factory = ToolFactory::new(
            Arc::clone(&executor),
            Arc::clone(&conversations),
            Arc::clone(&health),
        );
        Self {
            config,
            executor,
            health,
            cache: ToolCache::new(),
            conversations,
            factory,
        }
    }

    /// Creates a loader that talks HTTP to the configured executor and health API.
    ///
    /// # Errors
    ///
    /// Returns [`tool_adapters::traits::RemoteError::Configuration`] if either
    /// HTTP client cannot be constructed.
    pub fn from_config(config: LoaderConfig) -> RemoteResult<Self> {
        let executor = Arc::new(HttpToolExecutor::new(&config)?);
        let health = Arc::new(HttpHealthReporter::new(&config)?);
        Ok(Self::new(config, executor, health))
    }

    /// Returns the identity-keyed tool cache.
    #[must_use]
    pub fn cache(&self) -> &ToolCache {
        &self.cache
    }

    /// Returns the conversation state store.
    #[must_use]
    pub fn conversations(&self) -> &Arc<ConversationStore> {
        &self.conversations
    }

    /// Resolves a request into a source, deriving the import URL when absent.
    #[must_use]
    pub fn source_for(&self, request: &ToolRequest) -> ToolSource {
        let import_url = request.import_url().map_or_else(
            || {
                self.config
                    .default_import_url(request.identity().package_name(), request.version())
            },
            str::to_owned,
        );
        ToolSource::new(request.identity().clone(), request.version(), import_url)
    }

    /// Asks the executor to import and describe a tool.
    ///
    /// Failures are logged and reported to the health API on a detached task
    /// before being returned.
    ///
    /// # Errors
    ///
    /// Returns the executor's [`tool_adapters::traits::RemoteError`] unchanged.
    pub async fn describe(&self, source: &ToolSource, env: &Env) -> RemoteResult<Descriptor> {
        let result = self.executor.describe(source, env).await;
        if let Err(err) = &result {
            warn!(tool = %source, kind = err.kind(), %err, "tool describe failed");
            health::dispatch(
                Arc::clone(&self.health),
                HealthReport::failure(source.identity(), err.to_string()),
            );
        }
        result
    }

    /// Returns the cached wrapper for an identity without loading it.
    #[must_use]
    pub fn cached(&self, identity: &ToolIdentity) -> Option<Arc<RemoteTool>> {
        self.cache.get(&identity.key())
    }

    /// Loads one tool for a conversation, returning `None` when it fails to load.
    pub async fn load(
        &self,
        request: &ToolRequest,
        conversation: &ConversationId,
    ) -> Option<ConversationTool> {
        let key = request.key();
        if let Some(tool) = self.cache.get(&key) {
            debug!(tool = %key, "tool cache hit");
            return Some(tool.bind(conversation.clone()));
        }

        let source = self.source_for(request);
        let env = self.conversations.env(conversation);
        let descriptor = self.describe(&source, &env).await.ok()?;

        let tool = self
            .cache
            .get_or_insert(key.clone(), self.factory.create(source, descriptor));
        debug!(tool = %key, "tool cached");
        Some(tool.bind(conversation.clone()))
    }

    /// Loads every requested tool concurrently.
    ///
    /// When `env` is supplied it replaces the conversation's environment before any
    /// describe call. The result holds only the tools that loaded; a requested key
    /// missing from it failed to load.
    pub async fn load_batch(
        &self,
        requests: &[ToolRequest],
        conversation: &ConversationId,
        env: Option<Env>,
    ) -> HashMap<ToolKey, ConversationTool> {
        if let Some(env) = env {
            self.conversations.set_env(conversation, env);
        }

        let results = join_all(requests.iter().map(|request| async move {
            (request.key(), self.load(request, conversation).await)
        }))
        .await;

        let mut loaded = HashMap::with_capacity(results.len());
        let mut failed = Vec::new();
        for (key, tool) in results {
            match tool {
                Some(tool) => {
                    loaded.insert(key, tool);
                }
                None => failed.push(key),
            }
        }

        for key in &failed {
            warn!(tool = %key, %conversation, "tool unavailable for conversation");
        }
        info!(
            %conversation,
            requested = requests.len(),
            loaded = loaded.len(),
            failed = failed.len(),
            "tool batch loaded"
        );

        loaded
    }

    /// Forgets a finished conversation's tool keys and environment.
    ///
    /// Cached tools are shared across conversations and stay loaded.
    pub fn end_conversation(&self, conversation: &ConversationId) {
        self.conversations.clear(conversation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tool_adapters::traits::RemoteError;

    use crate::test_support::{FakeExecutor, RecordingReporter};
    use crate::tool::{Tool, ToolError};

    fn loader(executor: Arc<FakeExecutor>, health: Arc<RecordingReporter>) -> ToolLoader {
        ToolLoader::new(LoaderConfig::default(), executor, health)
    }

    fn conversation(id: &str) -> ConversationId {
        ConversationId::new(id).unwrap()
    }

    fn request(package: &str, export: &str) -> ToolRequest {
        ToolRequest::new(package, export, "1.0.0").unwrap()
    }

    #[test]
    fn request_validation() {
        assert!(ToolRequest::new("@acme/search", "webSearch", " ").is_err());
        assert!(matches!(
            ToolRequest::new("", "webSearch", "1.0.0"),
            Err(ToolError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn source_defaults_import_url() {
        let loader = loader(FakeExecutor::new(), RecordingReporter::new());
        let source = loader.source_for(&request("@acme/search", "webSearch"));
        assert_eq!(source.import_url(), "https://esm.sh/@acme/search@1.0.0");

        let explicit = request("@acme/search", "webSearch").with_import_url("https://cdn/x.js");
        assert_eq!(loader.source_for(&explicit).import_url(), "https://cdn/x.js");
    }

    #[tokio::test]
    async fn second_load_hits_cache_with_same_reference() {
        let executor = FakeExecutor::new();
        let loader = loader(executor.clone(), RecordingReporter::new());
        let c1 = conversation("c1");

        let first = loader
            .load(&request("@acme/search", "webSearch"), &c1)
            .await
            .unwrap();
        let second = loader
            .load(
                &ToolRequest::new("@acme/search", "webSearch", "2.0.0").unwrap(),
                &c1,
            )
            .await
            .unwrap();

        assert_eq!(executor.describe_calls(), 1);
        assert!(Arc::ptr_eq(first.remote(), second.remote()));
        assert_eq!(second.remote().source().version(), "1.0.0");
    }

    #[tokio::test]
    async fn batch_isolates_failures() {
        let executor = FakeExecutor::new();
        executor.fail_describe("@acme/broken");
        let health = RecordingReporter::new();
        let loader = loader(executor.clone(), health.clone());

        let requests = [
            request("@acme/search", "webSearch"),
            request("@acme/broken", "explode"),
            request("@acme/math", "add"),
        ];
        let loaded = loader
            .load_batch(&requests, &conversation("c1"), None)
            .await;

        assert_eq!(loaded.len(), 2);
        assert!(loaded.contains_key(&requests[0].key()));
        assert!(!loaded.contains_key(&requests[1].key()));
        assert!(loaded.contains_key(&requests[2].key()));

        let reports = health.wait_for(1).await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].package_name(), "@acme/broken");
        assert!(!reports[0].is_success());
    }

    #[tokio::test]
    async fn failed_loads_are_retried() {
        let executor = FakeExecutor::new();
        executor.fail_describe("@acme/flaky");
        let loader = loader(executor.clone(), RecordingReporter::new());
        let c1 = conversation("c1");
        let flaky = request("@acme/flaky", "run");

        assert!(loader.load(&flaky, &c1).await.is_none());
        assert!(loader.cached(flaky.identity()).is_none());

        executor.heal_describe("@acme/flaky");
        assert!(loader.load(&flaky, &c1).await.is_some());
        assert_eq!(executor.describe_calls(), 2);
    }

    #[tokio::test]
    async fn cached_tool_serves_each_conversation_its_own_env() {
        let executor = FakeExecutor::new();
        let loader = loader(executor.clone(), RecordingReporter::new());
        let (c1, c2) = (conversation("c1"), conversation("c2"));
        let search = [request("@acme/search", "webSearch")];

        let for_c1 = loader
            .load_batch(&search, &c1, Some(Env::from([("KEY".into(), "one".into())])))
            .await;
        let for_c2 = loader
            .load_batch(&search, &c2, Some(Env::from([("KEY".into(), "two".into())])))
            .await;

        let key = search[0].key();
        for_c2[&key].invoke(json!({})).await.unwrap();
        for_c1[&key].invoke(json!({})).await.unwrap();

        let envs = executor.executed_envs();
        assert_eq!(envs[0]["KEY"], "two");
        assert_eq!(envs[1]["KEY"], "one");
        assert_eq!(executor.describe_calls(), 1);
    }

    #[tokio::test]
    async fn execution_failure_surfaces_remote_message() {
        let executor = FakeExecutor::new();
        executor.fail_execute(RemoteError::Application {
            message: "rate limited".into(),
        });
        let health = RecordingReporter::new();
        let loader = loader(executor, health.clone());
        let tool = loader
            .load(&request("@acme/search", "webSearch"), &conversation("c1"))
            .await
            .unwrap();

        let err = tool.invoke(json!({})).await.unwrap_err();
        assert_eq!(err, ToolError::execution("rate limited"));

        let reports = health.wait_for(1).await;
        assert_eq!(reports[0].error(), Some("rate limited"));
    }

    #[tokio::test]
    async fn successful_invoke_reports_success() {
        let health = RecordingReporter::new();
        let loader = loader(FakeExecutor::new(), health.clone());
        let tool = loader
            .load(&request("@acme/search", "webSearch"), &conversation("c1"))
            .await
            .unwrap();

        tool.invoke(json!({"query": "ai news"})).await.unwrap();

        let reports = health.wait_for(1).await;
        assert_eq!(reports.len(), 1);
        assert!(reports[0].is_success());
        assert_eq!(reports[0].package_name(), "@acme/search");
        assert_eq!(reports[0].error(), None);
    }

    #[tokio::test]
    async fn unreachable_executor_hides_internal_address() {
        let executor = FakeExecutor::new();
        executor.fail_execute(RemoteError::network(
            "request to http://10.0.0.7:3001/execute-tool failed: connection refused",
        ));
        let health = RecordingReporter::new();
        let loader = loader(executor, health.clone());
        let tool = loader
            .load(&request("@acme/search", "webSearch"), &conversation("c1"))
            .await
            .unwrap();

        let err = tool.invoke(json!({})).await.unwrap_err();
        assert_eq!(err, ToolError::execution("Tool execution failed"));

        let reports = health.wait_for(1).await;
        assert!(reports[0].error().is_some_and(|e| e.contains("10.0.0.7")));
    }

    #[tokio::test]
    async fn offline_health_reporter_does_not_affect_output() {
        let loader = loader(FakeExecutor::new(), RecordingReporter::offline());
        let tool = loader
            .load(&request("@acme/search", "webSearch"), &conversation("c1"))
            .await
            .unwrap();

        let output = tool.invoke(json!({"query": "ai news"})).await.unwrap();
        assert_eq!(output, json!({"echo": {"query": "ai news"}}));
    }

    #[tokio::test]
    async fn ending_a_conversation_keeps_the_cache() {
        let loader = loader(FakeExecutor::new(), RecordingReporter::new());
        let c1 = conversation("c1");
        let search = request("@acme/search", "webSearch");

        loader
            .load_batch(
                std::slice::from_ref(&search),
                &c1,
                Some(Env::from([("KEY".into(), "one".into())])),
            )
            .await;
        loader
            .conversations()
            .add_tool_keys(&c1, [search.key()]);

        loader.end_conversation(&c1);

        assert!(loader.conversations().tool_keys(&c1).is_empty());
        assert!(loader.conversations().env(&c1).is_empty());
        assert!(loader.cached(search.identity()).is_some());
    }
}
