use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tool_adapters::traits::{
    Descriptor, ExecuteOutput, RemoteError, RemoteResult, ToolExecutor, ToolSource,
};
use tool_primitives::{Env, ToolIdentity};
use tool_telemetry::health::{
    HealthError, HealthReport, HealthReporter, HealthResult, NoopHealthReporter,
};

use crate::conversation::ConversationStore;
use crate::factory::ToolFactory;
use crate::tool::RemoteTool;

#[derive(Default)]
pub(crate) struct FakeExecutor {
    describe_calls: AtomicUsize,
    failing_packages: Mutex<HashSet<String>>,
    executed_envs: Mutex<Vec<Env>>,
    execute_error: Mutex<Option<RemoteError>>,
}

impl FakeExecutor {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn fail_describe(&self, package: &str) {
        self.failing_packages
            .lock()
            .unwrap()
            .insert(package.to_owned());
    }

    pub(crate) fn heal_describe(&self, package: &str) {
        self.failing_packages.lock().unwrap().remove(package);
    }

    pub(crate) fn fail_execute(&self, err: RemoteError) {
        *self.execute_error.lock().unwrap() = Some(err);
    }

    pub(crate) fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn executed_envs(&self) -> Vec<Env> {
        self.executed_envs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutor for FakeExecutor {
    async fn describe(&self, source: &ToolSource, _env: &Env) -> RemoteResult<Descriptor> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        let identity = source.identity();
        if self
            .failing_packages
            .lock()
            .unwrap()
            .contains(identity.package_name())
        {
            return Err(RemoteError::Http {
                status: 500,
                body: "boom".into(),
            });
        }
        Ok(Descriptor::new(
            format!("{} tool", identity.export_name()),
            Some(json!({"type": "object", "properties": {"query": {"type": "string"}}})),
        ))
    }

    async fn execute(
        &self,
        _source: &ToolSource,
        params: Value,
        env: &Env,
    ) -> RemoteResult<ExecuteOutput> {
        self.executed_envs.lock().unwrap().push(env.clone());
        if let Some(err) = self.execute_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(ExecuteOutput::new(json!({ "echo": params }), Some(1)))
    }
}

#[derive(Default)]
pub(crate) struct RecordingReporter {
    reports: Mutex<Vec<HealthReport>>,
    offline: AtomicBool,
}

impl RecordingReporter {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn offline() -> Arc<Self> {
        let reporter = Self::default();
        reporter.offline.store(true, Ordering::SeqCst);
        Arc::new(reporter)
    }

    pub(crate) fn reports(&self) -> Vec<HealthReport> {
        self.reports.lock().unwrap().clone()
    }

    /// Waits for detached report tasks to land.
    pub(crate) async fn wait_for(&self, count: usize) -> Vec<HealthReport> {
        for _ in 0..100 {
            if self.reports.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.reports()
    }
}

#[async_trait]
impl HealthReporter for RecordingReporter {
    async fn report(&self, report: &HealthReport) -> HealthResult<()> {
        self.reports.lock().unwrap().push(report.clone());
        if self.offline.load(Ordering::SeqCst) {
            return Err(HealthError::new("connection refused"));
        }
        Ok(())
    }
}

pub(crate) fn remote_tool(
    package: &str,
    export: &str,
    executor: Arc<FakeExecutor>,
) -> Arc<RemoteTool> {
    let factory = ToolFactory::new(
        executor,
        Arc::new(ConversationStore::new()),
        Arc::new(NoopHealthReporter),
    );
    let source = ToolSource::new(
        ToolIdentity::new(package, export).unwrap(),
        "1.0.0",
        format!("https://esm.sh/{package}@1.0.0"),
    );
    factory.create(source, Descriptor::new("test tool", None))
}
