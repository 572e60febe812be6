//! Health reporting for tool load and execution outcomes.
//!
//! Reports are telemetry: they are dispatched onto a detached task and a failed
//! report is only logged. Nothing here may change the result handed back to the
//! agent framework.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tool_primitives::ToolIdentity;
use tracing::{debug, warn};

/// Result alias for health reporting.
pub type HealthResult<T> = Result<T, HealthError>;

/// Failure to deliver a health report.
#[derive(Debug, Error)]
#[error("health report failed: {reason}")]
pub struct HealthError {
    reason: String,
}

impl HealthError {
    /// Creates an error from the supplied reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Returns the failure reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Outcome of one describe or execute call, in the shape the monitoring API expects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    package_name: String,
    export_name: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl HealthReport {
    /// Records a successful call.
    #[must_use]
    pub fn success(identity: &ToolIdentity) -> Self {
        Self {
            package_name: identity.package_name().to_owned(),
            export_name: identity.export_name().to_owned(),
            success: true,
            error: None,
        }
    }

    /// Records a failed call with its error message.
    #[must_use]
    pub fn failure(identity: &ToolIdentity, error: impl Into<String>) -> Self {
        Self {
            package_name: identity.package_name().to_owned(),
            export_name: identity.export_name().to_owned(),
            success: false,
            error: Some(error.into()),
        }
    }

    /// Returns the package name.
    #[must_use]
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Returns the export name.
    #[must_use]
    pub fn export_name(&self) -> &str {
        &self.export_name
    }

    /// Returns `true` for a success report.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Returns the error message attached to a failure report.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Destination for health reports.
#[async_trait]
pub trait HealthReporter: Send + Sync {
    /// Delivers a single report.
    async fn report(&self, report: &HealthReport) -> HealthResult<()>;
}

/// Reporter that drops every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHealthReporter;

#[async_trait]
impl HealthReporter for NoopHealthReporter {
    async fn report(&self, _report: &HealthReport) -> HealthResult<()> {
        Ok(())
    }
}

/// Sends a report on a detached task.
///
/// Callers normally drop the returned handle; it is exposed so tests can wait for
/// delivery. Delivery failures are logged by the spawned task itself.
pub fn dispatch(reporter: Arc<dyn HealthReporter>, report: HealthReport) -> JoinHandle<()> {
    tokio::spawn(async move {
        match reporter.report(&report).await {
            Ok(()) => debug!(
                package = report.package_name(),
                export = report.export_name(),
                success = report.is_success(),
                "health report delivered"
            ),
            Err(err) => warn!(
                package = report.package_name(),
                export = report.export_name(),
                ?err,
                "health report dropped"
            ),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingReporter {
        reports: Mutex<Vec<HealthReport>>,
        fail: bool,
    }

    #[async_trait]
    impl HealthReporter for RecordingReporter {
        async fn report(&self, report: &HealthReport) -> HealthResult<()> {
            self.reports.lock().unwrap().push(report.clone());
            if self.fail {
                Err(HealthError::new("monitoring offline"))
            } else {
                Ok(())
            }
        }
    }

    fn identity() -> ToolIdentity {
        ToolIdentity::new("@acme/search", "webSearch").unwrap()
    }

    #[test]
    fn failure_report_serializes_error() {
        let json = serde_json::to_value(HealthReport::failure(&identity(), "boom")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "packageName": "@acme/search",
                "exportName": "webSearch",
                "success": false,
                "error": "boom"
            })
        );
    }

    #[test]
    fn success_report_omits_error() {
        let json = serde_json::to_value(HealthReport::success(&identity())).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["success"], true);
    }

    #[tokio::test]
    async fn dispatch_delivers_report() {
        let reporter = Arc::new(RecordingReporter::default());
        dispatch(reporter.clone(), HealthReport::success(&identity()))
            .await
            .unwrap();
        assert_eq!(reporter.reports.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dispatch_swallows_reporter_failure() {
        let reporter = Arc::new(RecordingReporter {
            fail: true,
            ..RecordingReporter::default()
        });
        dispatch(reporter.clone(), HealthReport::failure(&identity(), "x"))
            .await
            .expect("reporter failure must not panic the task");
        assert_eq!(reporter.reports.lock().unwrap().len(), 1);
    }
}
