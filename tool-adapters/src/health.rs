//! HTTP delivery of tool health reports.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use hyper::Uri;
use tool_config::LoaderConfig;
use tool_telemetry::health::{HealthError, HealthReport, HealthReporter, HealthResult};

use crate::http_client::{HyperClient, endpoint, https_client, post_json};
use crate::traits::RemoteResult;

const REPORT_PATH: &str = "api/tools/report-health";

/// Posts health reports to the monitoring API.
pub struct HttpHealthReporter {
    client: HyperClient,
    endpoint: Uri,
    timeout: Duration,
}

impl fmt::Debug for HttpHealthReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpHealthReporter")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpHealthReporter {
    /// Constructs a reporter targeting the configured health API.
    ///
    /// # Errors
    ///
    /// Returns [`crate::traits::RemoteError::Configuration`] if the endpoint is
    /// invalid.
    pub fn new(config: &LoaderConfig) -> RemoteResult<Self> {
        Ok(Self {
            client: https_client(),
            endpoint: endpoint(config.health_base_url(), REPORT_PATH)?,
            timeout: config.health_timeout(),
        })
    }
}

#[async_trait]
impl HealthReporter for HttpHealthReporter {
    async fn report(&self, report: &HealthReport) -> HealthResult<()> {
        let (status, bytes) = post_json(&self.client, &self.endpoint, report, self.timeout)
            .await
            .map_err(|err| HealthError::new(err.to_string()))?;

        if !status.is_success() {
            return Err(HealthError::new(format!(
                "health API returned {status}: {}",
                String::from_utf8_lossy(&bytes)
            )));
        }
        Ok(())
    }
}
