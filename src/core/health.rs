use crate::domain::model::HealthReport;
use crate::utils::error::{DeployError, Result};
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Probes the application health endpoint after activation.
///
/// A release is healthy only when the endpoint answers HTTP 200 with a
/// JSON body whose overall status and every sub-check are "ok". A 200
/// with an unparseable body is a failure: the endpoint promises a JSON
/// contract, and a default web-server page must not pass for the
/// application.
pub struct HealthProbe {
    client: Client,
    url: String,
}

impl HealthProbe {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.into(),
        }
    }

    /// One probe. Errors distinguish unreachable endpoint, non-200
    /// status, malformed body and unhealthy report.
    pub async fn probe(&self) -> Result<HealthReport> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(DeployError::HealthCheckFailed {
                url: self.url.clone(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        let report: HealthReport =
            response
                .json()
                .await
                .map_err(|e| DeployError::HealthCheckFailed {
                    url: self.url.clone(),
                    reason: format!("Malformed health body: {}", e),
                })?;

        if !report.healthy() {
            let failing = report.failing_checks();
            let reason = if failing.is_empty() {
                format!("Status is '{}'", report.status)
            } else {
                format!("Failing checks: {}", failing.join(", "))
            };
            return Err(DeployError::HealthCheckFailed {
                url: self.url.clone(),
                reason,
            });
        }

        Ok(report)
    }

    /// Re-probe every `interval` until healthy or `timeout` has elapsed.
    /// Connection errors count as "still starting" inside the window.
    pub async fn wait_healthy(&self, timeout: Duration, interval: Duration) -> Result<HealthReport> {
        let start = Instant::now();
        let mut last_reason;

        loop {
            match self.probe().await {
                Ok(report) => return Ok(report),
                Err(e) => {
                    last_reason = match &e {
                        DeployError::HealthCheckFailed { reason, .. } => reason.clone(),
                        other => other.to_string(),
                    };
                    tracing::debug!("Health probe not ready: {}", last_reason);
                }
            }

            if start.elapsed() + interval > timeout {
                return Err(DeployError::HealthCheckFailed {
                    url: self.url.clone(),
                    reason: format!(
                        "Not healthy after {}s; last result: {}",
                        timeout.as_secs(),
                        last_reason
                    ),
                });
            }
            sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_probe_healthy() {
        let server = MockServer::start();
        let health_mock = server.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "status": "ok",
                    "checks": {
                        "database": {"status": "ok"},
                        "cache": {"status": "ok"}
                    }
                }));
        });

        let probe = HealthProbe::new(server.url("/health"));
        let report = probe.probe().await.unwrap();

        health_mock.assert();
        assert!(report.healthy());
        assert_eq!(report.checks.len(), 2);
    }

    #[tokio::test]
    async fn test_probe_rejects_non_200() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(503);
        });

        let probe = HealthProbe::new(server.url("/health"));
        let err = probe.probe().await.unwrap_err();
        match err {
            DeployError::HealthCheckFailed { reason, .. } => assert!(reason.contains("503")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_probe_rejects_non_json_200() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(200).body("<html>It works!</html>");
        });

        let probe = HealthProbe::new(server.url("/health"));
        let err = probe.probe().await.unwrap_err();
        match err {
            DeployError::HealthCheckFailed { reason, .. } => {
                assert!(reason.contains("Malformed health body"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_probe_reports_failing_subchecks() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(200).json_body(serde_json::json!({
                "status": "ok",
                "checks": {
                    "database": {"status": "error", "message": "timeout"},
                    "cache": {"status": "ok"}
                }
            }));
        });

        let probe = HealthProbe::new(server.url("/health"));
        let err = probe.probe().await.unwrap_err();
        match err {
            DeployError::HealthCheckFailed { reason, .. } => {
                assert!(reason.contains("database"));
                assert!(!reason.contains("cache"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_wait_healthy_returns_first_success() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(200)
                .json_body(serde_json::json!({"status": "ok", "checks": {}}));
        });

        let probe = HealthProbe::new(server.url("/health"));
        let report = probe
            .wait_healthy(Duration::from_secs(5), Duration::from_millis(50))
            .await
            .unwrap();
        assert!(report.healthy());
    }

    #[tokio::test]
    async fn test_wait_healthy_times_out_with_last_reason() {
        let server = MockServer::start();
        let health_mock = server.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(502);
        });

        let probe = HealthProbe::new(server.url("/health"));
        let err = probe
            .wait_healthy(Duration::from_millis(150), Duration::from_millis(50))
            .await
            .unwrap_err();

        match err {
            DeployError::HealthCheckFailed { reason, .. } => {
                assert!(reason.contains("Not healthy after"));
                assert!(reason.contains("502"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // The window allows more than one attempt.
        assert!(health_mock.hits() >= 2);
    }
}
