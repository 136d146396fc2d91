use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// A container image coordinate, the unit the pipeline builds, moves and
/// activates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub repository: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// Captured result of one external tool invocation. Exit status is kept
/// verbatim: failure semantics are whatever the tool reports.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Container lifecycle state as reported by `docker compose ps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Running,
    Exited,
    Restarting,
    Created,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ServiceStatus::Running => "running",
            ServiceStatus::Exited => "exited",
            ServiceStatus::Restarting => "restarting",
            ServiceStatus::Created => "created",
            ServiceStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One compose service and its observed state after activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceState {
    pub name: String,
    pub state: ServiceStatus,
    /// Human-readable status line, e.g. "Up 3 seconds (healthy)".
    #[serde(default)]
    pub status: String,
}

/// Result of one named sub-check inside the health endpoint body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// JSON body of `GET /health`: overall status plus named sub-checks
/// (database, cache, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub checks: HashMap<String, CheckStatus>,
}

impl HealthReport {
    /// Healthy means the overall status is "ok" and no sub-check reports
    /// anything else.
    pub fn healthy(&self) -> bool {
        self.status == "ok" && self.checks.values().all(CheckStatus::is_ok)
    }

    /// Names of sub-checks that are not "ok", sorted for stable output.
    pub fn failing_checks(&self) -> Vec<String> {
        let mut failing: Vec<String> = self
            .checks
            .iter()
            .filter(|(_, check)| !check.is_ok())
            .map(|(name, _)| name.clone())
            .collect();
        failing.sort();
        failing
    }
}

/// How the built image reaches the target host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStrategy {
    /// Push to a registry on the build host, pull on the target.
    #[default]
    Registry,
    /// `docker save`, copy the tarball over, `docker load` on the target.
    Archive,
}

/// One post-activation maintenance command, run inside a service
/// container. The command itself is opaque to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hook {
    pub service: String,
    pub run: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Build,
    Transfer,
    Activate,
    PostActivate,
    Verify,
    Rollback,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Build => "build",
            Stage::Transfer => "transfer",
            Stage::Activate => "activate",
            Stage::PostActivate => "post_activate",
            Stage::Verify => "verify",
            Stage::Rollback => "rollback",
        };
        f.write_str(s)
    }
}

/// Timing and summary for one completed stage.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: Stage,
    pub duration: Duration,
    pub detail: String,
}

/// The record assembled over one engine run.
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub pipeline: String,
    pub image: ImageRef,
    pub started_at: DateTime<Utc>,
    pub stages: Vec<StageReport>,
}

impl DeployReport {
    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }
}
