use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Command failed with status {status}: {command}\n{stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("Failed to spawn '{program}': {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Health request failed: {0}")]
    HealthRequest(#[from] reqwest::Error),

    #[error("Health check failed for {url}: {reason}")]
    HealthCheckFailed { url: String, reason: String },

    #[error("Service '{service}' is {state} after activation")]
    ServiceNotRunning { service: String, state: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Rollback unavailable: {reason}")]
    RollbackUnavailable { reason: String },
}

pub type Result<T> = std::result::Result<T, DeployError>;

/// Broad classification used for logging and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Execution,
    Health,
    System,
}

/// Severity drives the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Informational; the run still counts as successful.
    Low,
    /// Transient; retrying the deploy may succeed.
    Medium,
    /// The deploy failed and needs attention.
    High,
    /// Environment/system problem outside the deploy itself.
    Critical,
}

impl DeployError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DeployError::ConfigValidationError { .. }
            | DeployError::MissingConfigError { .. }
            | DeployError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            DeployError::CommandFailed { .. }
            | DeployError::ServiceNotRunning { .. }
            | DeployError::RollbackUnavailable { .. } => ErrorCategory::Execution,
            DeployError::HealthRequest(_) | DeployError::HealthCheckFailed { .. } => {
                ErrorCategory::Health
            }
            DeployError::CommandSpawn { .. }
            | DeployError::IoError(_)
            | DeployError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DeployError::HealthRequest(_) => ErrorSeverity::Medium,
            DeployError::CommandFailed { .. }
            | DeployError::HealthCheckFailed { .. }
            | DeployError::ServiceNotRunning { .. }
            | DeployError::RollbackUnavailable { .. }
            | DeployError::ConfigValidationError { .. }
            | DeployError::MissingConfigError { .. }
            | DeployError::InvalidConfigValueError { .. } => ErrorSeverity::High,
            DeployError::CommandSpawn { .. }
            | DeployError::IoError(_)
            | DeployError::SerializationError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            DeployError::CommandFailed { command, .. } => format!(
                "Run `{}` by hand on the affected host and inspect its output",
                command
            ),
            DeployError::CommandSpawn { program, .. } => {
                format!("Check that '{}' is installed and on PATH", program)
            }
            DeployError::HealthRequest(_) => {
                "Check that the application port is exposed and reachable from here".to_string()
            }
            DeployError::HealthCheckFailed { .. } => {
                "Inspect `docker compose logs` on the target; consider --rollback-on-failure"
                    .to_string()
            }
            DeployError::ServiceNotRunning { service, .. } => format!(
                "Inspect `docker compose logs {}` on the target host",
                service
            ),
            DeployError::ConfigValidationError { field, .. }
            | DeployError::MissingConfigError { field }
            | DeployError::InvalidConfigValueError { field, .. } => {
                format!("Fix '{}' in the deploy manifest or CLI flags", field)
            }
            DeployError::RollbackUnavailable { .. } => {
                "Pass --rollback-to <tag> with a known-good release tag".to_string()
            }
            DeployError::IoError(_) => "Check file paths and permissions".to_string(),
            DeployError::SerializationError(_) => {
                "The tool emitted output this version cannot parse; check docker/compose versions"
                    .to_string()
            }
        }
    }

    /// One-line message for end users, without source chains.
    pub fn user_friendly_message(&self) -> String {
        match self {
            DeployError::CommandFailed {
                command, status, ..
            } => format!("Deployment command failed (exit {}): {}", status, command),
            DeployError::HealthCheckFailed { url, reason } => {
                format!("Application failed its health check at {}: {}", url, reason)
            }
            DeployError::ServiceNotRunning { service, state } => {
                format!("Service '{}' did not come up (state: {})", service, state)
            }
            other => other.to_string(),
        }
    }
}
