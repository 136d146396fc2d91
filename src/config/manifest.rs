use crate::domain::model::{Hook, TransferStrategy};
use crate::domain::ports::DeploySettings;
use crate::utils::error::{DeployError, Result};
use crate::utils::validation::{
    self, validate_path, validate_positive_number, validate_required_field,
    validate_service_name, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployManifest {
    pub pipeline: PipelineConfig,
    pub build: BuildConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    pub target: TargetConfig,
    pub activate: ActivateConfig,
    pub post_activate: Option<PostActivateConfig>,
    pub health: HealthConfig,
    pub rollback: Option<RollbackConfig>,
    pub environment: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Image repository, e.g. "registry.example.com/shop/app".
    pub image: String,
    /// Release tag; a UTC timestamp is generated when unset.
    pub tag: Option<String>,
    pub dockerfile: Option<String>,
    pub context: Option<String>,
    pub args: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferConfig {
    #[serde(default)]
    pub strategy: TransferStrategy,
    /// Env var names holding registry credentials for the target-side
    /// `docker login`. Both must be set for login to run.
    pub username_env: Option<String>,
    pub password_env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Deploy host. Unset means the build host is the target.
    pub host: Option<String>,
    pub user: Option<String>,
    pub ssh_key: Option<String>,
    pub port: Option<u16>,
    pub project_dir: String,
    pub compose_file: Option<String>,
    pub env_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateConfig {
    /// Services that must reach running state after `up -d`.
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostActivateConfig {
    #[serde(default)]
    pub hooks: Vec<Hook>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    pub url: String,
    pub timeout_seconds: Option<u64>,
    pub interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackConfig {
    pub enabled: bool,
}

impl DeployManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DeployError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| DeployError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR}` references with values from the process
    /// environment (CI secrets arrive this way). Unset variables are left
    /// verbatim so validation can point at them.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").expect("static pattern");

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn rollback_enabled(&self) -> bool {
        self.rollback.as_ref().map(|r| r.enabled).unwrap_or(false)
    }

    fn env_from(var: &Option<String>) -> Option<String> {
        var.as_ref().and_then(|name| std::env::var(name).ok())
    }
}

impl Validate for DeployManifest {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;
        validation::validate_non_empty_string("build.image", &self.build.image)?;
        validate_path("target.project_dir", &self.target.project_dir)?;
        validate_path("target.compose_file", self.compose_file())?;
        validate_path("target.env_file", self.env_file())?;

        validate_url("health.url", &self.health.url)?;
        let timeout = self.health.timeout_seconds.unwrap_or(60);
        let interval = self.health.interval_seconds.unwrap_or(2);
        validate_positive_number("health.timeout_seconds", timeout, 1)?;
        validate_positive_number("health.interval_seconds", interval, 1)?;
        if interval > timeout {
            return Err(DeployError::InvalidConfigValueError {
                field: "health.interval_seconds".to_string(),
                value: interval.to_string(),
                reason: format!("Interval exceeds the {}s probe window", timeout),
            });
        }

        if self.activate.services.is_empty() {
            return Err(DeployError::MissingConfigError {
                field: "activate.services".to_string(),
            });
        }
        for service in &self.activate.services {
            validate_service_name("activate.services", service)?;
        }

        if let Some(post) = &self.post_activate {
            for hook in &post.hooks {
                validate_service_name("post_activate.hooks.service", &hook.service)?;
                if hook.run.is_empty() {
                    return Err(DeployError::MissingConfigError {
                        field: "post_activate.hooks.run".to_string(),
                    });
                }
            }
        }

        if self.target.host.is_some() {
            validate_required_field("target.user", &self.target.user)?;
        }

        // Registry pulls on a remote target need a registry-qualified
        // image name, i.e. a host component before the first slash.
        if self.target.host.is_some()
            && self.transfer.strategy == TransferStrategy::Registry
            && !self
                .build
                .image
                .split('/')
                .next()
                .is_some_and(|part| part.contains('.') || part.contains(':'))
        {
            return Err(DeployError::InvalidConfigValueError {
                field: "build.image".to_string(),
                value: self.build.image.clone(),
                reason: "Registry transfer to a remote host needs a registry-qualified image \
                         (e.g. registry.example.com/app)"
                    .to_string(),
            });
        }

        Ok(())
    }
}

impl DeploySettings for DeployManifest {
    fn pipeline_name(&self) -> &str {
        &self.pipeline.name
    }

    fn image_repository(&self) -> &str {
        &self.build.image
    }

    fn image_tag(&self) -> Option<&str> {
        self.build.tag.as_deref()
    }

    fn dockerfile(&self) -> &str {
        self.build.dockerfile.as_deref().unwrap_or("Dockerfile")
    }

    fn build_context(&self) -> &str {
        self.build.context.as_deref().unwrap_or(".")
    }

    fn build_args(&self) -> Vec<(String, String)> {
        let mut args: Vec<(String, String)> = self
            .build
            .args
            .as_ref()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        args.sort();
        args
    }

    fn transfer_strategy(&self) -> TransferStrategy {
        self.transfer.strategy
    }

    fn registry_username(&self) -> Option<String> {
        Self::env_from(&self.transfer.username_env)
    }

    fn registry_password(&self) -> Option<String> {
        Self::env_from(&self.transfer.password_env)
    }

    fn project_dir(&self) -> &str {
        &self.target.project_dir
    }

    fn compose_file(&self) -> &str {
        self.target
            .compose_file
            .as_deref()
            .unwrap_or("docker-compose.yml")
    }

    fn env_file(&self) -> &str {
        self.target.env_file.as_deref().unwrap_or(".env")
    }

    fn services(&self) -> &[String] {
        &self.activate.services
    }

    fn hooks(&self) -> &[Hook] {
        self.post_activate
            .as_ref()
            .map(|p| p.hooks.as_slice())
            .unwrap_or(&[])
    }

    fn extra_environment(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .environment
            .as_ref()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        pairs.sort();
        pairs
    }

    fn health_url(&self) -> &str {
        &self.health.url
    }

    fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health.timeout_seconds.unwrap_or(60))
    }

    fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health.interval_seconds.unwrap_or(2))
    }
}
