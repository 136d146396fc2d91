use crate::config::EnvFile;
use crate::core::health::HealthProbe;
use crate::domain::model::{
    CommandOutput, HealthReport, ImageRef, ServiceState, ServiceStatus, TransferStrategy,
};
use crate::domain::ports::{CommandRunner, DeploySettings, Pipeline};
use crate::utils::error::{DeployError, Result};
use serde::Deserialize;
use std::sync::{Arc, Mutex};

/// The deployment pipeline for a docker-compose stack.
///
/// Two runners: `build_host` executes locally where the Dockerfile lives,
/// `target` executes on the machine running the compose stack (over ssh
/// for remote targets, locally for single-host deploys).
pub struct ComposePipeline<C: DeploySettings> {
    build_host: Arc<dyn CommandRunner>,
    target: Arc<dyn CommandRunner>,
    config: C,
    probe: HealthProbe,
    previous: Mutex<Option<ImageRef>>,
}

/// One row of `docker compose ps --format json`. Compose emits either a
/// JSON array or one object per line depending on version; both field
/// spellings are accepted.
#[derive(Debug, Deserialize)]
struct PsEntry {
    #[serde(alias = "Service")]
    service: String,
    #[serde(alias = "State")]
    state: String,
    #[serde(alias = "Status", default)]
    status: String,
}

impl PsEntry {
    fn into_service_state(self) -> ServiceState {
        let state = match self.state.to_ascii_lowercase().as_str() {
            "running" => ServiceStatus::Running,
            "exited" | "dead" => ServiceStatus::Exited,
            "restarting" => ServiceStatus::Restarting,
            "created" => ServiceStatus::Created,
            _ => ServiceStatus::Unknown,
        };
        ServiceState {
            name: self.service,
            state,
            status: self.status,
        }
    }
}

impl<C: DeploySettings> ComposePipeline<C> {
    pub fn new(
        build_host: Arc<dyn CommandRunner>,
        target: Arc<dyn CommandRunner>,
        config: C,
    ) -> Self {
        let probe = HealthProbe::new(config.health_url());
        Self {
            build_host,
            target,
            config,
            probe,
            previous: Mutex::new(None),
        }
    }

    /// Run a command and turn a non-zero exit status into an error
    /// carrying the captured stderr.
    async fn run_ok(
        runner: &Arc<dyn CommandRunner>,
        program: &str,
        args: &[&str],
    ) -> Result<CommandOutput> {
        let output = runner.run(program, args).await?;
        if !output.success() {
            return Err(DeployError::CommandFailed {
                command: format!("{} {}", program, args.join(" ")),
                status: output.status,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }

    fn env_file_path(&self) -> String {
        format!(
            "{}/{}",
            self.config.project_dir().trim_end_matches('/'),
            self.config.env_file()
        )
    }

    fn compose_file_path(&self) -> String {
        format!(
            "{}/{}",
            self.config.project_dir().trim_end_matches('/'),
            self.config.compose_file()
        )
    }

    /// Common prefix of every `docker compose` invocation on the target.
    fn compose_prefix(&self) -> Vec<String> {
        vec![
            "compose".to_string(),
            "--project-directory".to_string(),
            self.config.project_dir().to_string(),
            "-f".to_string(),
            self.compose_file_path(),
            "--env-file".to_string(),
            self.env_file_path(),
        ]
    }

    async fn compose(&self, rest: &[&str]) -> Result<CommandOutput> {
        let mut args = self.compose_prefix();
        args.extend(rest.iter().map(|s| s.to_string()));
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        Self::run_ok(&self.target, "docker", &arg_refs).await
    }

    /// Read the target env file, tolerating a missing file on first
    /// deploy.
    async fn read_target_env(&self) -> Result<EnvFile> {
        let path = self.env_file_path();
        let output = self.target.run("cat", &[&path]).await?;
        if output.success() {
            Ok(EnvFile::parse(&output.stdout))
        } else {
            tracing::warn!("No env file at {} yet, starting empty", path);
            Ok(EnvFile::default())
        }
    }

    async fn write_target_env(&self, env: &EnvFile) -> Result<()> {
        let path = self.env_file_path();
        // Single-quoted heredoc-free write; survives the ssh hop because
        // the whole -c argument is re-quoted by the runner.
        let script = format!(
            "printf '%s' '{}' > '{}'",
            env.render().replace('\'', r#"'\''"#),
            path
        );
        Self::run_ok(&self.target, "sh", &["-c", &script]).await?;
        Ok(())
    }

    fn sanitized_archive_path(image: &ImageRef) -> String {
        let name: String = format!("{}-{}", image.repository, image.tag)
            .chars()
            .map(|c| if c == '/' || c == ':' { '-' } else { c })
            .collect();
        format!("/tmp/{}.tar", name)
    }

    async fn transfer_via_registry(&self, image: &ImageRef) -> Result<()> {
        let image_str = image.to_string();
        Self::run_ok(&self.build_host, "docker", &["push", &image_str]).await?;

        if let (Some(user), Some(password)) = (
            self.config.registry_username(),
            self.config.registry_password(),
        ) {
            let registry = image
                .repository
                .split('/')
                .next()
                .unwrap_or(&image.repository)
                .to_string();
            tracing::debug!("Logging in to {} on the target host", registry);
            // The password travels over stdin, never on the argv.
            let output = self
                .target
                .run_with_stdin(
                    "docker",
                    &["login", &registry, "-u", &user, "--password-stdin"],
                    &password,
                )
                .await?;
            if !output.success() {
                return Err(DeployError::CommandFailed {
                    command: format!("docker login {}", registry),
                    status: output.status,
                    stderr: output.stderr,
                });
            }
        }

        Self::run_ok(&self.target, "docker", &["pull", &image_str]).await?;
        Ok(())
    }

    async fn transfer_via_archive(&self, image: &ImageRef) -> Result<()> {
        let image_str = image.to_string();
        let archive = Self::sanitized_archive_path(image);

        Self::run_ok(
            &self.build_host,
            "docker",
            &["save", "-o", &archive, &image_str],
        )
        .await?;

        let remote = self.target.copy_target();
        if let Some(destination) = &remote {
            let remote_spec = format!("{}:{}", destination, archive);
            Self::run_ok(&self.build_host, "scp", &[&archive, &remote_spec]).await?;
        }

        let load_result = Self::run_ok(&self.target, "docker", &["load", "-i", &archive]).await;

        // Tarballs are scratch space on both sides regardless of outcome.
        let _ = self.build_host.run("rm", &["-f", &archive]).await;
        if remote.is_some() {
            let _ = self.target.run("rm", &["-f", &archive]).await;
        }

        load_result.map(|_| ())
    }

    async fn service_states(&self) -> Result<Vec<ServiceState>> {
        let output = self.compose(&["ps", "--all", "--format", "json"]).await?;
        Self::parse_ps_output(&output.stdout)
    }

    fn parse_ps_output(stdout: &str) -> Result<Vec<ServiceState>> {
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        // Newer compose prints an array, older prints NDJSON.
        if let Ok(entries) = serde_json::from_str::<Vec<PsEntry>>(trimmed) {
            return Ok(entries.into_iter().map(PsEntry::into_service_state).collect());
        }

        let mut states = Vec::new();
        for line in trimmed.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let entry: PsEntry = serde_json::from_str(line)?;
            states.push(entry.into_service_state());
        }
        Ok(states)
    }

    /// Write the release tag (plus configured extras) into the target env
    /// file and re-create the stack on it.
    async fn activate_tag(&self, tag: &str) -> Result<()> {
        let mut env = self.read_target_env().await?;
        env.set("IMAGE_TAG", tag);
        env.set("IMAGE", self.config.image_repository());
        for (key, value) in self.config.extra_environment() {
            env.set(&key, &value);
        }
        self.write_target_env(&env).await?;

        self.compose(&["down", "--remove-orphans"]).await?;
        self.compose(&["up", "-d"]).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<C: DeploySettings> Pipeline for ComposePipeline<C> {
    fn release_image(&self) -> ImageRef {
        let tag = match self.config.image_tag() {
            Some(tag) => tag.to_string(),
            // Sortable release tag, one per deploy.
            None => chrono::Utc::now().format("%Y%m%d%H%M%S").to_string(),
        };
        ImageRef::new(self.config.image_repository(), tag)
    }

    async fn build(&self) -> Result<ImageRef> {
        let image = self.release_image();
        let image_str = image.to_string();

        let build_args: Vec<String> = self
            .config
            .build_args()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        let mut args: Vec<&str> = vec![
            "build",
            "-t",
            &image_str,
            "-f",
            self.config.dockerfile(),
        ];
        for pair in &build_args {
            args.push("--build-arg");
            args.push(pair);
        }
        args.push(self.config.build_context());

        Self::run_ok(&self.build_host, "docker", &args).await?;
        tracing::info!("Built image {}", image);
        Ok(image)
    }

    async fn transfer(&self, image: &ImageRef) -> Result<()> {
        match self.config.transfer_strategy() {
            TransferStrategy::Registry => self.transfer_via_registry(image).await,
            TransferStrategy::Archive => self.transfer_via_archive(image).await,
        }
    }

    async fn activate(&self, image: &ImageRef) -> Result<Vec<ServiceState>> {
        // Remember what was live, for rollback. An empty tag means this
        // is the first deploy.
        let env = self.read_target_env().await?;
        let previous = env
            .get("IMAGE_TAG")
            .filter(|tag| !tag.is_empty())
            .map(|tag| ImageRef::new(self.config.image_repository(), tag));
        if let Some(prev) = &previous {
            tracing::info!("Previous release: {}", prev);
        }
        *self.previous.lock().expect("previous-release lock") = previous;

        self.activate_tag(&image.tag).await?;

        let states = self.service_states().await?;
        for declared in self.config.services() {
            let found = states.iter().find(|s| &s.name == declared);
            match found {
                Some(state) if state.state == ServiceStatus::Running => {}
                Some(state) => {
                    return Err(DeployError::ServiceNotRunning {
                        service: declared.clone(),
                        state: state.state.to_string(),
                    });
                }
                None => {
                    return Err(DeployError::ServiceNotRunning {
                        service: declared.clone(),
                        state: "absent".to_string(),
                    });
                }
            }
        }

        Ok(states
            .into_iter()
            .filter(|s| self.config.services().contains(&s.name))
            .collect())
    }

    async fn post_activate(&self) -> Result<()> {
        for hook in self.config.hooks() {
            let label = hook
                .description
                .clone()
                .unwrap_or_else(|| hook.run.join(" "));
            tracing::info!("Running hook on '{}': {}", hook.service, label);

            let mut rest: Vec<&str> = vec!["exec", "-T", &hook.service];
            rest.extend(hook.run.iter().map(String::as_str));
            self.compose(&rest).await?;
        }
        Ok(())
    }

    async fn verify(&self) -> Result<HealthReport> {
        self.probe
            .wait_healthy(self.config.health_timeout(), self.config.health_interval())
            .await
    }

    async fn rollback(&self, previous: &ImageRef) -> Result<()> {
        tracing::warn!("Rolling back to {}", previous);
        self.activate_tag(&previous.tag).await?;
        let report = self
            .probe
            .wait_healthy(self.config.health_timeout(), self.config.health_interval())
            .await?;
        tracing::info!(
            "Rollback to {} verified healthy (status: {})",
            previous,
            report.status
        );
        Ok(())
    }

    fn previous_release(&self) -> Option<ImageRef> {
        self.previous.lock().expect("previous-release lock").clone()
    }
}
