use crate::domain::model::{
    CommandOutput, HealthReport, Hook, ImageRef, ServiceState, TransferStrategy,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Executes one external program with arguments and captures the result.
///
/// Every docker/compose/scp invocation goes through this port, so the
/// pipeline can be exercised without a container runtime. Implementations
/// decide where the command runs (local process, ssh to the target host).
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Run with `input` piped to the child's stdin. Used for secrets that
    /// must stay off the argv, e.g. `docker login --password-stdin`.
    async fn run_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        input: &str,
    ) -> Result<CommandOutput>;

    /// `user@host` destination for file copies to this runner's host, if remote.
    fn copy_target(&self) -> Option<String> {
        None
    }
}

/// Read-only view of the resolved deployment configuration.
pub trait DeploySettings: Send + Sync {
    fn pipeline_name(&self) -> &str;

    // build
    fn image_repository(&self) -> &str;
    fn image_tag(&self) -> Option<&str>;
    fn dockerfile(&self) -> &str;
    fn build_context(&self) -> &str;
    fn build_args(&self) -> Vec<(String, String)>;

    // transfer
    fn transfer_strategy(&self) -> TransferStrategy;
    fn registry_username(&self) -> Option<String>;
    fn registry_password(&self) -> Option<String>;

    // target host
    fn project_dir(&self) -> &str;
    fn compose_file(&self) -> &str;
    fn env_file(&self) -> &str;

    // activate / post-activate
    fn services(&self) -> &[String];
    fn hooks(&self) -> &[Hook];
    fn extra_environment(&self) -> Vec<(String, String)>;

    // verify
    fn health_url(&self) -> &str;
    fn health_timeout(&self) -> Duration;
    fn health_interval(&self) -> Duration;
}

/// The deployment pipeline: five sequential stages plus rollback.
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// The image reference this run deploys, resolved without side
    /// effects (used when the build stage is skipped).
    fn release_image(&self) -> ImageRef;

    /// Produce the release image. Returns the reference later stages use.
    async fn build(&self) -> Result<ImageRef>;

    /// Move the image to the target host.
    async fn transfer(&self, image: &ImageRef) -> Result<()>;

    /// Swap the compose stack onto the image. Returns the observed state
    /// of every declared service.
    async fn activate(&self, image: &ImageRef) -> Result<Vec<ServiceState>>;

    /// Run configured maintenance hooks against the running stack.
    async fn post_activate(&self) -> Result<()>;

    /// Probe the health endpoint until healthy or the deadline passes.
    async fn verify(&self) -> Result<HealthReport>;

    /// Re-activate a previous release.
    async fn rollback(&self, previous: &ImageRef) -> Result<()>;

    /// Tag that was live before the most recent activate, when known.
    fn previous_release(&self) -> Option<ImageRef>;
}
