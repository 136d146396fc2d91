use crate::config::manifest::{DeployManifest, RollbackConfig};
use clap::Parser;

/// Command-line surface. Flags override the manifest where both apply.
#[derive(Debug, Clone, Parser)]
#[command(name = "dockhand")]
#[command(about = "Sequential docker-compose deployment pipeline")]
pub struct CliConfig {
    /// Path to the deploy manifest
    #[arg(long, default_value = "deploy.toml")]
    pub manifest: String,

    /// Override the target env file path from the manifest
    #[arg(long)]
    pub env_file: Option<String>,

    /// Override the image repository
    #[arg(long)]
    pub image: Option<String>,

    /// Release tag to deploy (default: generated UTC timestamp)
    #[arg(long)]
    pub tag: Option<String>,

    /// Assume the image is already built
    #[arg(long)]
    pub skip_build: bool,

    /// Assume the image is already present on the target
    #[arg(long)]
    pub skip_transfer: bool,

    /// Re-activate the previous release if post-activation or the health
    /// check fails
    #[arg(long)]
    pub rollback_on_failure: bool,

    /// Roll back to the given tag instead of deploying
    #[arg(long, value_name = "TAG")]
    pub rollback_to: Option<String>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    /// Log process CPU/memory usage per stage
    #[arg(long)]
    pub monitor: bool,
}

impl CliConfig {
    /// Fold CLI overrides into a loaded manifest.
    pub fn apply_to(&self, manifest: &mut DeployManifest) {
        if let Some(image) = &self.image {
            manifest.build.image = image.clone();
        }
        if let Some(tag) = &self.tag {
            manifest.build.tag = Some(tag.clone());
        }
        if let Some(env_file) = &self.env_file {
            manifest.target.env_file = Some(env_file.clone());
        }
        if self.rollback_on_failure {
            manifest.rollback = Some(RollbackConfig { enabled: true });
        }
    }
}
