pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{DeployManifest, EnvFile};

pub use adapters::{ProcessRunner, SshRunner};
pub use core::{engine::DeployEngine, pipeline::ComposePipeline};
pub use domain::model::ImageRef;
pub use utils::error::{DeployError, Result};
