#[cfg(feature = "cli")]
pub mod cli;
pub mod env_file;
pub mod manifest;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use env_file::EnvFile;
pub use manifest::DeployManifest;
