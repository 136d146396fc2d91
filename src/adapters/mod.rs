// Adapters layer: concrete CommandRunner implementations for the hosts
// the pipeline talks to.

pub mod process;
pub mod ssh;

pub use process::ProcessRunner;
pub use ssh::SshRunner;
