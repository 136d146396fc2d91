use crate::domain::model::CommandOutput;
use crate::domain::ports::CommandRunner;
use crate::utils::error::{DeployError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Runs commands as local child processes on the build host.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        tracing::debug!("exec: {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| DeployError::CommandSpawn {
                program: program.to_string(),
                source: e,
            })?;

        // A killed-by-signal child has no exit code; treat it as failure.
        let status = output.status.code().unwrap_or(-1);

        Ok(CommandOutput {
            status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn run_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        input: &str,
    ) -> Result<CommandOutput> {
        tracing::debug!("exec (piped stdin): {} {}", program, args.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DeployError::CommandSpawn {
                program: program.to_string(),
                source: e,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes()).await?;
            // Dropped here so the child sees EOF.
        }

        let output = child.wait_with_output().await?;
        let status = output.status.code().unwrap_or(-1);

        Ok(CommandOutput {
            status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout_and_status() {
        let runner = ProcessRunner::new();
        let output = runner.run("echo", &["hello"]).await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_reported_not_erred() {
        // Exit statuses propagate as data; callers decide what fails.
        let runner = ProcessRunner::new();
        let output = runner.run("false", &[]).await.unwrap();
        assert!(!output.success());
        assert_eq!(output.status, 1);
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let runner = ProcessRunner::new();
        let result = runner.run("definitely-not-a-real-binary-xyz", &[]).await;
        assert!(matches!(result, Err(DeployError::CommandSpawn { .. })));
    }

    #[tokio::test]
    async fn test_stdin_is_piped_to_the_child() {
        let runner = ProcessRunner::new();
        let output = runner.run_with_stdin("cat", &[], "hello stdin").await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "hello stdin");
    }

    #[test]
    fn test_no_copy_target_for_local_runner() {
        assert!(ProcessRunner::new().copy_target().is_none());
    }
}
