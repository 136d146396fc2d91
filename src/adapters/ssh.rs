use crate::domain::model::CommandOutput;
use crate::domain::ports::CommandRunner;
use crate::utils::error::Result;
use async_trait::async_trait;

use super::ProcessRunner;

/// Runs commands on the target host by wrapping them in an ssh
/// invocation. The ssh client itself runs through [`ProcessRunner`], so
/// exit statuses of the remote command propagate unchanged.
#[derive(Debug, Clone)]
pub struct SshRunner {
    host: String,
    user: String,
    key_path: Option<String>,
    port: Option<u16>,
    local: ProcessRunner,
}

impl SshRunner {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            key_path: None,
            port: None,
            local: ProcessRunner::new(),
        }
    }

    pub fn with_key(mut self, key_path: impl Into<String>) -> Self {
        self.key_path = Some(key_path.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Base ssh argv up to (not including) the remote command.
    fn ssh_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
        ];
        if let Some(key) = &self.key_path {
            args.push("-i".to_string());
            args.push(key.clone());
        }
        if let Some(port) = self.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        args.push(self.destination());
        args.push("--".to_string());
        args
    }

    /// POSIX single-quote escaping, so argv boundaries survive the remote
    /// shell.
    fn shell_quote(word: &str) -> String {
        if !word.is_empty()
            && word
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "-_./:=@".contains(c))
        {
            return word.to_string();
        }
        format!("'{}'", word.replace('\'', r#"'\''"#))
    }

    fn remote_command(program: &str, args: &[&str]) -> String {
        let mut words = Vec::with_capacity(args.len() + 1);
        words.push(Self::shell_quote(program));
        words.extend(args.iter().map(|a| Self::shell_quote(a)));
        words.join(" ")
    }
}

#[async_trait]
impl CommandRunner for SshRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let mut ssh_args = self.ssh_args();
        ssh_args.push(Self::remote_command(program, args));

        let arg_refs: Vec<&str> = ssh_args.iter().map(String::as_str).collect();
        self.local.run("ssh", &arg_refs).await
    }

    // ssh forwards its own stdin to the remote command, so piped input
    // never appears on any argv, local or remote.
    async fn run_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        input: &str,
    ) -> Result<CommandOutput> {
        let mut ssh_args = self.ssh_args();
        ssh_args.push(Self::remote_command(program, args));

        let arg_refs: Vec<&str> = ssh_args.iter().map(String::as_str).collect();
        self.local.run_with_stdin("ssh", &arg_refs, input).await
    }

    fn copy_target(&self) -> Option<String> {
        Some(self.destination())
    }
}
