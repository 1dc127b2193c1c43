use std::future::Future;
use std::process::Stdio;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, Error)]
pub enum RemoteExecError {
    #[error("failed to spawn '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs a command as a superuser on another host.
pub trait RemoteExecutor {
    fn run_privileged(
        &self,
        host: &str,
        user: &str,
        command: &[&str],
    ) -> impl Future<Output = Result<CommandOutput, RemoteExecError>> + Send;
}

#[derive(Clone, Debug, Default)]
pub struct SshExecutor {
    /// passed as `-o <option>`
    options: Vec<String>,
}

const SSH_PROGRAM: &str = "ssh";

impl SshExecutor {
    pub fn new(options: Vec<String>) -> Self {
        Self { options }
    }

    fn args(&self, host: &str, user: &str, command: &[&str]) -> Vec<String> {
        let mut args = Vec::with_capacity(self.options.len() * 2 + command.len() + 2);
        for option in &self.options {
            args.push("-o".to_owned());
            args.push(option.clone());
        }
        args.push(format!("{user}@{host}"));
        args.push("sudo".to_owned());
        args.extend(command.iter().map(|arg| arg.to_string()));
        args
    }
}

impl RemoteExecutor for SshExecutor {
    async fn run_privileged(
        &self,
        host: &str,
        user: &str,
        command: &[&str],
    ) -> Result<CommandOutput, RemoteExecError> {
        let args = self.args(host, user, command);
        debug!("Executing: {} {}", SSH_PROGRAM, args.join(" "));

        let output = tokio::process::Command::new(SSH_PROGRAM)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| RemoteExecError::Spawn {
                program: SSH_PROGRAM.to_owned(),
                source,
            })?;

        let exit_code = output.status.code().unwrap_or(-1);
        debug!(exit_code, "ssh exited");

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
