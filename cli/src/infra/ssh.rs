//! Infrastructure implementation of the `RemoteShell` port over `ssh`.

use anyhow::Result;

use crate::application::ports::{CommandOutput, CommandRunner, RemoteShell};
use crate::domain::HarnessError;
use crate::infra::config::HarnessConfig;

/// Exit status `ssh` reserves for its own failures.
const SSH_TRANSPORT_FAILURE: i32 = 255;

/// Connection settings for [`SshShell`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub identity: Option<std::path::PathBuf>,
}

impl From<&HarnessConfig> for SshTarget {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            host: config.ssh_host.clone(),
            user: config.ssh_user.clone(),
            port: config.ssh_port,
            identity: config.ssh_key.clone(),
        }
    }
}

/// `RemoteShell` that runs each command in a fresh non-interactive `ssh`
/// session.
pub struct SshShell<R> {
    runner: R,
    target: SshTarget,
}

impl<R: CommandRunner> SshShell<R> {
    #[must_use]
    pub fn new(runner: R, target: SshTarget) -> Self {
        Self { runner, target }
    }

    fn args(&self, command: &str) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(identity) = &self.target.identity {
            args.push("-i".to_string());
            args.push(identity.to_string_lossy().into_owned());
        }
        for option in [
            "StrictHostKeyChecking=no",
            "UserKnownHostsFile=/dev/null",
            "LogLevel=ERROR",
            "BatchMode=yes",
            "ConnectTimeout=10",
        ] {
            args.push("-o".to_string());
            args.push(option.to_string());
        }
        args.push("-p".to_string());
        args.push(self.target.port.to_string());
        args.push(format!("{}@{}", self.target.user, self.target.host));
        args.push(command.to_string());
        args
    }
}

impl<R: CommandRunner> RemoteShell for SshShell<R> {
    async fn execute(&self, command: &str) -> Result<CommandOutput> {
        let output = self
            .runner
            .run("ssh", &self.args(command))
            .await
            .map_err(|e| HarnessError::Transport(format!("{e:#}")))?;
        match output.status.code() {
            Some(SSH_TRANSPORT_FAILURE) | None => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                Err(HarnessError::Transport(format!(
                    "ssh to {} failed: {stderr}",
                    self.target.host
                ))
                .into())
            }
            Some(exit_status) => Ok(CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                exit_status,
            }),
        }
    }
}
