//! `RemoteProbe`. OS-level view of the secondary interface on the instance
//! under test, over the `RemoteShell` port.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::Result;

use super::poll::wait_until;
use crate::application::ports::{CommandOutput, RemoteShell};
use crate::domain::{HarnessError, PollPolicy};

/// Reads the instance id from the link-local metadata service.
pub const INSTANCE_ID_COMMAND: &str =
    "curl -s http://169.254.169.254/latest/meta-data/instance-id";

/// Exits 0 once `nic` holds a global-scope address, i.e. once the hotplug
/// rules have configured it.
#[must_use]
pub fn link_up_command(nic: &str) -> String {
    format!("ip a | grep 'scope global.*{nic}$'")
}

#[must_use]
pub fn link_down_command(nic: &str) -> String {
    format!("sudo ifdown {nic}")
}

/// Remote checks and commands against one instance.
pub struct RemoteProbe<S> {
    shell: S,
}

impl<S: RemoteShell> RemoteProbe<S> {
    #[must_use]
    pub fn new(shell: S) -> Self {
        Self { shell }
    }

    /// Run an arbitrary command.
    ///
    /// # Errors
    ///
    /// Transport failures are returned unchanged.
    pub async fn run(&self, command: &str) -> Result<CommandOutput> {
        tracing::debug!(command, "remote exec");
        self.shell.execute(command).await
    }

    /// Whether the OS has configured `nic`.
    ///
    /// # Errors
    ///
    /// Transport failures are returned unchanged.
    pub async fn is_link_up(&self, nic: &str) -> Result<bool> {
        Ok(self.run(&link_up_command(nic)).await?.success())
    }

    /// Wait for the hotplug rules to bring `nic` up.
    ///
    /// The guest needs several seconds after attach to notice the device and
    /// run DHCP on it, hence the poll.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Timeout`] if `nic` is not up within `policy`.
    pub async fn wait_for_link_up(&self, nic: &str, policy: PollPolicy) -> Result<()> {
        wait_until(policy, &format!("{nic} to come up on the instance"), || {
            self.is_link_up(nic)
        })
        .await
    }

    /// Take `nic` down at the OS level if it is up.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::CommandFailed`] if the down command exits
    /// non-zero.
    pub async fn bring_down(&self, nic: &str) -> Result<()> {
        if !self.is_link_up(nic).await? {
            return Ok(());
        }
        let command = link_down_command(nic);
        let output = self.run(&command).await?;
        if !output.success() {
            return Err(HarnessError::CommandFailed {
                command,
                status: output.exit_status,
                output: output.stdout.trim().to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// The id of the instance this probe talks to.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::CommandFailed`] if the metadata service does
    /// not answer with an id.
    pub async fn instance_id(&self) -> Result<String> {
        let output = self.run(INSTANCE_ID_COMMAND).await?;
        let id = output.stdout.trim();
        if !output.success() || id.is_empty() {
            return Err(HarnessError::CommandFailed {
                command: INSTANCE_ID_COMMAND.to_string(),
                status: output.exit_status,
                output: id.to_string(),
            }
            .into());
        }
        Ok(id.to_string())
    }
}
