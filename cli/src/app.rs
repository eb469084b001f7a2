//! Application context: unified state passed to every command handler.
//!
//! Built once in `Cli::run()` from the global flags and the environment, then
//! handed to each command as `&AppContext`. Commands get their adapters from
//! here so none of them constructs infrastructure directly.

use anyhow::Result;

use crate::application::{LifecycleRegistry, RegistryDefaults, RemoteProbe};
use crate::domain::LifecyclePolicy;
use crate::infra::aws_cli::AwsCliNetwork;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::{AwsConfig, HarnessConfig};
use crate::infra::ssh::{SshShell, SshTarget};
use crate::output::OutputContext;

/// Production provider adapter.
pub type Network = AwsCliNetwork<TokioCommandRunner>;
/// Production remote shell.
pub type Shell = SshShell<TokioCommandRunner>;
/// Production registry.
pub type Registry = LifecycleRegistry<Network, Shell>;

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode, JSON mode).
    pub output: OutputContext,
    /// Instance and interface settings.
    pub config: HarnessConfig,
    /// Provider settings.
    pub aws: AwsConfig,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags and the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required environment variable is missing.
    pub fn new(flags: &OutputFlags) -> Result<Self> {
        Ok(Self {
            output: OutputContext::new(flags.no_color, flags.quiet, flags.json),
            config: HarnessConfig::from_env()?,
            aws: AwsConfig::from_env()?,
        })
    }

    /// A fresh shell to the instance under test.
    #[must_use]
    pub fn shell(&self) -> Shell {
        SshShell::new(TokioCommandRunner::default(), SshTarget::from(&self.config))
    }

    /// A probe over a fresh shell.
    #[must_use]
    pub fn probe(&self) -> RemoteProbe<Shell> {
        RemoteProbe::new(self.shell())
    }

    /// A session registry configured from the environment.
    #[must_use]
    pub fn registry(&self) -> Registry {
        LifecycleRegistry::new(
            AwsCliNetwork::new(TokioCommandRunner::default(), self.aws.clone()),
            RegistryDefaults {
                nic: self.config.nic.clone(),
                device_index: self.config.device_index,
                elastic_address: self.config.elastic_address,
                policy: LifecyclePolicy::default(),
            },
        )
    }
}
