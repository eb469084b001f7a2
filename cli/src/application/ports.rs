//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::process::Output;

use anyhow::Result;

use crate::domain::{ComputeInstance, ElasticAddress, NetworkInterface};

// ── Value Types ───────────────────────────────────────────────────────────────

/// Parameters for creating a network interface.
pub struct InterfaceSpec<'a> {
    pub subnet_id: &'a str,
    pub group_ids: &'a [String],
    pub description: &'a str,
}

/// Result of a command run on the instance under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub exit_status: i32,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

// ── Cloud Network Port ────────────────────────────────────────────────────────

/// Raw primitives of the provider's network API.
///
/// Reads are eventually consistent with writes. Implementations return the
/// provider's view verbatim; uniqueness and polling live in the services.
#[allow(async_fn_in_trait)]
pub trait CloudNetwork {
    /// Describe an instance and every interface attached to it.
    /// Returns `None` if the instance does not exist.
    async fn describe_instance(&self, instance_id: &str) -> Result<Option<ComputeInstance>>;
    /// Describe all interfaces whose description equals `description`.
    async fn describe_interfaces_by_description(
        &self,
        description: &str,
    ) -> Result<Vec<NetworkInterface>>;
    /// Describe one interface by id. Returns `None` if it no longer exists.
    async fn describe_interface(&self, interface_id: &str) -> Result<Option<NetworkInterface>>;
    /// Create an interface.
    async fn create_interface(&self, spec: &InterfaceSpec<'_>) -> Result<NetworkInterface>;
    /// Set a tag on an interface.
    async fn tag_interface(&self, interface_id: &str, key: &str, value: &str) -> Result<()>;
    /// Delete an interface.
    async fn delete_interface(&self, interface_id: &str) -> Result<()>;
    /// Attach an interface to an instance, returning the attachment id.
    async fn attach_interface(
        &self,
        interface_id: &str,
        instance_id: &str,
        device_index: u32,
    ) -> Result<String>;
    /// Detach by attachment id.
    async fn detach_interface(&self, attachment_id: &str) -> Result<()>;
    /// Describe every elastic address associated with an interface.
    async fn describe_addresses(&self, interface_id: &str) -> Result<Vec<ElasticAddress>>;
    /// Allocate a new elastic address.
    async fn allocate_address(&self) -> Result<ElasticAddress>;
    /// Bind an allocation to an interface, returning the association id.
    async fn associate_address(&self, allocation_id: &str, interface_id: &str) -> Result<String>;
    /// Unbind an association.
    async fn disassociate_address(&self, association_id: &str) -> Result<()>;
    /// Give an allocation back to the provider.
    async fn release_address(&self, allocation_id: &str) -> Result<()>;
}

// ── Remote Shell Port ─────────────────────────────────────────────────────────

/// Command execution on the instance under test.
///
/// One command at a time. A command that runs and exits non-zero is a
/// successful call; failing to run it at all is an error
/// (`HarnessError::Transport`).
#[allow(async_fn_in_trait)]
pub trait RemoteShell {
    async fn execute(&self, command: &str) -> Result<CommandOutput>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts local process execution so infrastructure can be swapped or mocked.
#[cfg_attr(test, mockall::automock)]
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[String]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[String],
        timeout: std::time::Duration,
    ) -> Result<Output>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
