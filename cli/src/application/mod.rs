//! Application layer: port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain`, never on `crate::infra`,
//! `crate::commands`, or `crate::output`.

pub mod ports;
pub mod services;

pub use ports::{
    CloudNetwork, CommandOutput, CommandRunner, InterfaceSpec, ProgressReporter, RemoteShell,
};
pub use services::cloud::CloudInterfaceClient;
pub use services::lifecycle::{InterfaceLifecycle, LifecycleTarget};
pub use services::probe::RemoteProbe;
pub use services::registry::{LifecycleRegistry, RegistryDefaults};
pub use services::verify::verify_hotplug;
