//! Domain layer: pure types, policies, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod checks;
pub mod error;
pub mod interface;
pub mod lifecycle;

pub use checks::{CheckResult, HotplugCheck, hotplug_checks};
pub use error::HarnessError;
pub use interface::{
    Attachment, ComputeInstance, DEFAULT_DEVICE_INDEX, DEFAULT_NIC, ElasticAddress, InterfaceStatus, NetworkInterface,
    interface_description, interface_name,
};
pub use lifecycle::{LifecyclePolicy, LifecycleState, PollPolicy};
