//! Cloud-side resource types for the secondary interface under test.
//!
//! Pure data. Values are built by the `CloudNetwork` port implementations and
//! read by the lifecycle services.

use serde::{Deserialize, Serialize};

/// Device index of an instance's primary interface.
pub const PRIMARY_DEVICE_INDEX: u32 = 0;

/// Device index the secondary interface is attached at unless configured.
pub const DEFAULT_DEVICE_INDEX: u32 = 1;

/// OS name the hotplug rules give the secondary device unless configured.
pub const DEFAULT_NIC: &str = "eth1";

/// Provider-reported status of a network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterfaceStatus {
    /// Just created; not yet usable.
    Pending,
    Available,
    Associated,
    Attaching,
    InUse,
    Detaching,
}

impl InterfaceStatus {
    /// Whether the interface is attached or on its way to being attached.
    #[must_use]
    pub fn is_attached(self) -> bool {
        matches!(self, Self::InUse | Self::Attaching)
    }
}

impl std::fmt::Display for InterfaceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Available => "available",
            Self::Associated => "associated",
            Self::Attaching => "attaching",
            Self::InUse => "in-use",
            Self::Detaching => "detaching",
        })
    }
}

/// Where an interface is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub attachment_id: String,
    pub instance_id: String,
    pub device_index: u32,
}

/// A network interface as last described by the provider.
///
/// A handle is a snapshot: re-describe it before acting on its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInterface {
    pub interface_id: String,
    pub description: String,
    pub status: InterfaceStatus,
    pub subnet_id: String,
    pub group_ids: Vec<String>,
    pub attachment: Option<Attachment>,
}

/// An elastic address and its binding, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElasticAddress {
    pub allocation_id: String,
    pub association_id: Option<String>,
    pub public_ip: Option<String>,
}

impl ElasticAddress {
    #[must_use]
    pub fn is_associated(&self) -> bool {
        self.association_id.is_some()
    }
}

/// The compute instance a secondary interface is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComputeInstance {
    pub instance_id: String,
    /// Provider run state, e.g. `"running"`.
    pub state: String,
    pub interfaces: Vec<NetworkInterface>,
}

impl ComputeInstance {
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }

    /// The interface at device index 0, whose subnet and security groups a
    /// cloned interface inherits.
    #[must_use]
    pub fn primary_interface(&self) -> Option<&NetworkInterface> {
        self.interfaces.iter().find(|i| {
            i.attachment
                .as_ref()
                .is_some_and(|a| a.device_index == PRIMARY_DEVICE_INDEX)
        })
    }
}

/// Description marker used as the sole lookup key for an instance's
/// secondary interface.
#[must_use]
pub fn interface_description(instance_id: &str) -> String {
    format!("eni-harness secondary ENI for {instance_id}")
}

/// Value of the `Name` tag put on a created interface.
#[must_use]
pub fn interface_name(instance_id: &str, nic: &str) -> String {
    format!("eni-harness-{instance_id}-{nic}")
}
