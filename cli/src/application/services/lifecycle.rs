//! Secondary interface lifecycle: create, attach, bring-up, and the mirrored
//! teardown.
//!
//! Every step re-reads the provider and the guest before acting, so any
//! number of `set_up` / `tear_down` calls, interleaved with partial failures
//! or outside interference, converge on the requested end state.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::sync::Arc;

use anyhow::{Context, Result};

use super::cloud::CloudInterfaceClient;
use super::probe::RemoteProbe;
use crate::application::ports::{CloudNetwork, ProgressReporter, RemoteShell};
use crate::domain::{
    DEFAULT_DEVICE_INDEX, DEFAULT_NIC, InterfaceStatus, LifecyclePolicy, LifecycleState,
    NetworkInterface, interface_description, interface_name,
};

/// Which interface to manage on which instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleTarget {
    pub instance_id: String,
    /// OS name the hotplug rules give the device, e.g. `eth1`.
    pub nic: String,
    pub device_index: u32,
    /// Also bind an elastic address during set-up.
    pub elastic_address: bool,
}

impl LifecycleTarget {
    /// [`DEFAULT_NIC`] at [`DEFAULT_DEVICE_INDEX`], no elastic address.
    #[must_use]
    pub fn secondary(instance_id: &str) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            nic: DEFAULT_NIC.to_string(),
            device_index: DEFAULT_DEVICE_INDEX,
            elastic_address: false,
        }
    }

    #[must_use]
    pub fn description(&self) -> String {
        interface_description(&self.instance_id)
    }
}

/// One instance's secondary interface.
pub struct InterfaceLifecycle<C, S> {
    cloud: Arc<CloudInterfaceClient<C>>,
    probe: RemoteProbe<S>,
    target: LifecycleTarget,
    policy: LifecyclePolicy,
}

impl<C: CloudNetwork, S: RemoteShell> InterfaceLifecycle<C, S> {
    #[must_use]
    pub fn new(
        cloud: Arc<CloudInterfaceClient<C>>,
        probe: RemoteProbe<S>,
        target: LifecycleTarget,
        policy: LifecyclePolicy,
    ) -> Self {
        Self {
            cloud,
            probe,
            target,
            policy,
        }
    }

    #[must_use]
    pub fn target(&self) -> &LifecycleTarget {
        &self.target
    }

    #[must_use]
    pub fn probe(&self) -> &RemoteProbe<S> {
        &self.probe
    }

    /// Infer the current state from the provider and the guest.
    ///
    /// # Errors
    ///
    /// Returns lookup errors, including `AmbiguousResource`.
    pub async fn state(&self) -> Result<LifecycleState> {
        let Some(nic) = self.interface().await? else {
            return Ok(LifecycleState::Absent);
        };
        if nic.status != InterfaceStatus::InUse {
            return Ok(LifecycleState::Created);
        }
        if self.link_up().await? {
            Ok(LifecycleState::Up)
        } else {
            Ok(LifecycleState::Attached)
        }
    }

    /// Drive the interface to `Up`.
    ///
    /// # Errors
    ///
    /// Any failure, including a poll timeout, aborts the remaining steps.
    pub async fn set_up(&self, reporter: &impl ProgressReporter) -> Result<()> {
        let instance_id = &self.target.instance_id;

        let nic = match self.interface().await? {
            Some(nic) => nic,
            None => self.create(reporter).await?,
        };

        let nic = if nic.status == InterfaceStatus::InUse {
            nic
        } else {
            reporter.step(&format!(
                "waiting for {} to attach to {instance_id}...",
                nic.interface_id
            ));
            let nic = self
                .cloud
                .attach(&nic, instance_id, self.target.device_index)
                .await?;
            reporter.success(&format!("{} attached", nic.interface_id));
            nic
        };

        if self.target.elastic_address
            && self.cloud.find_address(&nic.interface_id).await?.is_none()
        {
            let address = self
                .cloud
                .allocate_and_associate_address(&nic.interface_id)
                .await?;
            reporter.success(&format!(
                "associated {} with {}",
                address.public_ip.as_deref().unwrap_or(&address.allocation_id),
                nic.interface_id
            ));
        }

        if !self.link_up().await? {
            reporter.step(&format!(
                "waiting for instance to bring up {}...",
                self.target.nic
            ));
            self.probe
                .wait_for_link_up(&self.target.nic, self.policy.link_up)
                .await?;
            reporter.success(&format!("{} is up", self.target.nic));
        }
        Ok(())
    }

    /// Walk the interface back to `Absent`.
    ///
    /// # Errors
    ///
    /// Any failure, including a poll timeout, aborts the remaining steps.
    pub async fn tear_down(&self, reporter: &impl ProgressReporter) -> Result<()> {
        let Some(nic) = self.interface().await? else {
            return Ok(());
        };

        if nic.status == InterfaceStatus::InUse && self.link_up().await? {
            reporter.step(&format!("bringing down {}...", self.target.nic));
            self.probe.bring_down(&self.target.nic).await?;
            reporter.success(&format!("{} is down", self.target.nic));
        }

        let nic = if nic.status == InterfaceStatus::Available {
            nic
        } else {
            reporter.step(&format!("waiting for {} to detach...", nic.interface_id));
            let nic = self.cloud.detach(&nic).await?;
            reporter.success(&format!("{} detached", nic.interface_id));
            nic
        };

        if let Some(address) = self.cloud.find_address(&nic.interface_id).await? {
            reporter.step(&format!("releasing {}...", address.allocation_id));
            self.cloud.release_address(&address).await?;
            reporter.success(&format!("{} released", address.allocation_id));
        }

        reporter.step(&format!("deleting {}...", nic.interface_id));
        self.cloud.delete_interface(&nic).await?;
        reporter.success(&format!("{} deleted", nic.interface_id));
        Ok(())
    }

    async fn interface(&self) -> Result<Option<NetworkInterface>> {
        self.cloud.find_interface(&self.target.description()).await
    }

    async fn create(&self, reporter: &impl ProgressReporter) -> Result<NetworkInterface> {
        let instance_id = &self.target.instance_id;
        let primary = self.cloud.primary_interface(instance_id).await?;
        let nic = self
            .cloud
            .clone_interface(&primary, &self.target.description())
            .await
            .with_context(|| format!("creating secondary interface for {instance_id}"))?;
        self.cloud
            .tag_interface(&nic, &interface_name(instance_id, &self.target.nic))
            .await?;
        reporter.success(&format!("created secondary interface {}", nic.interface_id));
        Ok(nic)
    }

    /// Whether the guest has configured the device. A stopped instance
    /// cannot answer and is treated as down.
    async fn link_up(&self) -> Result<bool> {
        let instance = self.cloud.find_instance(&self.target.instance_id).await?;
        if !instance.is_running() {
            tracing::debug!(instance = %instance.instance_id, state = %instance.state, "instance not running");
            return Ok(false);
        }
        self.probe.is_link_up(&self.target.nic).await
    }
}
