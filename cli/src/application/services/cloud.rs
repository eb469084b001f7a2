//! `CloudInterfaceClient`: interface and address operations over the
//! `CloudNetwork` port, with the uniqueness checks, settle delay, and bounded
//! status polls the raw API does not provide.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::cell::RefCell;
use std::time::Duration;

use anyhow::{Context, Result};

use super::poll::wait_until;
use crate::application::ports::{CloudNetwork, InterfaceSpec};
use crate::domain::{
    ComputeInstance, ElasticAddress, HarnessError, InterfaceStatus, NetworkInterface, PollPolicy,
};

/// Interface operations with the harness's idempotency and timing contract.
pub struct CloudInterfaceClient<C> {
    api: C,
    attach_poll: PollPolicy,
    detach_poll: PollPolicy,
    settle_delay: Duration,
}

impl<C: CloudNetwork> CloudInterfaceClient<C> {
    #[must_use]
    pub fn new(api: C, attach_poll: PollPolicy, detach_poll: PollPolicy, settle_delay: Duration) -> Self {
        Self {
            api,
            attach_poll,
            detach_poll,
            settle_delay,
        }
    }

    /// Look up an instance.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InstanceNotFound`] if the provider does not
    /// know the instance, or the provider's error.
    pub async fn find_instance(&self, instance_id: &str) -> Result<ComputeInstance> {
        self.api
            .describe_instance(instance_id)
            .await
            .with_context(|| format!("describing instance {instance_id}"))?
            .ok_or_else(|| HarnessError::InstanceNotFound(instance_id.to_string()).into())
    }

    /// The instance's device-index-0 interface.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::NoPrimaryInterface`] if the instance has none.
    pub async fn primary_interface(&self, instance_id: &str) -> Result<NetworkInterface> {
        let instance = self.find_instance(instance_id).await?;
        instance
            .primary_interface()
            .cloned()
            .ok_or_else(|| HarnessError::NoPrimaryInterface(instance_id.to_string()).into())
    }

    /// Create an interface in `source`'s subnet with `source`'s security
    /// groups, described as `description`.
    ///
    /// Not idempotent: call [`Self::find_interface`] first.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn clone_interface(
        &self,
        source: &NetworkInterface,
        description: &str,
    ) -> Result<NetworkInterface> {
        tracing::debug!(
            source = %source.interface_id,
            subnet = %source.subnet_id,
            groups = ?source.group_ids,
            "creating interface"
        );
        self.api
            .create_interface(&InterfaceSpec {
                subnet_id: &source.subnet_id,
                group_ids: &source.group_ids,
                description,
            })
            .await
            .with_context(|| format!("cloning {}", source.interface_id))
    }

    /// Put a `Name` tag on the interface.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn tag_interface(&self, handle: &NetworkInterface, name: &str) -> Result<()> {
        self.api
            .tag_interface(&handle.interface_id, "Name", name)
            .await
            .with_context(|| format!("tagging {}", handle.interface_id))
    }

    /// Find the single interface described as `description`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::AmbiguousResource`] if more than one matches.
    pub async fn find_interface(&self, description: &str) -> Result<Option<NetworkInterface>> {
        let matches = self
            .api
            .describe_interfaces_by_description(description)
            .await
            .context("describing network interfaces")?;
        at_most_one(matches, "network interface", description)
    }

    /// Re-describe an interface by id.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn refresh(&self, handle: &NetworkInterface) -> Result<Option<NetworkInterface>> {
        self.api
            .describe_interface(&handle.interface_id)
            .await
            .with_context(|| format!("describing {}", handle.interface_id))
    }

    /// Find the single elastic address associated with an interface.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::AmbiguousResource`] if more than one matches.
    pub async fn find_address(&self, interface_id: &str) -> Result<Option<ElasticAddress>> {
        let matches = self
            .api
            .describe_addresses(interface_id)
            .await
            .context("describing addresses")?;
        at_most_one(matches, "elastic address", interface_id)
    }

    /// Allocate a fresh elastic address and bind it to the interface.
    ///
    /// # Errors
    ///
    /// Returns the provider's error. An allocation that fails to associate is
    /// left allocated.
    pub async fn allocate_and_associate_address(&self, interface_id: &str) -> Result<ElasticAddress> {
        let mut address = self.api.allocate_address().await.context("allocating address")?;
        let association_id = self
            .api
            .associate_address(&address.allocation_id, interface_id)
            .await
            .with_context(|| {
                format!("associating {} with {interface_id}", address.allocation_id)
            })?;
        address.association_id = Some(association_id);
        Ok(address)
    }

    /// Unbind (if bound) then release an elastic address.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn release_address(&self, address: &ElasticAddress) -> Result<()> {
        if let Some(association_id) = &address.association_id {
            self.api
                .disassociate_address(association_id)
                .await
                .with_context(|| format!("disassociating {}", address.allocation_id))?;
        }
        self.api
            .release_address(&address.allocation_id)
            .await
            .with_context(|| format!("releasing {}", address.allocation_id))
    }

    /// Delete the interface, then wait out the provider's read-after-delete
    /// lag so the next lookup does not find it again.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn delete_interface(&self, handle: &NetworkInterface) -> Result<()> {
        self.api
            .delete_interface(&handle.interface_id)
            .await
            .with_context(|| format!("deleting {}", handle.interface_id))?;
        tokio::time::sleep(self.settle_delay).await;
        Ok(())
    }

    /// Attach the interface and wait for `in-use`.
    ///
    /// No attach call is issued when the interface is already in use or
    /// already attaching. An interface still `detaching` (or `pending` after
    /// a create) is first waited out until `available`, since the provider
    /// rejects attaching it.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Timeout`] if the status does not reach
    /// `available` within the detach (or attach) poll, or `in-use` within the
    /// attach poll.
    pub async fn attach(
        &self,
        handle: &NetworkInterface,
        instance_id: &str,
        device_index: u32,
    ) -> Result<NetworkInterface> {
        let handle = match handle.status {
            InterfaceStatus::Detaching => {
                self.wait_for_status(handle, InterfaceStatus::Available, self.detach_poll)
                    .await?
            }
            InterfaceStatus::Pending => {
                self.wait_for_status(handle, InterfaceStatus::Available, self.attach_poll)
                    .await?
            }
            _ => handle.clone(),
        };
        if !handle.status.is_attached() {
            self.api
                .attach_interface(&handle.interface_id, instance_id, device_index)
                .await
                .with_context(|| format!("attaching {} to {instance_id}", handle.interface_id))?;
        }
        self.wait_for_status(&handle, InterfaceStatus::InUse, self.attach_poll)
            .await
    }

    /// Detach the interface if attached and wait for `available`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Provider`] if an attached interface reports no
    /// attachment, and [`HarnessError::Timeout`] if the status does not reach
    /// `available` within the detach poll.
    pub async fn detach(&self, handle: &NetworkInterface) -> Result<NetworkInterface> {
        if handle.status.is_attached() {
            let Some(attachment) = &handle.attachment else {
                return Err(HarnessError::Provider {
                    operation: "detach-network-interface".to_string(),
                    message: format!(
                        "{} is {} but reports no attachment",
                        handle.interface_id, handle.status
                    ),
                }
                .into());
            };
            self.api
                .detach_interface(&attachment.attachment_id)
                .await
                .with_context(|| format!("detaching {}", handle.interface_id))?;
        }
        self.wait_for_status(handle, InterfaceStatus::Available, self.detach_poll)
            .await
    }

    async fn wait_for_status(
        &self,
        handle: &NetworkInterface,
        want: InterfaceStatus,
        policy: PollPolicy,
    ) -> Result<NetworkInterface> {
        let operation = format!("{} to reach {want}", handle.interface_id);
        let latest = RefCell::new(None);
        wait_until(policy, &operation, || async {
            let current = self.refresh(handle).await?;
            let reached = current.as_ref().is_some_and(|i| i.status == want);
            *latest.borrow_mut() = current;
            Ok(reached)
        })
        .await?;
        latest
            .into_inner()
            .with_context(|| format!("{} disappeared", handle.interface_id))
    }
}

fn at_most_one<T>(mut matches: Vec<T>, kind: &'static str, key: &str) -> Result<Option<T>> {
    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        count => Err(HarnessError::AmbiguousResource {
            kind,
            key: key.to_string(),
            count,
        }
        .into()),
    }
}
