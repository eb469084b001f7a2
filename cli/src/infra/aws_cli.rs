//! Infrastructure implementation of the `CloudNetwork` port over the `aws`
//! command-line client.
//!
//! Every call is `aws ec2 <operation> ... --region <r> --output json`.
//! Credentials come from the CLI's own environment and profile chain.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::application::ports::{CloudNetwork, CommandRunner, InterfaceSpec};
use crate::domain::{
    Attachment, ComputeInstance, ElasticAddress, HarnessError, InterfaceStatus, NetworkInterface,
};
use crate::infra::config::AwsConfig;

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireGroup {
    group_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireAttachment {
    attachment_id: String,
    instance_id: Option<String>,
    device_index: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireInterface {
    network_interface_id: String,
    #[serde(default)]
    description: String,
    status: InterfaceStatus,
    subnet_id: String,
    #[serde(default)]
    groups: Vec<WireGroup>,
    attachment: Option<WireAttachment>,
}

impl WireInterface {
    /// `owner` fills in the instance id, which describe-instances omits from
    /// nested attachments.
    fn into_domain(self, owner: Option<&str>) -> NetworkInterface {
        NetworkInterface {
            interface_id: self.network_interface_id,
            description: self.description,
            status: self.status,
            subnet_id: self.subnet_id,
            group_ids: self.groups.into_iter().map(|g| g.group_id).collect(),
            attachment: self.attachment.map(|a| Attachment {
                attachment_id: a.attachment_id,
                instance_id: a
                    .instance_id
                    .or_else(|| owner.map(ToString::to_string))
                    .unwrap_or_default(),
                device_index: a.device_index,
            }),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InterfacesResponse {
    network_interfaces: Vec<WireInterface>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateInterfaceResponse {
    network_interface: WireInterface,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AttachResponse {
    attachment_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireAddress {
    allocation_id: String,
    association_id: Option<String>,
    public_ip: Option<String>,
}

impl From<WireAddress> for ElasticAddress {
    fn from(a: WireAddress) -> Self {
        Self {
            allocation_id: a.allocation_id,
            association_id: a.association_id,
            public_ip: a.public_ip,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AddressesResponse {
    addresses: Vec<WireAddress>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssociateResponse {
    association_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireState {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireInstance {
    instance_id: String,
    state: WireState,
    #[serde(default)]
    network_interfaces: Vec<WireInterface>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireReservation {
    instances: Vec<WireInstance>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstancesResponse {
    reservations: Vec<WireReservation>,
}

// ── Adapter ───────────────────────────────────────────────────────────────────

/// `CloudNetwork` backed by the `aws` CLI.
pub struct AwsCliNetwork<R> {
    runner: R,
    config: AwsConfig,
}

impl<R: CommandRunner> AwsCliNetwork<R> {
    #[must_use]
    pub fn new(runner: R, config: AwsConfig) -> Self {
        Self { runner, config }
    }

    fn args(&self, operation: &str, params: &[&str]) -> Vec<String> {
        let mut args = vec!["ec2".to_string(), operation.to_string()];
        args.extend(params.iter().map(ToString::to_string));
        args.extend(["--region".to_string(), self.config.region.clone()]);
        if let Some(profile) = &self.config.profile {
            args.extend(["--profile".to_string(), profile.clone()]);
        }
        args.extend(["--output".to_string(), "json".to_string()]);
        args
    }

    /// Run one operation, returning stdout. Non-zero exits become
    /// [`HarnessError::Provider`] carrying the CLI's stderr.
    async fn call(&self, operation: &str, params: &[&str]) -> Result<String> {
        let output = self
            .runner
            .run("aws", &self.args(operation, params))
            .await
            .with_context(|| format!("running aws ec2 {operation}"))?;
        if !output.status.success() {
            let message = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(operation, %message, "aws call failed");
            return Err(HarnessError::Provider {
                operation: operation.to_string(),
                message,
            }
            .into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn call_json<T: DeserializeOwned>(&self, operation: &str, params: &[&str]) -> Result<T> {
        let stdout = self.call(operation, params).await?;
        serde_json::from_str(&stdout).with_context(|| format!("parsing aws ec2 {operation} output"))
    }
}

/// Whether a provider error is the CLI's "no such resource" response.
fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<HarnessError>(),
        Some(HarnessError::Provider { message, .. }) if message.contains(".NotFound")
    )
}

impl<R: CommandRunner> CloudNetwork for AwsCliNetwork<R> {
    async fn describe_instance(&self, instance_id: &str) -> Result<Option<ComputeInstance>> {
        let response: InstancesResponse = match self
            .call_json("describe-instances", &["--instance-ids", instance_id])
            .await
        {
            Ok(r) => r,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(response
            .reservations
            .into_iter()
            .flat_map(|r| r.instances)
            .find(|i| i.instance_id == instance_id)
            .map(|i| {
                let owner = i.instance_id.clone();
                ComputeInstance {
                    instance_id: i.instance_id,
                    state: i.state.name,
                    interfaces: i
                        .network_interfaces
                        .into_iter()
                        .map(|n| n.into_domain(Some(&owner)))
                        .collect(),
                }
            }))
    }

    async fn describe_interfaces_by_description(
        &self,
        description: &str,
    ) -> Result<Vec<NetworkInterface>> {
        let filter = format!("Name=description,Values={description}");
        let response: InterfacesResponse = self
            .call_json("describe-network-interfaces", &["--filters", &filter])
            .await?;
        Ok(response
            .network_interfaces
            .into_iter()
            .map(|n| n.into_domain(None))
            .collect())
    }

    async fn describe_interface(&self, interface_id: &str) -> Result<Option<NetworkInterface>> {
        let response: InterfacesResponse = match self
            .call_json(
                "describe-network-interfaces",
                &["--network-interface-ids", interface_id],
            )
            .await
        {
            Ok(r) => r,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(response
            .network_interfaces
            .into_iter()
            .next()
            .map(|n| n.into_domain(None)))
    }

    async fn create_interface(&self, spec: &InterfaceSpec<'_>) -> Result<NetworkInterface> {
        let mut params = vec!["--subnet-id", spec.subnet_id, "--description", spec.description];
        if !spec.group_ids.is_empty() {
            params.push("--groups");
            params.extend(spec.group_ids.iter().map(String::as_str));
        }
        let response: CreateInterfaceResponse =
            self.call_json("create-network-interface", &params).await?;
        Ok(response.network_interface.into_domain(None))
    }

    async fn tag_interface(&self, interface_id: &str, key: &str, value: &str) -> Result<()> {
        let tag = format!("Key={key},Value={value}");
        self.call("create-tags", &["--resources", interface_id, "--tags", &tag])
            .await
            .map(drop)
    }

    async fn delete_interface(&self, interface_id: &str) -> Result<()> {
        self.call(
            "delete-network-interface",
            &["--network-interface-id", interface_id],
        )
        .await
        .map(drop)
    }

    async fn attach_interface(
        &self,
        interface_id: &str,
        instance_id: &str,
        device_index: u32,
    ) -> Result<String> {
        let index = device_index.to_string();
        let response: AttachResponse = self
            .call_json(
                "attach-network-interface",
                &[
                    "--network-interface-id",
                    interface_id,
                    "--instance-id",
                    instance_id,
                    "--device-index",
                    &index,
                ],
            )
            .await?;
        Ok(response.attachment_id)
    }

    async fn detach_interface(&self, attachment_id: &str) -> Result<()> {
        self.call("detach-network-interface", &["--attachment-id", attachment_id])
            .await
            .map(drop)
    }

    async fn describe_addresses(&self, interface_id: &str) -> Result<Vec<ElasticAddress>> {
        let filter = format!("Name=network-interface-id,Values={interface_id}");
        let response: AddressesResponse = self
            .call_json("describe-addresses", &["--filters", &filter])
            .await?;
        Ok(response.addresses.into_iter().map(Into::into).collect())
    }

    async fn allocate_address(&self) -> Result<ElasticAddress> {
        let address: WireAddress = self
            .call_json("allocate-address", &["--domain", "vpc"])
            .await?;
        Ok(address.into())
    }

    async fn associate_address(&self, allocation_id: &str, interface_id: &str) -> Result<String> {
        let response: AssociateResponse = self
            .call_json(
                "associate-address",
                &[
                    "--allocation-id",
                    allocation_id,
                    "--network-interface-id",
                    interface_id,
                ],
            )
            .await?;
        Ok(response.association_id)
    }

    async fn disassociate_address(&self, association_id: &str) -> Result<()> {
        self.call("disassociate-address", &["--association-id", association_id])
            .await
            .map(drop)
    }

    async fn release_address(&self, allocation_id: &str) -> Result<()> {
        self.call("release-address", &["--allocation-id", allocation_id])
            .await
            .map(drop)
    }
}
