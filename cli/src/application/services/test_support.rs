//! Shared test doubles for the lifecycle services.
//!
//! `FakeCloud` is an in-memory provider with configurable attach/detach lag;
//! `FakeShell` is a guest OS whose secondary link comes up a configurable
//! number of probes after the provider reports the interface in use. Both
//! write mutating calls to a shared `Journal` so tests can assert ordering.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;

use super::probe::{INSTANCE_ID_COMMAND, link_down_command, link_up_command};
use crate::application::ports::{
    CloudNetwork, CommandOutput, InterfaceSpec, ProgressReporter, RemoteShell,
};
use crate::domain::{
    Attachment, ComputeInstance, ElasticAddress, HarnessError, InterfaceStatus, NetworkInterface,
};

// ── Journal ───────────────────────────────────────────────────────────────────

/// Ordered log of mutating calls across fakes.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    /// Index of the first entry starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|e| e.starts_with(prefix))
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}

// ── Fixtures ──────────────────────────────────────────────────────────────────

/// A running instance whose primary interface is `eni-<id>-0`.
pub fn instance_with_primary(instance_id: &str, subnet_id: &str, groups: &[&str]) -> ComputeInstance {
    ComputeInstance {
        instance_id: instance_id.to_string(),
        state: "running".to_string(),
        interfaces: vec![NetworkInterface {
            interface_id: format!("eni-{instance_id}-0"),
            description: "Primary network interface".to_string(),
            status: InterfaceStatus::InUse,
            subnet_id: subnet_id.to_string(),
            group_ids: groups.iter().map(ToString::to_string).collect(),
            attachment: Some(Attachment {
                attachment_id: format!("attach-{instance_id}-0"),
                instance_id: instance_id.to_string(),
                device_index: 0,
            }),
        }],
    }
}

// ── FakeCloud ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct CloudState {
    instances: HashMap<String, ComputeInstance>,
    interfaces: Vec<NetworkInterface>,
    tags: HashMap<String, String>,
    addresses: Vec<ElasticAddress>,
    address_owner: HashMap<String, String>,
    /// Remaining describes before a transitioning interface settles.
    /// `None` means it never settles.
    pending: HashMap<String, Option<u32>>,
    attach_lag: Option<u32>,
    detach_lag: Option<u32>,
    describe_calls: u32,
    next_id: u32,
}

/// In-memory provider. Clones share state.
#[derive(Clone)]
pub struct FakeCloud {
    state: Arc<Mutex<CloudState>>,
    journal: Journal,
}

impl FakeCloud {
    pub fn new(journal: Journal) -> Self {
        Self {
            state: Arc::new(Mutex::new(CloudState {
                attach_lag: Some(1),
                detach_lag: Some(1),
                ..CloudState::default()
            })),
            journal,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CloudState> {
        self.state.lock().unwrap()
    }

    pub fn add_instance(&self, instance: ComputeInstance) {
        self.lock()
            .instances
            .insert(instance.instance_id.clone(), instance);
    }

    pub fn set_instance_state(&self, instance_id: &str, state: &str) {
        if let Some(i) = self.lock().instances.get_mut(instance_id) {
            i.state = state.to_string();
        }
    }

    /// Describes after an attach call before the interface reports in-use.
    /// Also applies to attaches already in flight.
    pub fn set_attach_lag(&self, lag: Option<u32>) {
        let mut state = self.lock();
        state.attach_lag = lag;
        Self::retime(&mut state, InterfaceStatus::Attaching, lag);
    }

    /// Describes after a detach call before the interface reports available.
    /// Also applies to detaches already in flight.
    pub fn set_detach_lag(&self, lag: Option<u32>) {
        let mut state = self.lock();
        state.detach_lag = lag;
        Self::retime(&mut state, InterfaceStatus::Detaching, lag);
    }

    fn retime(state: &mut CloudState, status: InterfaceStatus, lag: Option<u32>) {
        let ids: Vec<String> = state
            .interfaces
            .iter()
            .filter(|i| i.status == status)
            .map(|i| i.interface_id.clone())
            .collect();
        for id in ids {
            state.pending.insert(id, lag);
        }
    }

    /// Insert an available interface in `subnet-1` / `sg-1` without journaling.
    pub fn insert_interface(&self, interface_id: &str, description: &str) -> NetworkInterface {
        let nic = NetworkInterface {
            interface_id: interface_id.to_string(),
            description: description.to_string(),
            status: InterfaceStatus::Available,
            subnet_id: "subnet-1".to_string(),
            group_ids: vec!["sg-1".to_string()],
            attachment: None,
        };
        self.lock().interfaces.push(nic.clone());
        nic
    }

    /// Insert an allocated address, optionally associated with an interface.
    pub fn insert_address(&self, allocation_id: &str, interface_id: Option<&str>) {
        let mut state = self.lock();
        state.addresses.push(ElasticAddress {
            allocation_id: allocation_id.to_string(),
            association_id: interface_id.map(|_| format!("eipassoc-{allocation_id}")),
            public_ip: Some("203.0.113.10".to_string()),
        });
        if let Some(id) = interface_id {
            state
                .address_owner
                .insert(allocation_id.to_string(), id.to_string());
        }
    }

    pub fn interfaces(&self) -> Vec<NetworkInterface> {
        self.lock().interfaces.clone()
    }

    pub fn tag(&self, interface_id: &str) -> Option<String> {
        self.lock().tags.get(interface_id).cloned()
    }

    pub fn describe_calls(&self) -> u32 {
        self.lock().describe_calls
    }

    /// Attachment id of the secondary interface in use on `instance_id`.
    pub fn attachment_on(&self, instance_id: &str) -> Option<String> {
        self.lock().interfaces.iter().find_map(|i| {
            i.attachment
                .as_ref()
                .filter(|a| i.status == InterfaceStatus::InUse && a.instance_id == instance_id)
                .map(|a| a.attachment_id.clone())
        })
    }

    fn id(&self, prefix: &str) -> String {
        let mut state = self.lock();
        state.next_id += 1;
        format!("{prefix}-{:04}", state.next_id)
    }

    fn advance(state: &mut CloudState, interface_id: &str) {
        let Some(nic) = state
            .interfaces
            .iter_mut()
            .find(|i| i.interface_id == interface_id)
        else {
            return;
        };
        let settled = match state.pending.get_mut(interface_id) {
            Some(Some(0)) => true,
            Some(Some(n)) => {
                *n -= 1;
                false
            }
            Some(None) | None => false,
        };
        if !settled {
            return;
        }
        state.pending.remove(interface_id);
        match nic.status {
            InterfaceStatus::Attaching => nic.status = InterfaceStatus::InUse,
            InterfaceStatus::Detaching => {
                nic.status = InterfaceStatus::Available;
                nic.attachment = None;
            }
            _ => {}
        }
    }
}

impl CloudNetwork for FakeCloud {
    async fn describe_instance(&self, instance_id: &str) -> Result<Option<ComputeInstance>> {
        let state = self.lock();
        Ok(state.instances.get(instance_id).map(|i| {
            let mut instance = i.clone();
            instance.interfaces.extend(
                state
                    .interfaces
                    .iter()
                    .filter(|n| {
                        n.attachment
                            .as_ref()
                            .is_some_and(|a| a.instance_id == instance_id)
                    })
                    .cloned(),
            );
            instance
        }))
    }

    async fn describe_interfaces_by_description(
        &self,
        description: &str,
    ) -> Result<Vec<NetworkInterface>> {
        Ok(self
            .lock()
            .interfaces
            .iter()
            .filter(|i| i.description == description)
            .cloned()
            .collect())
    }

    async fn describe_interface(&self, interface_id: &str) -> Result<Option<NetworkInterface>> {
        let mut state = self.lock();
        state.describe_calls += 1;
        Self::advance(&mut state, interface_id);
        Ok(state
            .interfaces
            .iter()
            .find(|i| i.interface_id == interface_id)
            .cloned())
    }

    async fn create_interface(&self, spec: &InterfaceSpec<'_>) -> Result<NetworkInterface> {
        let interface_id = self.id("eni");
        self.journal.record(format!("create {}", spec.description));
        let nic = NetworkInterface {
            interface_id,
            description: spec.description.to_string(),
            status: InterfaceStatus::Available,
            subnet_id: spec.subnet_id.to_string(),
            group_ids: spec.group_ids.to_vec(),
            attachment: None,
        };
        self.lock().interfaces.push(nic.clone());
        Ok(nic)
    }

    async fn tag_interface(&self, interface_id: &str, key: &str, value: &str) -> Result<()> {
        self.journal.record(format!("tag {interface_id} {key}={value}"));
        self.lock()
            .tags
            .insert(interface_id.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_interface(&self, interface_id: &str) -> Result<()> {
        self.journal.record(format!("delete {interface_id}"));
        let mut state = self.lock();
        if state.address_owner.values().any(|owner| owner == interface_id) {
            anyhow::bail!("{interface_id} still has an associated address");
        }
        let Some(pos) = state
            .interfaces
            .iter()
            .position(|i| i.interface_id == interface_id)
        else {
            anyhow::bail!("{interface_id} does not exist");
        };
        if state.interfaces[pos].status != InterfaceStatus::Available {
            anyhow::bail!("{interface_id} is currently in use");
        }
        state.interfaces.remove(pos);
        Ok(())
    }

    async fn attach_interface(
        &self,
        interface_id: &str,
        instance_id: &str,
        device_index: u32,
    ) -> Result<String> {
        self.journal
            .record(format!("attach {interface_id} {instance_id} {device_index}"));
        let attachment_id = self.id("eni-attach");
        let mut state = self.lock();
        let lag = state.attach_lag;
        let nic = state
            .interfaces
            .iter_mut()
            .find(|i| i.interface_id == interface_id)
            .ok_or_else(|| anyhow::anyhow!("{interface_id} does not exist"))?;
        anyhow::ensure!(
            nic.status == InterfaceStatus::Available,
            "{interface_id} is not available"
        );
        nic.status = InterfaceStatus::Attaching;
        nic.attachment = Some(Attachment {
            attachment_id: attachment_id.clone(),
            instance_id: instance_id.to_string(),
            device_index,
        });
        state.pending.insert(interface_id.to_string(), lag);
        Ok(attachment_id)
    }

    async fn detach_interface(&self, attachment_id: &str) -> Result<()> {
        let mut state = self.lock();
        let lag = state.detach_lag;
        let nic = state
            .interfaces
            .iter_mut()
            .find(|i| {
                i.attachment
                    .as_ref()
                    .is_some_and(|a| a.attachment_id == attachment_id)
            })
            .ok_or_else(|| anyhow::anyhow!("attachment {attachment_id} does not exist"))?;
        self.journal.record(format!("detach {}", nic.interface_id));
        nic.status = InterfaceStatus::Detaching;
        let interface_id = nic.interface_id.clone();
        state.pending.insert(interface_id, lag);
        Ok(())
    }

    async fn describe_addresses(&self, interface_id: &str) -> Result<Vec<ElasticAddress>> {
        let state = self.lock();
        Ok(state
            .addresses
            .iter()
            .filter(|a| {
                state
                    .address_owner
                    .get(&a.allocation_id)
                    .is_some_and(|owner| owner == interface_id)
            })
            .cloned()
            .collect())
    }

    async fn allocate_address(&self) -> Result<ElasticAddress> {
        let allocation_id = self.id("eipalloc");
        self.journal.record(format!("allocate {allocation_id}"));
        let address = ElasticAddress {
            allocation_id,
            association_id: None,
            public_ip: Some("203.0.113.20".to_string()),
        };
        self.lock().addresses.push(address.clone());
        Ok(address)
    }

    async fn associate_address(&self, allocation_id: &str, interface_id: &str) -> Result<String> {
        self.journal
            .record(format!("associate {allocation_id} {interface_id}"));
        let association_id = format!("eipassoc-{allocation_id}");
        let mut state = self.lock();
        let address = state
            .addresses
            .iter_mut()
            .find(|a| a.allocation_id == allocation_id)
            .ok_or_else(|| anyhow::anyhow!("{allocation_id} does not exist"))?;
        address.association_id = Some(association_id.clone());
        state
            .address_owner
            .insert(allocation_id.to_string(), interface_id.to_string());
        Ok(association_id)
    }

    async fn disassociate_address(&self, association_id: &str) -> Result<()> {
        let mut state = self.lock();
        let address = state
            .addresses
            .iter_mut()
            .find(|a| a.association_id.as_deref() == Some(association_id))
            .ok_or_else(|| anyhow::anyhow!("{association_id} does not exist"))?;
        address.association_id = None;
        let allocation_id = address.allocation_id.clone();
        self.journal.record(format!("disassociate {allocation_id}"));
        state.address_owner.remove(&allocation_id);
        Ok(())
    }

    async fn release_address(&self, allocation_id: &str) -> Result<()> {
        self.journal.record(format!("release {allocation_id}"));
        let mut state = self.lock();
        anyhow::ensure!(
            !state.address_owner.contains_key(allocation_id),
            "{allocation_id} is still associated"
        );
        state.addresses.retain(|a| a.allocation_id != allocation_id);
        Ok(())
    }
}

// ── FakeShell ─────────────────────────────────────────────────────────────────

struct ShellState {
    /// Attachment whose device the hotplug rules have configured.
    up_on: Option<String>,
    /// Attachment whose device was taken down by `ifdown`.
    downed_on: Option<String>,
    /// Link probes, while attached, before the hotplug rules bring the link
    /// up. `None` means it never comes up.
    up_lag: Option<u32>,
    transport_down: bool,
    ifdown_status: i32,
    link_queries: u32,
    scripted: HashMap<String, CommandOutput>,
}

/// Guest OS of one instance. Clones share state.
#[derive(Clone)]
pub struct FakeShell {
    state: Arc<Mutex<ShellState>>,
    journal: Journal,
    cloud: FakeCloud,
    instance_id: String,
    nic: String,
}

impl FakeShell {
    pub fn new(journal: Journal, cloud: FakeCloud, instance_id: &str, nic: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(ShellState {
                up_on: None,
                downed_on: None,
                up_lag: Some(1),
                transport_down: false,
                ifdown_status: 0,
                link_queries: 0,
                scripted: HashMap::new(),
            })),
            journal,
            cloud,
            instance_id: instance_id.to_string(),
            nic: nic.to_string(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ShellState> {
        self.state.lock().unwrap()
    }

    pub fn set_up_lag(&self, lag: Option<u32>) {
        self.lock().up_lag = lag;
    }

    pub fn set_transport_down(&self, down: bool) {
        self.lock().transport_down = down;
    }

    pub fn set_ifdown_status(&self, status: i32) {
        self.lock().ifdown_status = status;
    }

    pub fn script(&self, command: &str, exit_status: i32, stdout: &str) {
        self.lock().scripted.insert(
            command.to_string(),
            CommandOutput {
                stdout: stdout.to_string(),
                exit_status,
            },
        );
    }

    pub fn link_queries(&self) -> u32 {
        self.lock().link_queries
    }
}

impl RemoteShell for FakeShell {
    async fn execute(&self, command: &str) -> Result<CommandOutput> {
        let attachment = self.cloud.attachment_on(&self.instance_id);
        let mut state = self.lock();
        if state.transport_down {
            return Err(HarnessError::Transport("connection refused".to_string()).into());
        }

        let output = |exit_status: i32, stdout: &str| CommandOutput {
            stdout: stdout.to_string(),
            exit_status,
        };

        if command == link_up_command(&self.nic) {
            state.link_queries += 1;
            let Some(current) = attachment else {
                return Ok(output(1, ""));
            };
            let up = state.up_on.as_ref() == Some(&current);
            let downed = state.downed_on.as_ref() == Some(&current);
            if !up && !downed {
                match state.up_lag {
                    Some(0) => state.up_on = Some(current.clone()),
                    Some(n) => state.up_lag = Some(n - 1),
                    None => {}
                }
            }
            let up = state.up_on.as_ref() == Some(&current);
            return Ok(output(i32::from(!up), ""));
        }
        if command == link_down_command(&self.nic) {
            self.journal.record(format!("ifdown {}", self.nic));
            if state.ifdown_status == 0 {
                state.up_on = None;
                state.downed_on = attachment;
            }
            return Ok(output(state.ifdown_status, ""));
        }
        if command == INSTANCE_ID_COMMAND {
            return Ok(output(0, &format!("{}\n", self.instance_id)));
        }
        Ok(state
            .scripted
            .get(command)
            .cloned()
            .unwrap_or_else(|| output(127, "")))
    }
}

// ── Reporter ──────────────────────────────────────────────────────────────────

/// Progress reporter that keeps every message.
#[derive(Default)]
pub struct RecordingReporter(Mutex<Vec<String>>);

impl RecordingReporter {
    pub fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.0.lock().unwrap().push(format!("step: {message}"));
    }
    fn success(&self, message: &str) {
        self.0.lock().unwrap().push(format!("ok: {message}"));
    }
    fn warn(&self, message: &str) {
        self.0.lock().unwrap().push(format!("warn: {message}"));
    }
}
