//! `LifecycleRegistry`: the session's index of interface lifecycles, keyed
//! by instance id.
//!
//! Each lifecycle sits behind its own async mutex, so operations on the same
//! instance are serialized while distinct instances proceed in parallel. The
//! map itself is guarded by a short-lived sync mutex that is never held
//! across an await.
//!
//! Whoever holds a lifecycle's lock also keeps it tracked: entries are only
//! removed under their lock, and a caller that acquires a lock on an entry
//! removed meanwhile puts it back before acting.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;

use super::cloud::CloudInterfaceClient;
use super::lifecycle::{InterfaceLifecycle, LifecycleTarget};
use super::probe::RemoteProbe;
use crate::application::ports::{CloudNetwork, ProgressReporter, RemoteShell};
use crate::domain::{DEFAULT_DEVICE_INDEX, DEFAULT_NIC, LifecyclePolicy, LifecycleState};

/// A tracked lifecycle, locked per instance.
pub type SharedLifecycle<C, S> = Arc<tokio::sync::Mutex<InterfaceLifecycle<C, S>>>;

type LifecycleGuard<C, S> = tokio::sync::OwnedMutexGuard<InterfaceLifecycle<C, S>>;

/// Defaults applied to every lifecycle the registry creates.
#[derive(Debug, Clone)]
pub struct RegistryDefaults {
    pub nic: String,
    pub device_index: u32,
    pub elastic_address: bool,
    pub policy: LifecyclePolicy,
}

impl Default for RegistryDefaults {
    fn default() -> Self {
        Self {
            nic: DEFAULT_NIC.to_string(),
            device_index: DEFAULT_DEVICE_INDEX,
            elastic_address: false,
            policy: LifecyclePolicy::default(),
        }
    }
}

/// Session-owned registry of interface lifecycles.
pub struct LifecycleRegistry<C, S> {
    cloud: Arc<CloudInterfaceClient<C>>,
    defaults: RegistryDefaults,
    entries: Mutex<BTreeMap<String, SharedLifecycle<C, S>>>,
}

impl<C: CloudNetwork, S: RemoteShell> LifecycleRegistry<C, S> {
    #[must_use]
    pub fn new(api: C, defaults: RegistryDefaults) -> Self {
        let policy = defaults.policy;
        Self {
            cloud: Arc::new(CloudInterfaceClient::new(
                api,
                policy.attach,
                policy.detach,
                policy.settle_delay,
            )),
            defaults,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, SharedLifecycle<C, S>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The tracked lifecycle for `instance_id`, creating it on first
    /// reference. `shell` is only called when a new lifecycle is created.
    pub fn get_or_create(
        &self,
        instance_id: &str,
        shell: impl FnOnce() -> S,
    ) -> SharedLifecycle<C, S> {
        let mut entries = self.entries();
        if let Some(existing) = entries.get(instance_id) {
            return Arc::clone(existing);
        }
        tracing::debug!(instance = instance_id, "tracking new lifecycle");
        let target = LifecycleTarget {
            instance_id: instance_id.to_string(),
            nic: self.defaults.nic.clone(),
            device_index: self.defaults.device_index,
            elastic_address: self.defaults.elastic_address,
        };
        let lifecycle = Arc::new(tokio::sync::Mutex::new(InterfaceLifecycle::new(
            Arc::clone(&self.cloud),
            RemoteProbe::new(shell()),
            target,
            self.defaults.policy,
        )));
        entries.insert(instance_id.to_string(), Arc::clone(&lifecycle));
        lifecycle
    }

    /// Instance ids currently tracked, in order.
    pub fn tracked(&self) -> Vec<String> {
        self.entries().keys().cloned().collect()
    }

    /// Set up `instance_id`'s interface under its lock.
    ///
    /// # Errors
    ///
    /// Propagates the lifecycle's error; the entry stays tracked so the
    /// session sweep can reconcile it.
    pub async fn set_up(
        &self,
        instance_id: &str,
        shell: impl FnOnce() -> S,
        reporter: &impl ProgressReporter,
    ) -> Result<()> {
        let lifecycle = self.get_or_create(instance_id, shell);
        let guard = self.lock_tracked(instance_id, lifecycle).await;
        guard.set_up(reporter).await
    }

    /// Current state of `instance_id`'s interface, if tracked.
    ///
    /// # Errors
    ///
    /// Propagates lookup errors.
    pub async fn state(&self, instance_id: &str) -> Result<Option<LifecycleState>> {
        let Some(lifecycle) = self.entries().get(instance_id).cloned() else {
            return Ok(None);
        };
        let guard = lifecycle.lock().await;
        guard.state().await.map(Some)
    }

    /// Tear down `instance_id`'s interface under its lock and stop tracking
    /// it. Untracked instances are a no-op.
    ///
    /// # Errors
    ///
    /// Propagates the lifecycle's error; the entry stays tracked.
    pub async fn tear_down(&self, instance_id: &str, reporter: &impl ProgressReporter) -> Result<()> {
        let Some(lifecycle) = self.entries().get(instance_id).cloned() else {
            return Ok(());
        };
        let guard = self.lock_tracked(instance_id, lifecycle).await;
        guard.tear_down(reporter).await?;
        self.untrack(instance_id, &guard);
        Ok(())
    }

    /// Lock `lifecycle`, following the entry if it was replaced while
    /// waiting and re-tracking it if it was removed.
    async fn lock_tracked(
        &self,
        instance_id: &str,
        mut lifecycle: SharedLifecycle<C, S>,
    ) -> LifecycleGuard<C, S> {
        loop {
            let guard = Arc::clone(&lifecycle).lock_owned().await;
            let replaced = {
                let mut entries = self.entries();
                match entries.get(instance_id).cloned() {
                    Some(current) if !Arc::ptr_eq(&current, &lifecycle) => Some(current),
                    Some(_) => None,
                    None => {
                        tracing::debug!(instance = instance_id, "re-tracking lifecycle");
                        entries.insert(instance_id.to_string(), Arc::clone(&lifecycle));
                        None
                    }
                }
            };
            match replaced {
                Some(current) => {
                    drop(guard);
                    lifecycle = current;
                }
                None => return guard,
            }
        }
    }

    /// Remove `instance_id` if it still maps to the locked lifecycle.
    fn untrack(&self, instance_id: &str, guard: &LifecycleGuard<C, S>) {
        let mut entries = self.entries();
        let locked = tokio::sync::OwnedMutexGuard::mutex(guard);
        if entries
            .get(instance_id)
            .is_some_and(|current| Arc::ptr_eq(current, locked))
        {
            entries.remove(instance_id);
        }
    }

    /// Tear down everything still tracked.
    ///
    /// Every entry is attempted once, in instance-id order, even if earlier
    /// ones fail. Entries are removed whether or not their teardown succeeded.
    ///
    /// # Errors
    ///
    /// Returns one error naming every instance whose teardown failed.
    pub async fn tear_down_all(&self, reporter: &impl ProgressReporter) -> Result<()> {
        let drained = std::mem::take(&mut *self.entries());
        let mut failures = Vec::new();
        for (instance_id, lifecycle) in drained {
            let guard = lifecycle.lock().await;
            if let Err(e) = guard.tear_down(reporter).await {
                tracing::warn!(instance = %instance_id, error = %format!("{e:#}"), "teardown failed");
                reporter.warn(&format!("failed to tear down {instance_id}: {e:#}"));
                failures.push(format!("{instance_id}: {e:#}"));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "teardown failed for {} instance(s):\n  {}",
                failures.len(),
                failures.join("\n  ")
            )
        }
    }

    /// End the session: tear everything down and drop the registry.
    ///
    /// # Errors
    ///
    /// See [`Self::tear_down_all`].
    pub async fn shutdown(self, reporter: &impl ProgressReporter) -> Result<()> {
        self.tear_down_all(reporter).await
    }
}
