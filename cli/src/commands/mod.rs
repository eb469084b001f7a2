//! Command implementations

pub mod check;
pub mod down;
pub mod status;
pub mod up;

use anyhow::{Context, Result};

use crate::application::{RemoteProbe, RemoteShell};

/// The id of the instance `probe` is connected to.
///
/// # Errors
///
/// Returns an error if the instance cannot be reached or the metadata
/// service does not answer.
pub async fn discover_instance(probe: &RemoteProbe<impl RemoteShell>) -> Result<String> {
    let instance_id = probe
        .instance_id()
        .await
        .context("cannot determine the instance id of the SSH target")?;
    tracing::debug!(instance = %instance_id, "discovered instance");
    Ok(instance_id)
}
