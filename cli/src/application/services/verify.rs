//! Hotplug verification use-case.
//!
//! Runs every hotplug check against the instance and collects the results.
//! A failed check is a result, not an error; only transport failures abort.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::{Context, Result};

use super::probe::RemoteProbe;
use crate::application::ports::{ProgressReporter, RemoteShell};
use crate::domain::{CheckResult, hotplug_checks};

/// Run all hotplug checks for `nic` at `device_index`.
///
/// # Errors
///
/// Returns an error if the shell cannot reach the instance.
pub async fn verify_hotplug(
    probe: &RemoteProbe<impl RemoteShell>,
    nic: &str,
    device_index: u32,
    egress_url: &str,
    reporter: &impl ProgressReporter,
) -> Result<Vec<CheckResult>> {
    let checks = hotplug_checks(nic, device_index, egress_url)
        .with_context(|| format!("building checks for {nic}"))?;
    let mut results = Vec::with_capacity(checks.len());
    for check in &checks {
        let output = probe
            .run(&check.command)
            .await
            .with_context(|| format!("running {} check", check.name))?;
        let result = check.evaluate(output.exit_status, &output.stdout);
        if result.passed {
            reporter.success(&format!("{}: {}", result.name, result.detail));
        } else {
            tracing::debug!(check = result.name, stdout = %output.stdout, "check failed");
            reporter.warn(&format!("{}: {}", result.name, result.detail));
        }
        results.push(result);
    }
    Ok(results)
}
