//! `check`: one full hotplug session against the SSH target.
//!
//! Sets the interface up, runs every hotplug check, and always sweeps the
//! registry before returning, including after Ctrl-C.

use std::process::ExitCode;

use anyhow::Result;

use super::discover_instance;
use crate::app::{AppContext, Registry};
use crate::application::{ProgressReporter, verify_hotplug};
use crate::domain::CheckResult;
use crate::output::{HumanRenderer, TerminalReporter, json};

/// Run `check`.
///
/// Returns `ExitCode::FAILURE` when any check failed.
///
/// # Errors
///
/// Returns set-up, transport, or teardown failures. A teardown failure is
/// reported even when the session itself failed first.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let instance_id = discover_instance(&app.probe()).await?;
    let reporter = TerminalReporter::new(&app.output);
    let registry = app.registry();

    let outcome = tokio::select! {
        result = session(app, &registry, &instance_id, &reporter) => result,
        _ = tokio::signal::ctrl_c() => {
            reporter.warn("interrupted, tearing down");
            Err(anyhow::anyhow!("interrupted"))
        }
    };
    let sweep = registry.shutdown(&reporter).await;

    let results = match (outcome, sweep) {
        (Ok(results), Ok(())) => results,
        (Err(e), Ok(())) | (Ok(_), Err(e)) => return Err(e),
        (Err(e), Err(sweep)) => return Err(e.context(format!("teardown also failed: {sweep:#}"))),
    };

    let passed = results.iter().all(|r| r.passed);
    if app.output.json {
        println!(
            "{}",
            json::format(&json::ChecksOutput {
                instance_id: &instance_id,
                passed,
                checks: &results,
            })?
        );
    } else {
        HumanRenderer::new(&app.output).render_checks(&results);
    }
    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn session(
    app: &AppContext,
    registry: &Registry,
    instance_id: &str,
    reporter: &impl ProgressReporter,
) -> Result<Vec<CheckResult>> {
    registry.set_up(instance_id, || app.shell(), reporter).await?;
    let lifecycle = registry.get_or_create(instance_id, || app.shell());
    let guard = lifecycle.lock().await;
    let target = guard.target();
    reporter.step(&format!("verifying hotplug configuration of {}...", target.nic));
    verify_hotplug(
        guard.probe(),
        &target.nic,
        target.device_index,
        &app.config.egress_url,
        reporter,
    )
    .await
}
