//! `up`: bring the secondary interface up on the SSH target.

use anyhow::Result;

use super::discover_instance;
use crate::app::AppContext;
use crate::output::TerminalReporter;

/// Run `up`.
///
/// Resources created before a failure are left in place; `down` reconciles
/// them.
///
/// # Errors
///
/// Returns the first failing step.
pub async fn run(app: &AppContext) -> Result<()> {
    let instance_id = discover_instance(&app.probe()).await?;
    let reporter = TerminalReporter::new(&app.output);
    app.registry()
        .set_up(&instance_id, || app.shell(), &reporter)
        .await?;
    app.output
        .success(&format!("{} is up on {instance_id}", app.config.nic));
    Ok(())
}
