//! `down`: tear the secondary interface off the SSH target.

use anyhow::Result;

use super::discover_instance;
use crate::app::AppContext;
use crate::output::TerminalReporter;

/// Run `down`. A no-op when nothing is attached.
///
/// # Errors
///
/// Returns the first failing step.
pub async fn run(app: &AppContext) -> Result<()> {
    let instance_id = discover_instance(&app.probe()).await?;
    let reporter = TerminalReporter::new(&app.output);
    let registry = app.registry();
    registry.get_or_create(&instance_id, || app.shell());
    registry.tear_down(&instance_id, &reporter).await?;
    app.output
        .success(&format!("no secondary interface left on {instance_id}"));
    Ok(())
}
