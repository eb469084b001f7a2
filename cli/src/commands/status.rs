//! `status`: report the inferred lifecycle state.

use anyhow::Result;

use super::discover_instance;
use crate::app::AppContext;
use crate::output::{HumanRenderer, json};

/// Run `status`.
///
/// # Errors
///
/// Returns an error if the state cannot be inferred.
pub async fn run(app: &AppContext) -> Result<()> {
    let instance_id = discover_instance(&app.probe()).await?;
    let registry = app.registry();
    let lifecycle = registry.get_or_create(&instance_id, || app.shell());
    let state = lifecycle.lock().await.state().await?;

    if app.output.json {
        println!(
            "{}",
            json::format(&json::StateOutput {
                instance_id: &instance_id,
                nic: &app.config.nic,
                state,
            })?
        );
    } else {
        HumanRenderer::new(&app.output).render_state(&instance_id, &app.config.nic, state);
    }
    Ok(())
}
