//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;

use crate::domain::{CheckResult, LifecycleState};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the inferred lifecycle state of one instance's interface.
    pub fn render_state(&self, instance_id: &str, nic: &str, state: LifecycleState) {
        self.ctx.kv("Instance:", instance_id);
        self.ctx.kv("Interface:", nic);
        let styled = match state {
            LifecycleState::Up => state.style(self.ctx.styles.success).to_string(),
            LifecycleState::Absent => state.style(self.ctx.styles.dim).to_string(),
            LifecycleState::Created | LifecycleState::Attached => {
                state.style(self.ctx.styles.warning).to_string()
            }
        };
        self.ctx.kv("State:", &styled);
    }

    /// Render a summary of hotplug check results. Each check has already
    /// been reported as it ran.
    pub fn render_checks(&self, results: &[CheckResult]) {
        let failed = results.iter().filter(|r| !r.passed).count();
        if failed == 0 {
            self.ctx
                .success(&format!("all {} hotplug checks passed", results.len()));
        } else {
            self.ctx.header(&format!(
                "{failed} of {} hotplug checks failed:",
                results.len()
            ));
            for result in results.iter().filter(|r| !r.passed) {
                self.ctx
                    .kv(&format!("{}:", result.name), &format!("`{}` {}", result.command, result.detail));
            }
        }
    }
}
