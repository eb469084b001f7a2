//! JSON output helpers.
//!
//! Every `--json` code path prints exactly one pretty-printed document on
//! stdout: a result object on success, the error object on failure.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::{CheckResult, LifecycleState};

/// `status` output.
#[derive(Debug, Serialize)]
pub struct StateOutput<'a> {
    pub instance_id: &'a str,
    pub nic: &'a str,
    pub state: LifecycleState,
}

/// `check` output.
#[derive(Debug, Serialize)]
pub struct ChecksOutput<'a> {
    pub instance_id: &'a str,
    pub passed: bool,
    pub checks: &'a [CheckResult],
}

/// Pretty-print any output document.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("JSON serialization failed")
}

/// Format the JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Stable machine-readable code for the error object.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    use crate::domain::HarnessError;

    match err.downcast_ref::<HarnessError>() {
        Some(HarnessError::AmbiguousResource { .. }) => "ambiguous_resource",
        Some(HarnessError::Timeout { .. }) => "timeout",
        Some(HarnessError::Transport(_)) => "transport",
        Some(HarnessError::CommandFailed { .. }) => "command_failed",
        Some(HarnessError::Provider { .. }) => "provider",
        Some(HarnessError::InstanceNotFound(_)) => "instance_not_found",
        Some(HarnessError::NoPrimaryInterface(_)) => "no_primary_interface",
        None => "error",
    }
}
