//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator. Callers that need to branch on the failure kind use
//! `anyhow::Error::downcast_ref::<HarnessError>()`.

use std::time::Duration;

use thiserror::Error;

/// Fatal harness failures.
///
/// None of these are retried. Bounded polls are the only retry mechanism in
/// the harness and they surface [`HarnessError::Timeout`] when exhausted.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A uniqueness-filtered lookup returned more than one match. The test
    /// environment itself is inconsistent and must be cleaned up by hand.
    #[error(
        "found {count} {kind}s matching {key:?}; expected at most one.\n\n\
         Remove the stray resources manually before running again."
    )]
    AmbiguousResource {
        kind: &'static str,
        key: String,
        count: usize,
    },

    /// A bounded poll exhausted its attempts.
    #[error("timed out after {}s ({attempts} attempts) waiting for {operation}", waited.as_secs())]
    Timeout {
        operation: String,
        attempts: u32,
        waited: Duration,
    },

    /// The remote execution transport could not run a command.
    #[error("remote transport failed: {0}")]
    Transport(String),

    /// A mutating remote command ran but exited non-zero.
    #[error("remote command `{command}` exited with status {status}: {output}")]
    CommandFailed {
        command: String,
        status: i32,
        output: String,
    },

    /// The cloud provider rejected or failed a request.
    #[error("cloud provider call `{operation}` failed: {message}")]
    Provider { operation: String, message: String },

    /// The instance under test does not exist.
    #[error("instance {0} not found")]
    InstanceNotFound(String),

    /// The instance under test has no interface at device index 0.
    #[error("instance {0} has no primary interface at device index 0")]
    NoPrimaryInterface(String),
}

impl HarnessError {
    /// Whether the error came from a bounded poll running out of attempts.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
