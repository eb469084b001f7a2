//! Fixed-interval bounded polling.

use std::future::Future;

use anyhow::Result;

use crate::domain::{HarnessError, PollPolicy};

/// Check `condition` until it holds, at most `policy.max_attempts` times,
/// sleeping `policy.interval` between checks.
///
/// Errors from `condition` abort the wait immediately. Running out of
/// attempts yields [`HarnessError::Timeout`] naming `operation`.
///
/// # Errors
///
/// Returns the first error from `condition`, or a timeout.
pub async fn wait_until<F, Fut>(policy: PollPolicy, operation: &str, mut condition: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    for attempt in 1..=policy.max_attempts {
        if condition().await? {
            tracing::debug!(operation, attempt, "condition satisfied");
            return Ok(());
        }
        tracing::debug!(operation, attempt, max = policy.max_attempts, "not yet");
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }
    Err(HarnessError::Timeout {
        operation: operation.to_string(),
        attempts: policy.max_attempts,
        waited: policy.ceiling(),
    }
    .into())
}
