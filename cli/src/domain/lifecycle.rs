//! Lifecycle states and the timing contract of the bounded polls.

use std::time::Duration;

use serde::Serialize;

/// Where a secondary interface is in its lifecycle.
///
/// Ordered: set-up walks forwards, tear-down walks backwards. The state is
/// never cached; it is inferred from the provider and the remote probe each
/// time it is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Absent,
    Created,
    Attached,
    Up,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Absent => "absent",
            Self::Created => "created",
            Self::Attached => "attached",
            Self::Up => "up",
        })
    }
}

/// A fixed-interval poll bounded by an attempt count.
///
/// The condition is checked up to `max_attempts` times with `interval`
/// between checks. `ceiling()` is the nominal upper bound on the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Policy that polls every `interval` for at most `timeout`.
    ///
    /// `max_attempts` is `timeout / interval` rounded up, and at least one.
    #[must_use]
    pub fn within(timeout: Duration, interval: Duration) -> Self {
        let interval_ms = interval.as_millis().max(1);
        let attempts = timeout.as_millis().div_ceil(interval_ms).max(1);
        Self {
            max_attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
            interval,
        }
    }

    #[must_use]
    pub fn ceiling(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

/// Attach: 10 checks, 3s apart.
pub const ATTACH_POLL: PollPolicy = PollPolicy::new(10, Duration::from_secs(3));

/// Detach: 40 checks, 3s apart.
pub const DETACH_POLL: PollPolicy = PollPolicy::new(40, Duration::from_secs(3));

/// OS link-up: 20s timeout, 3s poll.
pub const LINK_UP_TIMEOUT: Duration = Duration::from_secs(20);
pub const LINK_UP_INTERVAL: Duration = Duration::from_secs(3);

/// Wait after deleting an interface before the provider stops listing it.
pub const DELETE_SETTLE_DELAY: Duration = Duration::from_secs(3);

/// Every timing knob of an interface lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicy {
    pub attach: PollPolicy,
    pub detach: PollPolicy,
    pub link_up: PollPolicy,
    pub settle_delay: Duration,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            attach: ATTACH_POLL,
            detach: DETACH_POLL,
            link_up: PollPolicy::within(LINK_UP_TIMEOUT, LINK_UP_INTERVAL),
            settle_delay: DELETE_SETTLE_DELAY,
        }
    }
}
