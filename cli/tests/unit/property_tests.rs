//! Property-based tests for poll policy arithmetic.

use std::time::Duration;

use eni_harness::domain::PollPolicy;
use proptest::prelude::*;

proptest! {
    /// A policy built from a timeout never waits less than the timeout and
    /// overshoots it by less than one interval.
    #[test]
    fn within_covers_timeout_by_at_most_one_interval(
        timeout_ms in 1u64..600_000,
        interval_ms in 1u64..60_000,
    ) {
        let timeout = Duration::from_millis(timeout_ms);
        let interval = Duration::from_millis(interval_ms);
        let policy = PollPolicy::within(timeout, interval);
        prop_assert!(policy.max_attempts >= 1);
        prop_assert!(policy.ceiling() >= timeout);
        prop_assert!(policy.ceiling() < timeout + interval);
    }

    /// The ceiling is exactly attempts times interval.
    #[test]
    fn ceiling_is_attempts_times_interval(attempts in 1u32..1_000, interval_ms in 1u64..10_000) {
        let policy = PollPolicy::new(attempts, Duration::from_millis(interval_ms));
        prop_assert_eq!(policy.ceiling(), Duration::from_millis(interval_ms * u64::from(attempts)));
    }
}
