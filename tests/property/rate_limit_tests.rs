//! Property-based tests for the fixed-window rate limiter

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use api_failure_simulator::engine::{FixedWindowRateLimiter, ManualClock, RateLimiter};

fn limiter(quota: u32, window_secs: u64) -> (FixedWindowRateLimiter, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let limiter = FixedWindowRateLimiter::with_clock(quota, Duration::from_secs(window_secs), clock.clone());
    (limiter, clock)
}

proptest! {
    /// Exactly `quota` requests pass within one window
    #[test]
    fn test_exactly_quota_allowed(
        quota in 1u32..50,
        attempts in 1u32..120,
    ) {
        let (limiter, _clock) = limiter(quota, 60);
        let allowed = (0..attempts).filter(|_| limiter.check("c").allowed).count() as u32;

        prop_assert_eq!(allowed, attempts.min(quota));
    }

    /// Remaining counts down and Retry-After stays within the window
    #[test]
    fn test_verdict_fields(
        quota in 1u32..20,
        elapsed_ms in 0u64..60_000,
    ) {
        let (limiter, clock) = limiter(quota, 60);

        for i in 0..quota {
            let verdict = limiter.check("c");
            prop_assert!(verdict.allowed);
            prop_assert_eq!(verdict.remaining, quota - i - 1);
            prop_assert_eq!(verdict.retry_after_seconds, 0);
        }

        clock.advance(Duration::from_millis(elapsed_ms));
        let denied = limiter.check("c");
        prop_assert!(!denied.allowed);
        prop_assert_eq!(denied.remaining, 0);
        prop_assert!(denied.retry_after_seconds >= 1);
        prop_assert!(denied.retry_after_seconds <= 60);
    }

    /// A full window later the client is admitted again
    #[test]
    fn test_rollover(
        quota in 1u32..20,
        extra_secs in 0u64..120,
    ) {
        let (limiter, clock) = limiter(quota, 60);
        for _ in 0..=quota {
            limiter.check("c");
        }

        clock.advance(Duration::from_secs(60 + extra_secs));
        let verdict = limiter.check("c");
        prop_assert!(verdict.allowed);
        prop_assert_eq!(verdict.remaining, quota - 1);
    }

    /// Buckets never share state
    #[test]
    fn test_clients_isolated(
        clients in proptest::collection::hash_set("[a-z0-9]{1,8}", 1..10),
    ) {
        let (limiter, _clock) = limiter(1, 60);
        for client in &clients {
            prop_assert!(limiter.check(client).allowed);
        }
        for client in &clients {
            prop_assert!(!limiter.check(client).allowed);
        }
        prop_assert_eq!(limiter.bucket_count(), clients.len());
    }
}
