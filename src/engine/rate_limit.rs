//! Fixed-Window Rate Limiting
//!
//! Implements the per-client throttle that every simulation request passes
//! through before any scenario is built:
//! - One bucket per client identifier, created on first use
//! - Counter reset when the window rolls over
//! - Per-bucket mutual exclusion so concurrent calls never lose increments
//! - Housekeeping eviction of idle buckets off the hot path

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;

/// Source of the current instant, swappable for simulated time in tests
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move simulated time forward
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

/// Decision for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitVerdict {
    pub allowed: bool,
    /// Requests left in the current window
    pub remaining: u32,
    /// Seconds to wait before retrying; 0 when allowed
    pub retry_after_seconds: u64,
    /// Configured quota
    pub limit: u32,
    /// Seconds until the current window ends
    pub reset_after_seconds: u64,
    /// False when the verdict did not come from a limiter
    pub enforced: bool,
}

impl RateLimitVerdict {
    /// Verdict used when throttling is switched off
    pub fn unlimited() -> Self {
        Self {
            allowed: true,
            remaining: u32::MAX,
            retry_after_seconds: 0,
            limit: u32::MAX,
            reset_after_seconds: 0,
            enforced: false,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        !self.enforced
    }
}

/// Lifecycle position of a client's bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketState {
    Active,
    Throttled,
}

/// Per-client counter state
#[derive(Debug, Clone)]
pub struct RateLimitBucket {
    count: u32,
    window_start: Instant,
    last_seen: Instant,
}

impl RateLimitBucket {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
            last_seen: now,
        }
    }

    /// Count one request and decide on it
    fn record(&mut self, now: Instant, quota: u32, window: Duration) -> RateLimitVerdict {
        if now.saturating_duration_since(self.window_start) >= window {
            self.count = 0;
            self.window_start = now;
        }

        self.count = self.count.saturating_add(1);
        self.last_seen = now;

        let until_reset = window.saturating_sub(now.saturating_duration_since(self.window_start));
        let reset_after_seconds = ceil_secs(until_reset);

        if self.count > quota {
            RateLimitVerdict {
                allowed: false,
                remaining: 0,
                retry_after_seconds: reset_after_seconds.max(1),
                limit: quota,
                reset_after_seconds,
                enforced: true,
            }
        } else {
            RateLimitVerdict {
                allowed: true,
                remaining: quota - self.count,
                retry_after_seconds: 0,
                limit: quota,
                reset_after_seconds,
                enforced: true,
            }
        }
    }

    fn state(&self, now: Instant, quota: u32, window: Duration) -> BucketState {
        let rolled_over = now.saturating_duration_since(self.window_start) >= window;
        if !rolled_over && self.count > quota {
            BucketState::Throttled
        } else {
            BucketState::Active
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Throttling contract consumed by the engine; backends may be swapped
pub trait RateLimiter: Send + Sync {
    /// Count a request from `client_id` and return the verdict
    fn check(&self, client_id: &str) -> RateLimitVerdict;

    /// Forget a client's bucket; returns whether one existed
    fn reset(&self, client_id: &str) -> bool;

    /// Drop buckets idle for longer than `max_idle`; returns how many were removed
    fn evict_idle(&self, max_idle: Duration) -> usize;

    /// Number of tracked clients
    fn bucket_count(&self) -> usize;
}

/// In-process fixed-window limiter
pub struct FixedWindowRateLimiter {
    /// Buckets keyed by client identifier
    buckets: DashMap<String, Mutex<RateLimitBucket>>,
    quota: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl FixedWindowRateLimiter {
    pub fn new(quota: u32, window: Duration) -> Self {
        Self::with_clock(quota, window, Arc::new(SystemClock))
    }

    pub fn with_clock(quota: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: DashMap::new(),
            quota,
            window,
            clock,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.quota, config.window)
    }

    pub fn quota(&self) -> u32 {
        self.quota
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Lifecycle state for a client; `None` while no bucket exists
    pub fn bucket_state(&self, client_id: &str) -> Option<BucketState> {
        self.buckets.get(client_id).map(|bucket| {
            let now = self.clock.now();
            bucket.lock().state(now, self.quota, self.window)
        })
    }
}

impl RateLimiter for FixedWindowRateLimiter {
    fn check(&self, client_id: &str) -> RateLimitVerdict {
        // A shard read guard is held while the bucket is mutated, so
        // eviction (which needs the write guard) cannot orphan a bucket
        // between lookup and increment.
        let verdict = match self.buckets.get(client_id) {
            Some(bucket) => {
                let mut bucket = bucket.lock();
                bucket.record(self.clock.now(), self.quota, self.window)
            }
            None => {
                let entry = self
                    .buckets
                    .entry(client_id.to_string())
                    .or_insert_with(|| Mutex::new(RateLimitBucket::new(self.clock.now())))
                    .downgrade();
                let mut bucket = entry.lock();
                bucket.record(self.clock.now(), self.quota, self.window)
            }
        };

        if verdict.allowed {
            debug!(
                client_id = %client_id,
                remaining = verdict.remaining,
                "Rate limit check passed"
            );
        } else {
            warn!(
                client_id = %client_id,
                retry_after = verdict.retry_after_seconds,
                "Rate limit exceeded"
            );
        }

        verdict
    }

    fn reset(&self, client_id: &str) -> bool {
        self.buckets.remove(client_id).is_some()
    }

    fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = self.clock.now();
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| {
            now.saturating_duration_since(bucket.get_mut().last_seen) <= max_idle
        });
        let evicted = before.saturating_sub(self.buckets.len());
        debug!(evicted, remaining = self.buckets.len(), "Rate limiter housekeeping");
        evicted
    }

    fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

impl Default for FixedWindowRateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}
