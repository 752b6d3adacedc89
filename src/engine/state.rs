//! Engine state and statistics tracking

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::catalog::Category;

/// Thread-safe engine counters
pub struct EngineState {
    total_requests: AtomicU64,
    throttled: AtomicU64,
    rejected: AtomicU64,
    by_category: RwLock<HashMap<Category, u64>>,
    delays: RwLock<DelayTracker>,
}

impl EngineState {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            throttled: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            by_category: RwLock::new(HashMap::new()),
            delays: RwLock::new(DelayTracker::default()),
        }
    }

    pub fn increment_requests(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// A request answered with a real throttle
    pub fn increment_throttled(&self) {
        self.throttled.fetch_add(1, Ordering::Relaxed);
    }

    /// A request refused for invalid parameters
    pub fn increment_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scenario(&self, category: Category) {
        *self.by_category.write().entry(category).or_insert(0) += 1;
    }

    pub fn record_delay(&self, delay: Duration) {
        self.delays.write().record(delay);
    }

    /// Get current statistics
    pub fn stats(&self) -> EngineStats {
        let by_category = self
            .by_category
            .read()
            .iter()
            .map(|(category, count)| (category.to_string(), *count))
            .collect();

        EngineStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            by_category,
            delays: self.delays.read().stats(),
        }
    }

    /// Reset all statistics
    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.throttled.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
        self.by_category.write().clear();
        *self.delays.write() = DelayTracker::default();
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineStats {
    pub total_requests: u64,
    pub throttled: u64,
    pub rejected: u64,
    pub by_category: HashMap<String, u64>,
    pub delays: DelayStats,
}

impl EngineStats {
    /// Share of requests answered with a real throttle
    pub fn throttle_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.throttled as f64 / self.total_requests as f64
        }
    }
}

#[derive(Default)]
struct DelayTracker {
    count: u64,
    sum: Duration,
    max: Duration,
}

impl DelayTracker {
    fn record(&mut self, delay: Duration) {
        self.count += 1;
        self.sum += delay;
        self.max = self.max.max(delay);
    }

    fn stats(&self) -> DelayStats {
        if self.count == 0 {
            return DelayStats::default();
        }

        DelayStats {
            count: self.count,
            total_ms: self.sum.as_millis() as u64,
            mean_ms: self.sum.as_secs_f64() * 1000.0 / self.count as f64,
            max_ms: self.max.as_millis() as u64,
        }
    }
}

/// Simulated delay statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelayStats {
    pub count: u64,
    pub total_ms: u64,
    pub mean_ms: f64,
    pub max_ms: u64,
}
