//! Prometheus metrics implementation

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;

/// Global metrics registry
pub struct MetricsRegistry {
    counters: RwLock<BTreeMap<String, AtomicU64>>,
    gauges: RwLock<BTreeMap<String, AtomicU64>>,
    histograms: RwLock<BTreeMap<String, Histogram>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(BTreeMap::new()),
            gauges: RwLock::new(BTreeMap::new()),
            histograms: RwLock::new(BTreeMap::new()),
        }
    }

    /// Increment a counter
    pub fn counter_inc(&self, name: &str, value: u64) {
        let counters = self.counters.read();
        if let Some(counter) = counters.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
        } else {
            drop(counters);
            let mut counters = self.counters.write();
            counters.entry(name.to_string())
                .or_insert_with(|| AtomicU64::new(0))
                .fetch_add(value, Ordering::Relaxed);
        }
    }

    /// Read a counter; 0 when never incremented
    pub fn counter_get(&self, name: &str) -> u64 {
        self.counters
            .read()
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Set a gauge value
    pub fn gauge_set(&self, name: &str, value: u64) {
        let mut gauges = self.gauges.write();
        gauges.entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .store(value, Ordering::Relaxed);
    }

    /// Record a histogram observation
    pub fn histogram_observe(&self, name: &str, value: f64) {
        let histograms = self.histograms.read();
        if let Some(hist) = histograms.get(name) {
            hist.observe(value);
        } else {
            drop(histograms);
            let mut histograms = self.histograms.write();
            histograms.entry(name.to_string())
                .or_insert_with(Histogram::new)
                .observe(value);
        }
    }

    /// Export metrics in Prometheus format
    pub fn export_prometheus(&self) -> String {
        let mut output = String::new();

        // Labeled series sort right after their base name, so one TYPE line per family
        let mut family = "";
        for (name, counter) in self.counters.read().iter() {
            if base_name(name) != family {
                family = base_name(name);
                output.push_str(&format!("# TYPE {} counter\n", family));
            }
            output.push_str(&format!("{} {}\n", name, counter.load(Ordering::Relaxed)));
        }

        for (name, gauge) in self.gauges.read().iter() {
            let value = gauge.load(Ordering::Relaxed);
            output.push_str(&format!(
                "# TYPE {} gauge\n{} {}\n",
                base_name(name), name, value
            ));
        }

        for (name, hist) in self.histograms.read().iter() {
            let snapshot = hist.snapshot();
            output.push_str(&format!("# TYPE {} histogram\n", name));
            for (bound, count) in HISTOGRAM_BUCKETS.iter().zip(snapshot.buckets.iter()) {
                output.push_str(&format!("{}_bucket{{le=\"{}\"}} {}\n", name, bound, count));
            }
            output.push_str(&format!("{}_bucket{{le=\"+Inf\"}} {}\n", name, snapshot.count));
            output.push_str(&format!("{}_sum {}\n", name, snapshot.sum));
            output.push_str(&format!("{}_count {}\n", name, snapshot.count));
        }

        output
    }

    /// Reset all metrics
    pub fn reset(&self) {
        for counter in self.counters.write().values() {
            counter.store(0, Ordering::Relaxed);
        }
        for gauge in self.gauges.write().values() {
            gauge.store(0, Ordering::Relaxed);
        }
        self.histograms.write().clear();
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn base_name(key: &str) -> &str {
    key.split('{').next().unwrap_or(key)
}

const BUCKET_COUNT: usize = 10;

/// Upper bounds (seconds) of the delay histogram buckets
pub const HISTOGRAM_BUCKETS: [f64; BUCKET_COUNT] = [0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0];

/// Cumulative-bucket histogram
pub struct Histogram {
    inner: Mutex<HistogramSnapshot>,
}

impl Histogram {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HistogramSnapshot {
                buckets: [0; BUCKET_COUNT],
                ..Default::default()
            }),
        }
    }

    pub fn observe(&self, value: f64) {
        let mut inner = self.inner.lock();
        for (bound, bucket) in HISTOGRAM_BUCKETS.iter().zip(inner.buckets.iter_mut()) {
            if value <= *bound {
                *bucket += 1;
            }
        }
        inner.count += 1;
        inner.sum += value;
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        self.inner.lock().clone()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time histogram contents
#[derive(Debug, Clone, Default)]
pub struct HistogramSnapshot {
    pub buckets: [u64; BUCKET_COUNT],
    pub count: u64,
    pub sum: f64,
}

/// Pre-defined metric names
pub mod metric_names {
    pub const REQUESTS_TOTAL: &str = "failsim_requests_total";
    pub const THROTTLED_TOTAL: &str = "failsim_throttled_total";
    pub const ERRORS_TOTAL: &str = "failsim_errors_total";
    pub const DELAY_SECONDS: &str = "failsim_simulated_delay_seconds";
    pub const ACTIVE_BUCKETS: &str = "failsim_rate_limit_buckets";
    pub const IN_FLIGHT: &str = "failsim_in_flight_requests";
}

/// Convenience functions for common metrics
pub struct SimulatorMetrics {
    registry: MetricsRegistry,
}

impl SimulatorMetrics {
    pub fn new() -> Self {
        let metrics = Self {
            registry: MetricsRegistry::new(),
        };

        metrics.set_active_buckets(0);
        metrics.set_in_flight(0);

        metrics
    }

    /// Record one simulated response
    pub fn record_simulation(&self, scenario: &str, status: u16, throttled: bool, delay: Duration) {
        let key = format!(
            "{}{{scenario=\"{}\",status=\"{}\"}}",
            metric_names::REQUESTS_TOTAL, scenario, status
        );
        self.registry.counter_inc(&key, 1);
        self.registry.counter_inc(metric_names::REQUESTS_TOTAL, 1);

        if throttled {
            self.registry.counter_inc(metric_names::THROTTLED_TOTAL, 1);
        }

        if !delay.is_zero() {
            self.registry.histogram_observe(metric_names::DELAY_SECONDS, delay.as_secs_f64());
        }
    }

    /// Record a rejected request with type label
    pub fn record_error(&self, error_type: &str) {
        let key = format!("{}{{error_type=\"{}\"}}", metric_names::ERRORS_TOTAL, error_type);
        self.registry.counter_inc(&key, 1);
        self.registry.counter_inc(metric_names::ERRORS_TOTAL, 1);
    }

    /// Number of tracked rate-limit buckets
    pub fn set_active_buckets(&self, count: u64) {
        self.registry.gauge_set(metric_names::ACTIVE_BUCKETS, count);
    }

    pub fn set_in_flight(&self, count: u64) {
        self.registry.gauge_set(metric_names::IN_FLIGHT, count);
    }

    pub fn requests_total(&self) -> u64 {
        self.registry.counter_get(metric_names::REQUESTS_TOTAL)
    }

    pub fn throttled_total(&self) -> u64 {
        self.registry.counter_get(metric_names::THROTTLED_TOTAL)
    }

    /// Export metrics in Prometheus format
    pub fn export(&self) -> String {
        self.registry.export_prometheus()
    }

    /// Reset all metrics
    pub fn reset(&self) {
        self.registry.reset();
    }
}

impl Default for SimulatorMetrics {
    fn default() -> Self {
        Self::new()
    }
}
