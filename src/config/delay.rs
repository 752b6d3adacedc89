//! Simulated delay configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::error::{SimulationError, SimulatorResult};

/// Default floor for every simulated delay, overrides and jitter included
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(100);

/// Bounds for the delay-based faults (`timeout`, `slow`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    /// Delay before a simulated gateway timeout is returned
    #[serde(with = "crate::config::humantime_serde")]
    pub timeout_delay: Duration,
    /// Delay before a simulated slow success is returned
    #[serde(with = "crate::config::humantime_serde")]
    pub slow_delay: Duration,
    /// Floor for every simulated delay, including request overrides
    #[serde(with = "crate::config::humantime_serde")]
    pub min_delay: Duration,
    /// Hard cap for every simulated delay, including request overrides
    #[serde(with = "crate::config::humantime_serde")]
    pub max_delay: Duration,
    /// Lower jitter offset in milliseconds (may be negative)
    pub jitter_min_ms: i64,
    /// Upper jitter offset in milliseconds
    pub jitter_max_ms: i64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            timeout_delay: Duration::from_secs(5),
            slow_delay: Duration::from_secs(5),
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: Duration::from_secs(30),
            jitter_min_ms: -1000,
            jitter_max_ms: 2000,
        }
    }
}

impl DelayConfig {
    pub fn validate(&self) -> SimulatorResult<()> {
        if self.max_delay.is_zero() {
            return Err(SimulationError::invalid_param(
                "delay.max_delay",
                "max_delay must be greater than 0",
            ));
        }
        if self.min_delay > self.max_delay {
            return Err(SimulationError::invalid_param(
                "delay.min_delay",
                "min_delay cannot exceed max_delay",
            ));
        }
        if self.timeout_delay > self.max_delay {
            return Err(SimulationError::invalid_param(
                "delay.timeout_delay",
                "timeout_delay cannot exceed max_delay",
            ));
        }
        if self.slow_delay > self.max_delay {
            return Err(SimulationError::invalid_param(
                "delay.slow_delay",
                "slow_delay cannot exceed max_delay",
            ));
        }
        if self.jitter_min_ms > self.jitter_max_ms {
            return Err(SimulationError::invalid_param(
                "delay.jitter_min_ms",
                "jitter_min_ms cannot exceed jitter_max_ms",
            ));
        }
        Ok(())
    }

    /// Keep a requested delay within `[min_delay, max_delay]`
    pub fn clamp(&self, delay: Duration) -> Duration {
        delay.max(self.min_delay).min(self.max_delay)
    }

    /// Apply a jitter offset, then clamp
    pub fn apply_jitter(&self, delay: Duration, offset_ms: i64) -> Duration {
        let base = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
        let jittered = Duration::from_millis(base.saturating_add(offset_ms).max(0) as u64);
        self.clamp(jittered)
    }
}
