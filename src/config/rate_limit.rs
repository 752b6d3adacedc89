//! Rate limiting configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::error::{SimulationError, SimulatorResult};

/// Fixed-window throttling applied to every simulation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,
    /// Maximum requests per window
    pub quota: u32,
    /// Window length
    #[serde(with = "crate::config::humantime_serde")]
    pub window: Duration,
    /// Header whose value identifies the client (falls back to the peer address)
    pub client_key_header: String,
    /// Buckets untouched for this long are evicted by housekeeping
    #[serde(with = "crate::config::humantime_serde")]
    pub idle_eviction: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            quota: 10,
            window: Duration::from_secs(60),
            client_key_header: "x-api-key".to_string(),
            idle_eviction: Duration::from_secs(600),
        }
    }
}

impl RateLimitConfig {
    pub fn new(quota: u32, window: Duration) -> Self {
        Self {
            quota,
            window,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> SimulatorResult<()> {
        if self.quota == 0 {
            return Err(SimulationError::invalid_param(
                "rate_limit.quota",
                "quota must be greater than 0",
            ));
        }
        if self.window.is_zero() {
            return Err(SimulationError::invalid_param(
                "rate_limit.window",
                "window must be greater than 0",
            ));
        }
        if self.client_key_header.trim().is_empty() {
            return Err(SimulationError::invalid_param(
                "rate_limit.client_key_header",
                "client_key_header cannot be empty",
            ));
        }
        if self.idle_eviction < self.window {
            return Err(SimulationError::invalid_param(
                "rate_limit.idle_eviction",
                "idle_eviction must be at least one window long",
            ));
        }
        Ok(())
    }

    /// Window length in whole seconds, as reported to clients
    pub fn window_secs(&self) -> u64 {
        self.window.as_secs_f64().ceil() as u64
    }
}
