//! Configuration module for the API failure simulator
//!
//! Provides hierarchical configuration with support for:
//! - YAML/TOML/JSON config files
//! - Environment variable overrides
//! - Validation

mod delay;
mod rate_limit;

pub use delay::*;
pub use rate_limit::*;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use crate::error::{SimulationError, SimulatorResult};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Per-client throttling
    pub rate_limit: RateLimitConfig,
    /// Simulated delay bounds
    pub delay: DelayConfig,
    /// Telemetry settings
    pub telemetry: TelemetryConfig,
    /// Seed for the random scenario picker (None = entropy)
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            delay: DelayConfig::default(),
            telemetry: TelemetryConfig::default(),
            seed: None,
        }
    }
}

impl SimulatorConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> SimulatorResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SimulationError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .map_err(|e| SimulationError::Config(format!("YAML parse error: {}", e)))?,
            Some("toml") => toml::from_str(&content)
                .map_err(|e| SimulationError::Config(format!("TOML parse error: {}", e)))?,
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| SimulationError::Config(format!("JSON parse error: {}", e)))?,
            _ => return Err(SimulationError::Config(
                "Unsupported config file format. Use .yaml, .toml, or .json".to_string()
            )),
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn from_env() -> SimulatorResult<Self> {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("FAILSIM_PORT") {
            config.server.port = port.parse().map_err(|_| {
                SimulationError::Config("Invalid port number".to_string())
            })?;
        }

        if let Ok(host) = std::env::var("FAILSIM_HOST") {
            config.server.host = host;
        }

        if let Ok(quota) = std::env::var("FAILSIM_RATE_LIMIT_QUOTA") {
            config.rate_limit.quota = quota.parse().map_err(|_| {
                SimulationError::Config("Invalid rate limit quota".to_string())
            })?;
        }

        if let Ok(window) = std::env::var("FAILSIM_RATE_LIMIT_WINDOW_SECS") {
            let secs: u64 = window.parse().map_err(|_| {
                SimulationError::Config("Invalid rate limit window".to_string())
            })?;
            config.rate_limit.window = Duration::from_secs(secs);
        }

        if let Ok(seed) = std::env::var("FAILSIM_SEED") {
            config.seed = Some(seed.parse().map_err(|_| {
                SimulationError::Config("Invalid seed value".to_string())
            })?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> SimulatorResult<()> {
        self.server.validate()?;
        self.rate_limit.validate()?;
        self.delay.validate()?;

        // The transport timeout must never cut a simulated delay short
        if self.server.request_timeout <= self.delay.max_delay {
            return Err(SimulationError::invalid_param(
                "server.request_timeout",
                "request_timeout must be longer than delay.max_delay",
            ));
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Transport-level request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// How long shutdown waits for in-flight requests
    #[serde(with = "humantime_serde")]
    pub drain_timeout: Duration,
    /// Enable permissive CORS
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout: Duration::from_secs(60),
            drain_timeout: Duration::from_secs(35),
            cors_enabled: true,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> SimulatorResult<()> {
        if self.port == 0 {
            return Err(SimulationError::invalid_param("server.port", "Port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(SimulationError::invalid_param("server.host", "Host cannot be empty"));
        }
        Ok(())
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> SimulatorResult<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| SimulationError::Config(format!("Invalid socket address: {}", e)))
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Enable log output
    pub enabled: bool,
    /// Log level
    pub log_level: String,
    /// Enable JSON logging
    pub json_logs: bool,
    /// Service name reported at startup
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: "info".to_string(),
            json_logs: false,
            service_name: "api-failure-simulator".to_string(),
        }
    }
}

/// Helper module for Duration serialization ("60s", "500ms", "2m")
pub(crate) mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        if let Some(millis) = s.strip_suffix("ms") {
            millis.trim().parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| format!("Invalid duration: {}", s))
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim().parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| format!("Invalid duration: {}", s))
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim().parse::<u64>()
                .ok()
                .and_then(|m| m.checked_mul(60))
                .map(Duration::from_secs)
                .ok_or_else(|| format!("Invalid duration: {}", s))
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| format!("Invalid duration: {}", s))
        }
    }
}
