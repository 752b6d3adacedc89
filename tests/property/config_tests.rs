//! Property-based tests for configuration validation

use std::time::Duration;

use proptest::prelude::*;
use api_failure_simulator::config::{DelayConfig, SimulatorConfig};

proptest! {
    /// Test that valid port numbers pass validation
    #[test]
    fn test_valid_port_passes(
        port in 1u16..=65535,
    ) {
        let mut config = SimulatorConfig::default();
        config.server.port = port;

        let result = config.validate();
        prop_assert!(result.is_ok(), "Port {} should be valid", port);
    }

    /// Any positive quota is accepted
    #[test]
    fn test_valid_quota(
        quota in 1u32..100_000,
    ) {
        let mut config = SimulatorConfig::default();
        config.rate_limit.quota = quota;

        prop_assert!(config.validate().is_ok());
    }

    /// Jittered delays never leave [floor, max_delay]
    #[test]
    fn test_jitter_bounds(
        base_ms in 0u64..60_000,
        offset_ms in -5_000i64..5_000,
    ) {
        let config = DelayConfig::default();
        let delay = config.apply_jitter(Duration::from_millis(base_ms), offset_ms);

        prop_assert!(delay >= config.min_delay);
        prop_assert!(delay <= config.max_delay);
    }

    /// Clamping keeps every delay within the floor and the cap
    #[test]
    fn test_clamp(
        requested_ms in 0u64..600_000,
    ) {
        let config = DelayConfig::default();
        let requested = Duration::from_millis(requested_ms);
        let clamped = config.clamp(requested);

        prop_assert!(clamped >= config.min_delay);
        prop_assert!(clamped <= config.max_delay);
        if requested >= config.min_delay && requested <= config.max_delay {
            prop_assert_eq!(clamped, requested);
        }
    }

    /// Duration strings in seconds survive a YAML round trip
    #[test]
    fn test_window_yaml_round_trip(
        window_secs in 1u64..3600,
    ) {
        let mut config = SimulatorConfig::default();
        config.rate_limit.window = Duration::from_secs(window_secs);

        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: SimulatorConfig = serde_yaml::from_str(&yaml).unwrap();
        prop_assert_eq!(parsed.rate_limit.window, config.rate_limit.window);
    }
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn test_zero_port_fails() {
        let mut config = SimulatorConfig::default();
        config.server.port = 0;

        assert!(config.validate().is_err(), "Port 0 should fail validation");
    }

    #[test]
    fn test_zero_quota_fails() {
        let mut config = SimulatorConfig::default();
        config.rate_limit.quota = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config_valid() {
        let config = SimulatorConfig::default();
        let result = config.validate();
        assert!(result.is_ok(), "Default config should be valid: {:?}", result);
    }

    #[test]
    fn test_timeout_must_outlast_max_delay() {
        let mut config = SimulatorConfig::default();
        config.server.request_timeout = config.delay.max_delay;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "rate_limit:\n  quota: 3\n  window: 30s\n";
        let config: SimulatorConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.rate_limit.quota, 3);
        assert_eq!(config.rate_limit.window, Duration::from_secs(30));
        assert_eq!(config.delay.max_delay, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }
}
