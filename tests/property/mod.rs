//! Property-based tests using proptest
//!
//! Invariants of the catalog, the rate limiter and configuration.

pub mod catalog_tests;
pub mod rate_limit_tests;
pub mod config_tests;
