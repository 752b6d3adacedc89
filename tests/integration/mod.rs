//! Integration test module
//!
//! End-to-end tests for the simulation endpoints.

pub mod common;
pub mod status_tests;
pub mod fault_tests;
pub mod rate_limit_tests;
