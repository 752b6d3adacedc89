//! # API Failure Simulator
//!
//! Deterministic HTTP failure simulator for practicing API troubleshooting.
//!
//! Clients ask for a scenario, either a status code or a named fault such as
//! `timeout` or `malformed-json`, and receive a realistic, reproducible
//! response for it. Every request is charged against a per-client
//! fixed-window rate limiter, so throttling can be observed as well.
//!
//! ## Features
//!
//! - **Scenario catalog**: curated descriptions for common error codes plus
//!   named network and payload faults
//! - **Fixed-window rate limiting**: per-client buckets with `Retry-After`
//! - **Delay simulation**: timeouts and slow responses without blocking
//!   other requests
//! - **Deterministic output**: identical requests produce identical bodies
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use api_failure_simulator::{SimulatorConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SimulatorConfig::default();
//!     run_server(config).await
//! }
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod server;
pub mod telemetry;

pub use catalog::{ScenarioCatalog, ScenarioDescriptor, ScenarioId};
pub use config::SimulatorConfig;
pub use engine::{SimulationEngine, SimulationRequest, SimulationResponse};
pub use error::{SimulationError, SimulatorResult};
pub use server::run_server;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
