//! Command-line interface
//!
//! Subcommands for:
//! - Starting the simulator server
//! - Listing the scenario catalog
//! - Simulating a single scenario offline
//! - Managing configuration
//! - Health checking running instances

mod commands;

pub use commands::*;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::VERSION;

/// API Failure Simulator: deterministic HTTP failures for practicing error handling
#[derive(Parser, Debug)]
#[command(name = "api-failure-simulator")]
#[command(version = VERSION)]
#[command(about = "Deterministic HTTP failure simulator for practicing API troubleshooting")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path (YAML, TOML, or JSON)
    #[arg(short, long, global = true, env = "FAILSIM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "FAILSIM_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Enable JSON log output
    #[arg(long, global = true, env = "FAILSIM_JSON_LOGS")]
    pub json_logs: bool,

    /// Suppress banner and non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the simulator server
    #[command(alias = "s")]
    Serve(ServeCommand),

    /// List the scenario catalog
    Scenarios(ScenariosCommand),

    /// Produce one simulated response locally, without a server
    #[command(alias = "sim")]
    Simulate(SimulateCommand),

    /// Configuration management
    #[command(alias = "cfg")]
    Config(ConfigCommand),

    /// Health check a running instance
    Health(HealthCommand),

    /// Show version information
    Version,
}

/// Start the simulator server
#[derive(Parser, Debug)]
pub struct ServeCommand {
    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Requests allowed per client per window
    #[arg(long)]
    pub quota: Option<u32>,

    /// Rate-limit window in seconds
    #[arg(long)]
    pub window: Option<u64>,

    /// Disable rate limiting
    #[arg(long)]
    pub no_rate_limit: bool,

    /// Seed for the random scenario picker
    #[arg(long)]
    pub seed: Option<u64>,
}

/// List the scenario catalog
#[derive(Parser, Debug)]
pub struct ScenariosCommand {
    /// Output format (table, json)
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

/// Produce one simulated response locally
#[derive(Parser, Debug)]
pub struct SimulateCommand {
    /// Status code or named fault (e.g. 503, timeout, malformed-json)
    pub scenario: String,

    /// Client identifier for the rate limiter
    #[arg(long, default_value = "cli")]
    pub client: String,

    /// Delay override in seconds for delay-based faults
    #[arg(long)]
    pub seconds: Option<f64>,

    /// Malformed-JSON variant
    #[arg(long)]
    pub variant: Option<String>,

    /// Apply jitter to the delay
    #[arg(long)]
    pub jitter: bool,

    /// Leave out debug headers
    #[arg(long)]
    pub no_debug_headers: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// Configuration management
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Output format (yaml, toml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file to validate
        file: PathBuf,
    },

    /// Write a configuration file with default values
    Init {
        /// Output file path
        #[arg(short, long, default_value = "failsim.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show environment variable mappings
    Env,
}

/// Health check a running instance
#[derive(Parser, Debug)]
pub struct HealthCommand {
    /// Base URL of the simulator instance
    #[arg(short, long, default_value = "http://localhost:8000")]
    pub url: String,

    /// Timeout in seconds
    #[arg(short, long, default_value = "5")]
    pub timeout: u64,

    /// Check readiness instead of liveness
    #[arg(short, long)]
    pub ready: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}
