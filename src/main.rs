//! API Failure Simulator CLI

use clap::Parser;

use api_failure_simulator::cli::{execute, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    execute(cli).await
}
