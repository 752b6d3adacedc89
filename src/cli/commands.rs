//! CLI Command Implementations

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

use crate::catalog::{JsonDefect, ScenarioId};
use crate::engine::{SimulationEngine, SimulationRequest};
use crate::telemetry::init_telemetry;
use crate::{SimulatorConfig, VERSION};

use super::{
    Cli, Commands, ConfigAction, ConfigCommand, HealthCommand, ScenariosCommand, ServeCommand,
    SimulateCommand,
};

/// Execute the CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => SimulatorConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => SimulatorConfig::from_env().context("Failed to load configuration from environment")?,
    };

    if let Some(level) = &cli.log_level {
        config.telemetry.log_level = level.clone();
    }
    config.telemetry.json_logs = config.telemetry.json_logs || cli.json_logs;

    match cli.command {
        Commands::Serve(cmd) => execute_serve(cmd, config, cli.quiet).await,
        Commands::Scenarios(cmd) => execute_scenarios(cmd, config),
        Commands::Simulate(cmd) => execute_simulate(cmd, config).await,
        Commands::Config(cmd) => execute_config(cmd, config),
        Commands::Health(cmd) => execute_health(cmd).await,
        Commands::Version => execute_version(),
    }
}

/// Apply `serve` flags on top of the loaded configuration
pub fn apply_serve_overrides(cmd: &ServeCommand, config: &mut SimulatorConfig) {
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    if let Some(host) = &cmd.host {
        config.server.host = host.clone();
    }
    if let Some(quota) = cmd.quota {
        config.rate_limit.quota = quota;
    }
    if let Some(window) = cmd.window {
        config.rate_limit.window = Duration::from_secs(window);
    }
    if cmd.no_rate_limit {
        config.rate_limit.enabled = false;
    }
    if let Some(seed) = cmd.seed {
        config.seed = Some(seed);
    }
}

async fn execute_serve(cmd: ServeCommand, mut config: SimulatorConfig, quiet: bool) -> Result<()> {
    apply_serve_overrides(&cmd, &mut config);
    config.validate().context("Configuration validation failed")?;

    if !quiet {
        print_banner(&config);
    }

    crate::run_server(config).await
}

fn execute_scenarios(cmd: ScenariosCommand, config: SimulatorConfig) -> Result<()> {
    let engine = SimulationEngine::new(config);
    let entries = engine.catalog().entries();

    match cmd.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&entries)?),
        _ => {
            println!("{:<22} {:>6}  {:<16} {}", "SCENARIO", "STATUS", "CATEGORY", "TITLE");
            for entry in &entries {
                println!(
                    "{:<22} {:>6}  {:<16} {}",
                    entry.id, entry.status, entry.category, entry.title
                );
            }
            println!();
            println!("Any status code from 100 to 599 is accepted; uncurated codes get a generic description.");
        }
    }

    Ok(())
}

/// Translate `simulate` flags into an engine request
pub fn build_simulate_request(cmd: &SimulateCommand) -> Result<SimulationRequest> {
    let scenario = ScenarioId::parse(&cmd.scenario)?;
    let mut request = SimulationRequest::new(scenario, cmd.client.clone())
        .with_debug_headers(!cmd.no_debug_headers)
        .with_jitter(cmd.jitter);

    if let Some(seconds) = cmd.seconds {
        if seconds < 0.0 {
            bail!("Delay cannot be negative, got {}", seconds);
        }
        let delay = Duration::try_from_secs_f64(seconds)
            .with_context(|| format!("Invalid delay: {}", seconds))?;
        request = request.with_delay(delay);
    }
    if let Some(variant) = cmd.variant.as_deref() {
        request = request.with_json_defect(JsonDefect::from_name_lenient(Some(variant)));
    }

    Ok(request)
}

async fn execute_simulate(cmd: SimulateCommand, config: SimulatorConfig) -> Result<()> {
    init_telemetry(&config.telemetry)?;

    let request = build_simulate_request(&cmd)?;
    let engine = SimulationEngine::new(config);
    let response = engine.handle(request).await?;

    match cmd.format.as_str() {
        "json" => {
            let output = serde_json::json!({
                "status": response.status,
                "headers": response.headers,
                "body": response.body,
                "delay_ms": response.delay.as_millis() as u64,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            println!("HTTP {}", response.status);
            for (name, value) in &response.headers {
                println!("{}: {}", name, value);
            }
            println!();
            println!("{}", response.body);
        }
    }

    Ok(())
}

fn execute_config(cmd: ConfigCommand, config: SimulatorConfig) -> Result<()> {
    match cmd.action {
        ConfigAction::Show { format } => {
            let output = match format.as_str() {
                "toml" => toml::to_string_pretty(&config)?,
                "json" => serde_json::to_string_pretty(&config)?,
                _ => serde_yaml::to_string(&config)?,
            };
            println!("{}", output);
            Ok(())
        }

        ConfigAction::Validate { file } => {
            let config = SimulatorConfig::from_file(&file)?;
            config.validate()?;
            println!("Configuration at {:?} is valid", file);
            println!("  Server:      {}:{}", config.server.host, config.server.port);
            println!(
                "  Rate limit:  {}",
                if config.rate_limit.enabled {
                    format!("{} requests / {}s", config.rate_limit.quota, config.rate_limit.window_secs())
                } else {
                    "disabled".to_string()
                }
            );
            println!("  Delay range: {:?} to {:?}", config.delay.min_delay, config.delay.max_delay);
            Ok(())
        }

        ConfigAction::Init { output, force } => {
            if output.exists() && !force {
                bail!("File {:?} already exists. Use --force to overwrite.", output);
            }

            let yaml = serde_yaml::to_string(&SimulatorConfig::default())?;
            std::fs::write(&output, &yaml)
                .with_context(|| format!("Failed to write {:?}", output))?;
            println!("Created configuration file: {:?}", output);
            Ok(())
        }

        ConfigAction::Env => {
            println!("Environment Variable Mappings:");
            println!();
            println!("  {:<34} {}", "FAILSIM_CONFIG", "Configuration file path");
            println!("  {:<34} {}", "FAILSIM_HOST", "Server host (default: 0.0.0.0)");
            println!("  {:<34} {}", "FAILSIM_PORT", "Server port (default: 8000)");
            println!("  {:<34} {}", "FAILSIM_RATE_LIMIT_QUOTA", "Requests per window (default: 10)");
            println!("  {:<34} {}", "FAILSIM_RATE_LIMIT_WINDOW_SECS", "Window length in seconds (default: 60)");
            println!("  {:<34} {}", "FAILSIM_SEED", "Seed for the random scenario picker");
            println!("  {:<34} {}", "FAILSIM_LOG_LEVEL", "Log level (trace/debug/info/warn/error)");
            println!("  {:<34} {}", "FAILSIM_JSON_LOGS", "Enable JSON log format");
            println!("  {:<34} {}", "RUST_LOG", "Log filter, overrides the log level");
            Ok(())
        }
    }
}

async fn execute_health(cmd: HealthCommand) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cmd.timeout))
        .build()?;

    let endpoint = if cmd.ready { "ready" } else { "health" };
    let url = format!("{}/{}", cmd.url.trim_end_matches('/'), endpoint);
    let start = Instant::now();

    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            if cmd.format == "json" {
                let result = serde_json::json!({ "url": url, "error": e.to_string() });
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("✗ {} - Error: {}", url, e);
            }
            bail!("Health check failed: {}", e);
        }
    };

    let latency = start.elapsed();
    let status = response.status();
    let body: serde_json::Value = response.json().await.unwrap_or_default();

    match cmd.format.as_str() {
        "json" => {
            let result = serde_json::json!({
                "url": url,
                "status": status.as_u16(),
                "latency_ms": latency.as_millis() as u64,
                "response": body,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            let marker = if status.is_success() { "✓" } else { "✗" };
            println!("{} {} - Status: {} - Latency: {:?}", marker, url, status.as_u16(), latency);
            if let Some(health_status) = body.get("status") {
                println!("  Health: {}", health_status);
            }
        }
    }

    if status.is_success() {
        Ok(())
    } else {
        bail!("Health check failed with status {}", status)
    }
}

fn execute_version() -> Result<()> {
    println!("api-failure-simulator {}", VERSION);
    Ok(())
}

fn print_banner(config: &SimulatorConfig) {
    let base = format!("http://{}:{}", config.server.host, config.server.port);

    println!("API Failure Simulator v{}", VERSION);
    println!();
    println!("Configuration:");
    println!("  • Server:      {}:{}", config.server.host, config.server.port);
    println!(
        "  • Rate limit:  {}",
        if config.rate_limit.enabled {
            format!(
                "{} requests / {}s per client",
                config.rate_limit.quota,
                config.rate_limit.window_secs()
            )
        } else {
            "disabled".to_string()
        }
    );
    println!("  • Delay range: {:?} to {:?}", config.delay.min_delay, config.delay.max_delay);
    println!("  • Seed:        {}", config.seed.map_or("random".to_string(), |s| s.to_string()));
    println!();
    println!("Endpoints:");
    println!("  • Status:      {}/simulate/status?code=503", base);
    println!("  • Faults:      {}/simulate/fault/{{name}}", base);
    println!("  • Rate limit:  {}/simulate/rate-limit", base);
    println!("  • Scenarios:   {}/scenarios", base);
    println!("  • Health:      {}/health", base);
    println!("  • Metrics:     {}/metrics", base);
    println!();
}
