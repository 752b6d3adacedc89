//! Core simulation engine
//!
//! The SimulationEngine turns a validated scenario request into a finished
//! response:
//! - Validating scenario parameters
//! - Charging the request against the client's rate-limit bucket
//! - Sleeping for delay-based faults, without holding any lock
//! - Looking up the scenario and building the response

mod builder;
mod rate_limit;
mod state;

pub use builder::*;
pub use rate_limit::*;
pub use state::*;

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::prelude::*;
use tracing::{debug, info, Instrument};
use uuid::Uuid;

use crate::catalog::{JsonDefect, NamedFault, ScenarioCatalog, ScenarioId, MAX_STATUS, MIN_STATUS};
use crate::config::SimulatorConfig;
use crate::error::{SimulationError, SimulatorResult};

/// Longest accepted override message
pub const MAX_MESSAGE_LEN: usize = 1024;

/// Parameters for one simulated response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationRequest {
    pub scenario: ScenarioId,
    /// Replaces the descriptor's default message
    pub message: Option<String>,
    pub include_debug_headers: bool,
    /// Rate-limit bucket key
    pub client_id: String,
    pub request_id: String,
    /// Requested delay for delay-based faults; capped by configuration
    pub delay_override: Option<Duration>,
    /// Randomize the delay within the configured jitter range
    pub jitter: bool,
    /// Syntax error for the malformed-JSON fault
    pub json_defect: Option<JsonDefect>,
}

impl SimulationRequest {
    pub fn new(scenario: ScenarioId, client_id: impl Into<String>) -> Self {
        Self {
            scenario,
            message: None,
            include_debug_headers: false,
            client_id: client_id.into(),
            request_id: generate_request_id(),
            delay_override: None,
            jitter: false,
            json_defect: None,
        }
    }

    pub fn with_debug_headers(mut self, include: bool) -> Self {
        self.include_debug_headers = include;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_override = Some(delay);
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_json_defect(mut self, defect: JsonDefect) -> Self {
        self.json_defect = Some(defect);
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }
}

/// `req_` followed by 12 hex characters
pub fn generate_request_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("req_{}", &hex[..12])
}

/// The main simulation engine
pub struct SimulationEngine {
    config: SimulatorConfig,
    catalog: ScenarioCatalog,
    rate_limiter: Arc<dyn RateLimiter>,
    builder: ResponseBuilder,
    rng: Mutex<StdRng>,
    state: EngineState,
    start_time: Instant,
}

impl SimulationEngine {
    /// Create a new simulation engine with the given configuration
    pub fn new(config: SimulatorConfig) -> Self {
        let limiter = Arc::new(FixedWindowRateLimiter::from_config(&config.rate_limit));
        Self::with_rate_limiter(config, limiter)
    }

    /// Create an engine around an existing rate limiter backend
    pub fn with_rate_limiter(config: SimulatorConfig, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            catalog: ScenarioCatalog::new(&config.delay),
            builder: ResponseBuilder::new(config.rate_limit.window),
            rate_limiter,
            rng: Mutex::new(rng),
            state: EngineState::new(),
            start_time: Instant::now(),
            config,
        }
    }

    /// Create with default configuration
    pub fn default_config() -> Self {
        Self::new(SimulatorConfig::default())
    }

    /// Produce the simulated response for one request
    pub async fn handle(&self, request: SimulationRequest) -> SimulatorResult<SimulationResponse> {
        let span = tracing::info_span!(
            "simulate",
            scenario = %request.scenario,
            client_id = %request.client_id,
            request_id = %request.request_id,
        );
        self.handle_inner(request).instrument(span).await
    }

    async fn handle_inner(&self, request: SimulationRequest) -> SimulatorResult<SimulationResponse> {
        self.state.increment_requests();

        if let Err(e) = self.validate(&request) {
            self.state.increment_rejected();
            return Err(e);
        }

        let verdict = if self.config.rate_limit.enabled {
            self.rate_limiter.check(&request.client_id)
        } else {
            RateLimitVerdict::unlimited()
        };

        let delay = match request.scenario.fault() {
            Some(fault) if verdict.allowed && fault.requires_delay() => {
                let delay = self.resolve_delay(fault, &request);
                debug!(delay_ms = delay.as_millis() as u64, "Applying simulated delay");
                tokio::time::sleep(delay).await;
                self.state.record_delay(delay);
                delay
            }
            _ => Duration::ZERO,
        };

        let descriptor = self.catalog.lookup(&request.scenario)?;
        let response = self.builder.build(&descriptor, &request, &verdict, delay);

        if verdict.allowed {
            self.state.record_scenario(descriptor.category);
        } else {
            self.state.increment_throttled();
        }

        info!(
            status = response.status,
            throttled = !verdict.allowed,
            delay_ms = delay.as_millis() as u64,
            "Simulated response built"
        );

        Ok(response)
    }

    /// Check request parameters before anything is charged or delayed
    pub fn validate(&self, request: &SimulationRequest) -> SimulatorResult<()> {
        if let ScenarioId::Status(code) = request.scenario {
            if !(MIN_STATUS..=MAX_STATUS).contains(&code) {
                return Err(SimulationError::invalid_param(
                    "code",
                    format!("Status code must be between {} and {}, got {}", MIN_STATUS, MAX_STATUS, code),
                ));
            }
        }

        if request.client_id.trim().is_empty() {
            return Err(SimulationError::invalid_param("client_id", "Client identifier cannot be empty"));
        }

        if let Some(message) = &request.message {
            if message.len() > MAX_MESSAGE_LEN {
                return Err(SimulationError::invalid_param(
                    "message",
                    format!("Message cannot exceed {} bytes", MAX_MESSAGE_LEN),
                ));
            }
        }

        Ok(())
    }

    /// Delay for a delay-based fault: override or configured default, jittered, capped
    pub fn resolve_delay(&self, fault: NamedFault, request: &SimulationRequest) -> Duration {
        let delay_config = &self.config.delay;
        let base = request.delay_override.unwrap_or(match fault {
            NamedFault::Timeout => delay_config.timeout_delay,
            _ => delay_config.slow_delay,
        });

        if request.jitter {
            let offset = self
                .rng
                .lock()
                .gen_range(delay_config.jitter_min_ms..=delay_config.jitter_max_ms);
            delay_config.apply_jitter(base, offset)
        } else {
            delay_config.clamp(base)
        }
    }

    /// Pick a random curated error code, honoring exclusions
    pub fn random_scenario(&self, exclude: &[u16]) -> ScenarioId {
        let pool = self.catalog.random_pool(exclude);
        let code = pool
            .choose(&mut *self.rng.lock())
            .copied()
            .unwrap_or(500);
        ScenarioId::Status(code)
    }

    /// Forget a client's rate-limit bucket
    pub fn reset_client(&self, client_id: &str) -> bool {
        let existed = self.rate_limiter.reset(client_id);
        info!(client_id = %client_id, existed, "Rate limit bucket reset");
        existed
    }

    /// Count a request the boundary refused before it reached `handle`
    pub fn record_rejection(&self, error: &SimulationError) {
        self.state.increment_requests();
        self.state.increment_rejected();
        debug!(error_type = error.error_type(), "Request rejected at the boundary");
    }

    /// Housekeeping: drop buckets idle past the configured threshold
    pub fn evict_idle_buckets(&self) -> usize {
        self.rate_limiter.evict_idle(self.config.rate_limit.idle_eviction)
    }

    pub fn catalog(&self) -> &ScenarioCatalog {
        &self.catalog
    }

    pub fn rate_limiter(&self) -> &Arc<dyn RateLimiter> {
        &self.rate_limiter
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Get engine statistics
    pub fn stats(&self) -> EngineStats {
        self.state.stats()
    }

    /// Reset engine statistics
    pub fn reset_stats(&self) {
        self.state.reset();
    }

    /// Get engine uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}
