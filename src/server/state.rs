//! Server state management

use std::sync::Arc;
use crate::config::SimulatorConfig;
use crate::engine::SimulationEngine;
use crate::telemetry::SimulatorMetrics;
use super::shutdown::ShutdownState;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SimulationEngine>,
    pub metrics: Arc<SimulatorMetrics>,
    pub config: Arc<SimulatorConfig>,
    pub shutdown: Arc<ShutdownState>,
}

impl AppState {
    pub fn new(config: SimulatorConfig) -> Self {
        Self::with_engine(Arc::new(SimulationEngine::new(config)))
    }

    /// Wrap an existing engine, e.g. one built around a custom rate limiter
    pub fn with_engine(engine: Arc<SimulationEngine>) -> Self {
        let config = engine.config().clone();
        Self {
            metrics: Arc::new(SimulatorMetrics::new()),
            shutdown: Arc::new(ShutdownState::new(config.server.drain_timeout)),
            config: Arc::new(config),
            engine,
        }
    }
}
