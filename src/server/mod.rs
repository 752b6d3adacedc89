//! HTTP server implementation
//!
//! Axum server exposing the simulation engine, catalog listing,
//! health and metrics endpoints.

mod routes;
mod handlers;
mod state;
pub mod shutdown;

pub use routes::*;
pub use handlers::*;
pub use state::*;
pub use shutdown::*;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{debug, info};

use crate::config::SimulatorConfig;
use crate::telemetry::init_telemetry;

/// Run the simulator server until a shutdown signal arrives
pub async fn run_server(config: SimulatorConfig) -> anyhow::Result<()> {
    init_telemetry(&config.telemetry)?;
    config.validate()?;

    let state = AppState::new(config.clone());
    let app = create_router(state.clone());
    let addr = config.server.socket_addr()?;

    info!(
        "Starting API Failure Simulator v{} on {}",
        env!("CARGO_PKG_VERSION"),
        addr
    );
    info!(
        quota = config.rate_limit.quota,
        window_secs = config.rate_limit.window_secs(),
        "Rate limiting: {}",
        if config.rate_limit.enabled { "enabled" } else { "disabled" }
    );
    info!("Scenarios available: {}", state.engine.catalog().entries().len());

    let housekeeping = spawn_housekeeping(state.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(graceful_shutdown(state.shutdown.clone()))
    .await?;

    housekeeping.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Periodically evict idle rate-limit buckets
pub fn spawn_housekeeping(state: AppState) -> tokio::task::JoinHandle<()> {
    let period = housekeeping_period(state.config.rate_limit.idle_eviction);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = state.engine.evict_idle_buckets();
            if evicted > 0 {
                debug!(evicted, "Evicted idle rate-limit buckets");
            }
        }
    })
}

fn housekeeping_period(idle_eviction: Duration) -> Duration {
    (idle_eviction / 2).max(Duration::from_secs(1))
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(config.server.request_timeout));

    let router = Router::new()
        .merge(routes::simulation_routes())
        .merge(routes::admin_routes())
        .merge(routes::health_routes())
        .layer(middleware::from_fn_with_state(
            state.shutdown.clone(),
            request_tracking_middleware,
        ));

    let router = if config.server.cors_enabled {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router
        .layer(middleware_stack)
        .with_state(state)
}
