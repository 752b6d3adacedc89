//! Route definitions

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;
use super::state::AppState;

/// Failure simulation routes
pub fn simulation_routes() -> Router<AppState> {
    Router::new()
        .route("/simulate/status", get(handlers::simulate_status))
        .route("/simulate/fault/:name", get(handlers::simulate_fault))
        // Shorthands for the common faults
        .route("/simulate/invalid-json", get(handlers::simulate_invalid_json))
        .route("/simulate/slow", get(handlers::simulate_slow))
        .route("/simulate/timeout", get(handlers::simulate_timeout))
        .route("/simulate/network-error", get(handlers::simulate_network_error))
        .route("/simulate/random", get(handlers::simulate_random))
        .route("/simulate/rate-limit", get(handlers::simulate_rate_limit))
        .route("/simulate/rate-limit/reset", post(handlers::reset_rate_limit))
        .route("/scenarios", get(handlers::list_scenarios))
}

/// Admin routes
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(handlers::get_stats))
        .route("/admin/stats/reset", post(handlers::reset_stats))
}

/// Health and metrics routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/healthz", get(handlers::health_check))
        .route("/ready", get(handlers::ready_check))
        .route("/readyz", get(handlers::ready_check))
        // Prometheus text format
        .route("/metrics", get(handlers::metrics))
        .route("/version", get(handlers::version))
        .route("/", get(handlers::root))
}
