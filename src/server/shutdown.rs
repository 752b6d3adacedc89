//! Graceful shutdown
//!
//! Tracks in-flight simulations so a shutdown can wait for delayed
//! responses to finish:
//! - New requests are refused with 503 once draining starts
//! - Drain waits at most the configured drain timeout

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info, warn};

use crate::error::ErrorResponse;

/// Shutdown state for tracking in-flight requests
#[derive(Debug)]
pub struct ShutdownState {
    in_flight: AtomicU64,
    draining: AtomicBool,
    drain_timeout: Duration,
}

impl ShutdownState {
    pub fn new(drain_timeout: Duration) -> Self {
        Self {
            in_flight: AtomicU64::new(0),
            draining: AtomicBool::new(false),
            drain_timeout,
        }
    }

    /// Count a request until the returned guard drops
    pub fn track(self: &Arc<Self>) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlightGuard { state: self.clone() }
    }

    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    pub fn is_ready(&self) -> bool {
        !self.is_draining()
    }

    /// Stop accepting new requests
    pub fn start_drain(&self) {
        info!("Starting graceful shutdown, marking as draining");
        self.draining.store(true, Ordering::SeqCst);
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    /// Wait for all in-flight requests to complete
    pub async fn wait_for_drain(&self) {
        let drain_start = Instant::now();

        while self.in_flight_count() > 0 {
            if drain_start.elapsed() > self.drain_timeout {
                warn!(
                    remaining_requests = self.in_flight_count(),
                    "Drain timeout exceeded, forcing shutdown"
                );
                return;
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        info!("All requests drained, proceeding with shutdown");
    }
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new(Duration::from_secs(35))
    }
}

/// Decrements the in-flight count on drop, including for cancelled requests
#[derive(Debug)]
pub struct InFlightGuard {
    state: Arc<ShutdownState>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Request tracking middleware
pub async fn request_tracking_middleware(
    State(shutdown): State<Arc<ShutdownState>>,
    request: Request,
    next: Next,
) -> Result<Response, DrainError> {
    if shutdown.is_draining() {
        return Err(DrainError);
    }

    let _guard = shutdown.track();
    Ok(next.run(request).await)
}

/// Error returned when server is draining
#[derive(Debug)]
pub struct DrainError;

impl IntoResponse for DrainError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new(
            "service_unavailable",
            "Server is shutting down. Please retry your request.",
        );
        (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
    }
}

/// Resolves on Ctrl+C or SIGTERM, then drains
pub async fn graceful_shutdown(shutdown_state: Arc<ShutdownState>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }

    shutdown_state.start_drain();
    shutdown_state.wait_for_drain().await;
}
