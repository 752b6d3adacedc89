//! HTTP request handlers

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{rejection::QueryRejection, ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use super::state::AppState;
use crate::catalog::{JsonDefect, NamedFault, ScenarioDescriptor, ScenarioId, MAX_STATUS, MIN_STATUS};
use crate::config::SimulatorConfig;
use crate::engine::{EngineStats, SimulationRequest, SimulationResponse};
use crate::error::{SimulationError, SimulatorResult};

/// Bucket key for requests with neither an API key nor a peer address
pub const ANONYMOUS_CLIENT: &str = "anonymous";

const DEFAULT_STATUS_CODE: u16 = 400;

fn default_true() -> bool {
    true
}

impl IntoResponse for SimulationResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!(header = %name, "Dropping header that is not valid on the wire"),
            }
        }

        response
    }
}

/// Rate-limit key: configured header, then peer IP, then `anonymous`
pub fn client_id(config: &SimulatorConfig, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get(config.rate_limit.client_key_header.as_str())
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string())
}

fn peer_addr(connect_info: Option<ConnectInfo<SocketAddr>>) -> Option<SocketAddr> {
    connect_info.map(|ConnectInfo(addr)| addr)
}

/// Query-string rejections get the same envelope as every other bad parameter
fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> SimulatorResult<T> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| SimulationError::invalid_param("query", rejection.body_text()))
}

/// Raw `code` parameter; absent means the default
fn parse_code(raw: Option<&str>) -> SimulatorResult<u16> {
    let Some(raw) = raw.map(str::trim) else {
        return Ok(DEFAULT_STATUS_CODE);
    };
    let code = raw.parse::<i64>().map_err(|_| {
        SimulationError::invalid_param("code", format!("Status code must be an integer, got '{}'", raw))
    })?;
    u16::try_from(code).map_err(|_| {
        SimulationError::invalid_param(
            "code",
            format!("Status code must be between {} and {}, got {}", MIN_STATUS, MAX_STATUS, code),
        )
    })
}

/// Requested delay in seconds; negative, non-finite and absurd values are refused
fn parse_seconds(seconds: Option<f64>) -> SimulatorResult<Option<Duration>> {
    match seconds {
        None => Ok(None),
        Some(s) if s >= 0.0 => Duration::try_from_secs_f64(s)
            .map(Some)
            .map_err(|_| SimulationError::invalid_param("seconds", format!("Invalid delay: {}", s))),
        Some(s) => Err(SimulationError::invalid_param(
            "seconds",
            format!("Delay cannot be negative, got {}", s),
        )),
    }
}

/// Unparseable lists are ignored as a whole
fn parse_exclusions(raw: &str) -> Vec<u16> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<u16>)
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_default()
}

/// Count a request refused before it reached the engine
fn reject(state: &AppState, error: SimulationError) -> SimulationError {
    state.engine.record_rejection(&error);
    state.metrics.record_error(error.error_type());
    error
}

/// Run a prepared request through the engine and record the outcome
async fn simulate(
    state: &AppState,
    request: SimulatorResult<SimulationRequest>,
) -> Result<SimulationResponse, SimulationError> {
    let request = request.map_err(|e| reject(state, e))?;
    let scenario = request.scenario.to_string();

    match state.engine.handle(request).await {
        Ok(response) => {
            state.metrics.record_simulation(
                &scenario,
                response.status,
                response.is_throttled(),
                response.delay,
            );
            Ok(response)
        }
        Err(e) => {
            state.metrics.record_error(e.error_type());
            Err(e)
        }
    }
}

async fn run_simulation(
    state: &AppState,
    request: SimulatorResult<SimulationRequest>,
) -> Result<Response, SimulationError> {
    simulate(state, request).await.map(IntoResponse::into_response)
}

// ============== Simulation Handlers ==============

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    /// Parsed by hand so bad values get a `code` error
    pub code: Option<String>,
    #[serde(default = "default_true")]
    pub include_headers: bool,
    pub message: Option<String>,
}

/// GET /simulate/status
pub async fn simulate_status(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<Response, SimulationError> {
    let client = client_id(&state.config, &headers, peer_addr(connect_info));
    let request = query_params(query).and_then(|query| status_request(query, client));
    run_simulation(&state, request).await
}

fn status_request(query: StatusQuery, client: String) -> SimulatorResult<SimulationRequest> {
    let code = parse_code(query.code.as_deref())?;
    let scenario = ScenarioId::from_code(code)?;
    // 1xx cannot terminate an HTTP exchange
    if code < 200 {
        return Err(SimulationError::invalid_param(
            "code",
            format!("Informational status {} cannot be returned as a final response", code),
        ));
    }

    let mut request = SimulationRequest::new(scenario, client).with_debug_headers(query.include_headers);
    if let Some(message) = query.message {
        request = request.with_message(message);
    }
    Ok(request)
}

#[derive(Debug, Default, Deserialize)]
pub struct FaultQuery {
    #[serde(default = "default_true")]
    pub include_headers: bool,
    #[serde(alias = "hang_time")]
    pub seconds: Option<f64>,
    #[serde(alias = "error_type")]
    pub variant: Option<String>,
    #[serde(default)]
    pub jitter: bool,
    pub message: Option<String>,
}

fn fault_request(fault: NamedFault, query: FaultQuery, client: String) -> SimulatorResult<SimulationRequest> {
    let mut request = SimulationRequest::new(ScenarioId::Fault(fault), client)
        .with_debug_headers(query.include_headers)
        .with_jitter(query.jitter);

    if let Some(delay) = parse_seconds(query.seconds)? {
        request = request.with_delay(delay);
    }
    if let Some(variant) = query.variant.as_deref() {
        request = request.with_json_defect(JsonDefect::from_name_lenient(Some(variant)));
    }
    if let Some(message) = query.message {
        request = request.with_message(message);
    }
    Ok(request)
}

/// GET /simulate/fault/:name
pub async fn simulate_fault(
    State(state): State<AppState>,
    Path(name): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    query: Result<Query<FaultQuery>, QueryRejection>,
) -> Result<Response, SimulationError> {
    let client = client_id(&state.config, &headers, peer_addr(connect_info));
    let request = name
        .parse::<NamedFault>()
        .and_then(|fault| fault_request(fault, query_params(query)?, client));
    run_simulation(&state, request).await
}

/// GET /simulate/invalid-json
pub async fn simulate_invalid_json(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    query: Result<Query<FaultQuery>, QueryRejection>,
) -> Result<Response, SimulationError> {
    let client = client_id(&state.config, &headers, peer_addr(connect_info));
    let request = query_params(query).and_then(|query| fault_request(NamedFault::MalformedJson, query, client));
    run_simulation(&state, request).await
}

/// GET /simulate/slow
pub async fn simulate_slow(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    query: Result<Query<FaultQuery>, QueryRejection>,
) -> Result<Response, SimulationError> {
    let client = client_id(&state.config, &headers, peer_addr(connect_info));
    let request = query_params(query).and_then(|query| fault_request(NamedFault::Slow, query, client));
    run_simulation(&state, request).await
}

/// GET /simulate/timeout
pub async fn simulate_timeout(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    query: Result<Query<FaultQuery>, QueryRejection>,
) -> Result<Response, SimulationError> {
    let client = client_id(&state.config, &headers, peer_addr(connect_info));
    let request = query_params(query).and_then(|query| fault_request(NamedFault::Timeout, query, client));
    run_simulation(&state, request).await
}

/// GET /simulate/network-error
pub async fn simulate_network_error(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    query: Result<Query<FaultQuery>, QueryRejection>,
) -> Result<Response, SimulationError> {
    let client = client_id(&state.config, &headers, peer_addr(connect_info));
    let request = query_params(query).and_then(|mut query| {
        let kind = query.variant.take().unwrap_or_else(|| "connection_reset".to_string());
        match kind.parse::<NamedFault>() {
            Ok(fault @ (NamedFault::ConnectionReset | NamedFault::DnsFailure | NamedFault::SslError)) => {
                fault_request(fault, query, client)
            }
            _ => Err(SimulationError::UnknownScenario(kind)),
        }
    });
    run_simulation(&state, request).await
}

#[derive(Debug, Default, Deserialize)]
pub struct RandomQuery {
    #[serde(default)]
    pub exclude_codes: String,
}

/// GET /simulate/random
pub async fn simulate_random(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    query: Result<Query<RandomQuery>, QueryRejection>,
) -> Result<Response, SimulationError> {
    let client = client_id(&state.config, &headers, peer_addr(connect_info));
    let request = query_params(query).map(|query| {
        let scenario = state.engine.random_scenario(&parse_exclusions(&query.exclude_codes));
        SimulationRequest::new(scenario, client).with_debug_headers(true)
    });
    run_simulation(&state, request).await
}

#[derive(Debug, Default, Deserialize)]
pub struct RateLimitQuery {
    /// Must match the configured quota when given
    pub limit: Option<u32>,
    /// Must match the configured window (seconds) when given
    pub window: Option<u64>,
    #[serde(default)]
    pub reset_counts: bool,
}

/// Counter snapshot returned by the rate-limit exercise endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    pub window: u64,
    pub current_count: u32,
}

/// All clients share one limiter, so per-request limits are refused
fn check_rate_limit_query(config: &SimulatorConfig, query: &RateLimitQuery) -> SimulatorResult<()> {
    let quota = config.rate_limit.quota;
    let window = config.rate_limit.window_secs();
    let configured = format!("this server allows {} requests per {} seconds", quota, window);

    if query.limit.is_some_and(|limit| limit != quota) {
        return Err(SimulationError::invalid_param(
            "limit",
            format!("Per-request limits are not supported; {}", configured),
        ));
    }
    if query.window.is_some_and(|w| w != window) {
        return Err(SimulationError::invalid_param(
            "window",
            format!("Per-request windows are not supported; {}", configured),
        ));
    }
    Ok(())
}

/// GET /simulate/rate-limit
pub async fn simulate_rate_limit(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    query: Result<Query<RateLimitQuery>, QueryRejection>,
) -> Result<Response, SimulationError> {
    let client = client_id(&state.config, &headers, peer_addr(connect_info));
    let query = query_params(query)
        .and_then(|query| check_rate_limit_query(&state.config, &query).map(|_| query))
        .map_err(|e| reject(&state, e))?;
    let window = state.config.rate_limit.window_secs();

    if query.reset_counts {
        let existed = state.engine.reset_client(&client);
        return Ok(Json(json!({
            "status": "reset",
            "message": format!("Rate limit counter reset for {}", client),
            "existed": existed,
            "limit": state.config.rate_limit.quota,
            "window": window,
        }))
        .into_response());
    }

    let request = SimulationRequest::new(ScenarioId::Status(200), client).with_debug_headers(false);
    let request_id = request.request_id.clone();
    let mut response = simulate(&state, Ok(request)).await?;

    // Throttled responses already describe the limit
    if !response.is_throttled() {
        let info = response.rate_limit.map(|verdict| RateLimitInfo {
            limit: verdict.limit,
            remaining: verdict.remaining,
            window,
            current_count: verdict.limit.saturating_sub(verdict.remaining),
        });
        response.body = json!({
            "status": "success",
            "message": "Request processed successfully",
            "rate_limit_info": info,
            "request_id": request_id,
        })
        .to_string();
    }

    Ok(response.into_response())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RateLimitResetResponse {
    pub status: String,
    pub client_id: String,
    pub existed: bool,
    pub message: String,
}

/// POST /simulate/rate-limit/reset
pub async fn reset_rate_limit(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Json<RateLimitResetResponse> {
    let client = client_id(&state.config, &headers, peer_addr(connect_info));
    let existed = state.engine.reset_client(&client);

    Json(RateLimitResetResponse {
        status: "reset".to_string(),
        message: format!("Rate limit counter reset for {}", client),
        client_id: client,
        existed,
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScenarioListResponse {
    pub count: usize,
    pub scenarios: Vec<ScenarioDescriptor>,
}

/// GET /scenarios
pub async fn list_scenarios(State(state): State<AppState>) -> Json<ScenarioListResponse> {
    let scenarios = state.engine.catalog().entries();
    Json(ScenarioListResponse {
        count: scenarios.len(),
        scenarios,
    })
}

// ============== Admin Handlers ==============

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminStatsResponse {
    pub engine: EngineStats,
    pub rate_limit_buckets: usize,
    pub in_flight_requests: u64,
    pub uptime_seconds: u64,
}

/// GET /admin/stats
pub async fn get_stats(State(state): State<AppState>) -> Json<AdminStatsResponse> {
    Json(AdminStatsResponse {
        engine: state.engine.stats(),
        rate_limit_buckets: state.engine.rate_limiter().bucket_count(),
        in_flight_requests: state.shutdown.in_flight_count(),
        uptime_seconds: state.engine.uptime().as_secs(),
    })
}

/// POST /admin/stats/reset
pub async fn reset_stats(State(state): State<AppState>) -> StatusCode {
    state.engine.reset_stats();
    state.metrics.reset();
    StatusCode::NO_CONTENT
}

// ============== Health Handlers ==============

/// Overall health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub checks: HashMap<String, String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut checks = HashMap::new();
    let stats = state.engine.stats();
    checks.insert(
        "engine".to_string(),
        format!("processed {} requests", stats.total_requests),
    );
    checks.insert(
        "rate_limiter".to_string(),
        if state.config.rate_limit.enabled {
            format!("{} active buckets", state.engine.rate_limiter().bucket_count())
        } else {
            "disabled".to_string()
        },
    );

    let status = if state.shutdown.is_draining() {
        checks.insert("shutdown".to_string(), "draining".to_string());
        HealthStatus::Unhealthy
    } else {
        HealthStatus::Healthy
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.engine.uptime().as_secs(),
        timestamp: chrono::Utc::now(),
        checks,
    })
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// GET /ready
pub async fn ready_check(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    if state.shutdown.is_draining() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                reason: Some("Server is draining".to_string()),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadyResponse {
            ready: true,
            reason: None,
        }),
    )
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.set_active_buckets(state.engine.rate_limiter().bucket_count() as u64);
    state.metrics.set_in_flight(state.shutdown.in_flight_count());

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.export(),
    )
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
    pub name: String,
    pub version: String,
}

/// GET /version
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<String>,
}

/// GET /
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        name: "API Failure Simulator".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: env!("CARGO_PKG_DESCRIPTION").to_string(),
        endpoints: [
            "/simulate/status?code=",
            "/simulate/fault/{name}",
            "/simulate/invalid-json",
            "/simulate/slow",
            "/simulate/timeout",
            "/simulate/network-error",
            "/simulate/random",
            "/simulate/rate-limit",
            "/simulate/rate-limit/reset",
            "/scenarios",
            "/health",
            "/metrics",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    })
}
