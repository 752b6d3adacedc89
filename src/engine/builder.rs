//! Response construction
//!
//! Turns a scenario descriptor, the request that asked for it and the
//! rate-limit verdict into the exact status, headers and body the HTTP
//! layer will send. Building never fails once a descriptor exists.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::SecondsFormat;
use serde_json::{json, Value};

use crate::catalog::{NamedFault, ScenarioDescriptor};
use super::rate_limit::RateLimitVerdict;
use super::SimulationRequest;

pub const HEADER_SCENARIO: &str = "X-Scenario";
pub const HEADER_REQUEST_ID: &str = "X-Request-Id";
pub const HEADER_RETRY_AFTER: &str = "Retry-After";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Finished simulated response, ready to be written verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// May be intentionally invalid
    pub body: String,
    /// Artificial delay applied before the response was built
    pub delay: Duration,
    /// Verdict the response was built under; `None` when throttling is off
    pub rate_limit: Option<RateLimitVerdict>,
}

impl SimulationResponse {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_throttled(&self) -> bool {
        self.status == 429 && self.header(HEADER_RETRY_AFTER).is_some()
    }

    /// Parse the body as JSON, if it is JSON
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Composes simulated responses
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    window: Duration,
}

impl ResponseBuilder {
    /// `window` is only used to describe throttling to the client
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn build(
        &self,
        descriptor: &ScenarioDescriptor,
        request: &SimulationRequest,
        verdict: &RateLimitVerdict,
        delay: Duration,
    ) -> SimulationResponse {
        let mut headers = BTreeMap::new();
        headers.insert(HEADER_SCENARIO.to_string(), request.scenario.to_string());
        headers.insert(HEADER_REQUEST_ID.to_string(), request.request_id.clone());

        if !verdict.is_unlimited() {
            headers.insert("X-RateLimit-Limit".to_string(), verdict.limit.to_string());
            headers.insert("X-RateLimit-Remaining".to_string(), verdict.remaining.to_string());
            headers.insert("X-RateLimit-Reset".to_string(), verdict.reset_after_seconds.to_string());
        }

        // Real throttling wins over whatever scenario was requested
        if !verdict.allowed {
            return self.throttled(request, verdict, headers);
        }

        if request.include_debug_headers {
            headers.insert("X-Debug-Mode".to_string(), "true".to_string());
            headers.insert("X-Scenario-Category".to_string(), descriptor.category.to_string());
            headers.insert("X-Debug-Tip".to_string(), descriptor.tip.clone());
            headers.insert("X-Error-Type".to_string(), descriptor.error_type());
        }

        if descriptor.status == 401 {
            headers.insert("WWW-Authenticate".to_string(), "Bearer".to_string());
        }

        let body = match request.scenario.fault() {
            Some(NamedFault::MalformedJson) => {
                let defect = request.json_defect.unwrap_or_default();
                if request.include_debug_headers {
                    headers.insert("X-Json-Error-Type".to_string(), defect.to_string());
                    headers.insert("X-Expected-Error".to_string(), "JSON parse error".to_string());
                }
                Some(defect.body().to_string())
            }
            Some(NamedFault::TruncatedResponse) => Some(truncated_body(descriptor)),
            Some(NamedFault::Slow) => Some(self.slow_body(descriptor, request, delay).to_string()),
            _ if !descriptor.has_body => None,
            _ if (200..300).contains(&descriptor.status) => {
                Some(success_envelope(descriptor, request).to_string())
            }
            _ => Some(error_envelope(descriptor, request, delay).to_string()),
        };

        if body.is_some() {
            headers.insert(HEADER_CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string());
        }

        SimulationResponse {
            status: descriptor.status,
            headers,
            body: body.unwrap_or_default(),
            delay,
            rate_limit: enforced(verdict),
        }
    }

    fn throttled(
        &self,
        request: &SimulationRequest,
        verdict: &RateLimitVerdict,
        mut headers: BTreeMap<String, String>,
    ) -> SimulationResponse {
        let window_secs = self.window.as_secs_f64().ceil() as u64;

        headers.insert(HEADER_RETRY_AFTER.to_string(), verdict.retry_after_seconds.to_string());
        headers.insert(HEADER_CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string());

        let body = json!({
            "error": "Too Many Requests",
            "code": 429,
            "message": format!(
                "Rate limit of {} requests per {} seconds exceeded",
                verdict.limit, window_secs
            ),
            "fix": "Implement exponential backoff: wait 1s, then 2s, then 4s, etc. Honor the Retry-After header.",
            "retry_after": verdict.retry_after_seconds,
            "limit": verdict.limit,
            "remaining": verdict.remaining,
            "window": window_secs,
            "requested_scenario": request.scenario.to_string(),
            "request_id": request.request_id,
        });

        SimulationResponse {
            status: 429,
            headers,
            body: body.to_string(),
            delay: Duration::ZERO,
            rate_limit: enforced(verdict),
        }
    }

    fn slow_body(&self, descriptor: &ScenarioDescriptor, request: &SimulationRequest, delay: Duration) -> Value {
        let requested = request
            .delay_override
            .or(descriptor.default_delay)
            .unwrap_or_default();

        json!({
            "status": "success",
            "code": descriptor.status,
            "message": request
                .message
                .clone()
                .unwrap_or_else(|| format!("Response delayed for {:.2} seconds", delay.as_secs_f64())),
            "delay_seconds": round2(delay.as_secs_f64()),
            "requested_delay": round2(requested.as_secs_f64()),
            "jitter_applied": request.jitter,
            "scenario": request.scenario.to_string(),
            "request_id": request.request_id,
            "timestamp": timestamp(),
            "debug_info": {
                "use_case": "Test client timeout handling and loading states",
                "tip": descriptor.tip,
            }
        })
    }
}

fn message_for(descriptor: &ScenarioDescriptor, request: &SimulationRequest) -> String {
    request
        .message
        .clone()
        .unwrap_or_else(|| descriptor.message.clone())
}

fn success_envelope(descriptor: &ScenarioDescriptor, request: &SimulationRequest) -> Value {
    json!({
        "status": "success",
        "code": descriptor.status,
        "message": message_for(descriptor, request),
        "scenario": request.scenario.to_string(),
        "request_id": request.request_id,
        "timestamp": timestamp(),
    })
}

fn error_envelope(descriptor: &ScenarioDescriptor, request: &SimulationRequest, delay: Duration) -> Value {
    let mut envelope = json!({
        "error": descriptor.title,
        "code": descriptor.status,
        "message": message_for(descriptor, request),
        "fix": descriptor.tip,
        "scenario": request.scenario.to_string(),
        "request_id": request.request_id,
        "timestamp": timestamp(),
    });

    if !delay.is_zero() {
        envelope["delay_seconds"] = json!(round2(delay.as_secs_f64()));
    }

    if request.include_debug_headers {
        envelope["debug_info"] = json!({
            "category": descriptor.category,
            "error_type": descriptor.error_type(),
            "common_causes": descriptor.common_causes,
        });
    }

    envelope
}

/// First half of a fixed, valid document
fn truncated_body(descriptor: &ScenarioDescriptor) -> String {
    let complete = json!({
        "status": "success",
        "message": descriptor.message,
        "data": {
            "items": [
                {"id": 1, "name": "alpha", "active": true},
                {"id": 2, "name": "bravo", "active": false},
                {"id": 3, "name": "charlie", "active": true},
            ],
            "total": 3,
        }
    })
    .to_string();

    let mut cut = complete.len() / 2;
    while !complete.is_char_boundary(cut) {
        cut -= 1;
    }
    complete[..cut].to_string()
}

fn enforced(verdict: &RateLimitVerdict) -> Option<RateLimitVerdict> {
    (!verdict.is_unlimited()).then_some(*verdict)
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
