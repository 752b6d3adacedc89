//! Error types for the API failure simulator
//!
//! Simulated failures are never errors: they are well-formed responses
//! produced by the engine. The variants here cover requests the engine
//! refuses to simulate and problems with the process configuration.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for simulator operations
pub type SimulatorResult<T> = Result<T, SimulationError>;

/// Main error type for simulation operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    /// Malformed or out-of-range scenario parameters
    #[error("Invalid parameters: {message}")]
    InvalidParameters {
        message: String,
        param: Option<String>,
    },

    /// Identifier is neither a status code nor a known named fault
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SimulationError {
    /// Shorthand for an `InvalidParameters` error tied to one parameter
    pub fn invalid_param(param: &str, message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
            param: Some(param.to_string()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidParameters { .. } | Self::UnknownScenario(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_type(&self) -> &str {
        match self {
            Self::InvalidParameters { .. } => "invalid_parameters",
            Self::UnknownScenario(_) => "unknown_scenario",
            Self::Config(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Whether the caller, not the process, is at fault
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        let response = ErrorResponse::new(self.error_type(), &self.to_string());

        match self {
            Self::InvalidParameters { param: Some(p), .. } => response.with_param(p),
            Self::UnknownScenario(id) => response.with_param(id),
            _ => response,
        }
    }
}

/// Error envelope returned for requests the engine refuses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: ErrorDetail {
                message: message.to_string(),
                error_type: error_type.to_string(),
                param: None,
            },
        }
    }

    pub fn with_param(mut self, param: &str) -> Self {
        self.error.param = Some(param.to_string());
        self
    }
}

impl IntoResponse for SimulationError {
    fn into_response(self) -> Response {
        if self.is_client_error() {
            tracing::debug!(error = %self, "Rejected simulation request");
        } else {
            tracing::error!(error = %self, "Simulation failed");
        }

        (self.status_code(), Json(self.to_error_response())).into_response()
    }
}

impl From<std::io::Error> for SimulationError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
