//! Named fault scenarios

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SimulationError;

/// Failure modes that are not a plain status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamedFault {
    /// Blocking delay, then 504
    Timeout,
    /// Blocking delay, then a normal 200
    Slow,
    /// Syntactically invalid JSON served as `application/json`
    MalformedJson,
    /// Valid JSON envelope cut off half-way
    TruncatedResponse,
    ConnectionReset,
    DnsFailure,
    SslError,
}

impl NamedFault {
    pub const ALL: [NamedFault; 7] = [
        NamedFault::Timeout,
        NamedFault::Slow,
        NamedFault::MalformedJson,
        NamedFault::TruncatedResponse,
        NamedFault::ConnectionReset,
        NamedFault::DnsFailure,
        NamedFault::SslError,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Slow => "slow",
            Self::MalformedJson => "malformed-json",
            Self::TruncatedResponse => "truncated-response",
            Self::ConnectionReset => "connection-reset",
            Self::DnsFailure => "dns-failure",
            Self::SslError => "ssl-error",
        }
    }

    /// Status code the fault is reported with
    pub fn status(&self) -> u16 {
        match self {
            Self::Timeout => 504,
            Self::Slow | Self::MalformedJson | Self::TruncatedResponse => 200,
            Self::ConnectionReset => 500,
            Self::DnsFailure | Self::SslError => 502,
        }
    }

    /// Whether the engine sleeps before building the response
    pub fn requires_delay(&self) -> bool {
        matches!(self, Self::Timeout | Self::Slow)
    }
}

impl fmt::Display for NamedFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for NamedFault {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        NamedFault::ALL
            .iter()
            .copied()
            .find(|fault| fault.id() == normalized)
            .ok_or_else(|| SimulationError::UnknownScenario(s.to_string()))
    }
}

/// The specific syntax error a malformed-JSON response carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonDefect {
    #[default]
    MissingComma,
    UnclosedBrace,
    InvalidEscape,
    TrailingComma,
    UnquotedKey,
    SingleQuotes,
}

impl JsonDefect {
    pub const ALL: [JsonDefect; 6] = [
        JsonDefect::MissingComma,
        JsonDefect::UnclosedBrace,
        JsonDefect::InvalidEscape,
        JsonDefect::TrailingComma,
        JsonDefect::UnquotedKey,
        JsonDefect::SingleQuotes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingComma => "missing_comma",
            Self::UnclosedBrace => "unclosed_brace",
            Self::InvalidEscape => "invalid_escape",
            Self::TrailingComma => "trailing_comma",
            Self::UnquotedKey => "unquoted_key",
            Self::SingleQuotes => "single_quotes",
        }
    }

    /// Resolve a variant name; unknown or missing names fall back to the default
    pub fn from_name_lenient(name: Option<&str>) -> Self {
        let Some(name) = name else {
            return Self::default();
        };
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|defect| defect.as_str() == normalized)
            .unwrap_or_default()
    }

    /// Fixed body for this defect; identical on every call
    pub fn body(&self) -> &'static str {
        match self {
            Self::MissingComma => r#"{"status": "error" "message": "Missing comma between properties"}"#,
            Self::UnclosedBrace => r#"{"status": "error", "message": "Unclosed brace""#,
            Self::InvalidEscape => r#"{"status": "error", "message": "Invalid escape \q sequence"}"#,
            Self::TrailingComma => r#"{"status": "error", "message": "Trailing comma",}"#,
            Self::UnquotedKey => r#"{status: "error", "message": "Unquoted key"}"#,
            Self::SingleQuotes => "{'status': 'error', 'message': 'Single quotes instead of double'}",
        }
    }
}

impl fmt::Display for JsonDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
