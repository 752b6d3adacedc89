//! Scenario catalog
//!
//! Static mapping from scenario identifiers to descriptors. Curated
//! status codes come from a fixed table built once; any other code in
//! 100..=599 gets a descriptor synthesized from its class. Named faults
//! are resolved against the configured delays when the catalog is built
//! and never change afterwards.

mod faults;

pub use faults::*;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use crate::config::DelayConfig;
use crate::error::{SimulationError, SimulatorResult};

/// Lowest status code the simulator will produce
pub const MIN_STATUS: u16 = 100;
/// Highest status code the simulator will produce
pub const MAX_STATUS: u16 = 599;

/// Error codes the random scenario draws from
pub const RANDOM_POOL: [u16; 10] = [400, 401, 403, 404, 422, 429, 500, 502, 503, 504];

/// Broad class of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Informational,
    Success,
    Redirection,
    ClientError,
    ServerError,
    NetworkFault,
    PayloadFault,
}

impl Category {
    /// Category for a status code, by its hundreds digit
    pub fn from_status(code: u16) -> Option<Self> {
        match code / 100 {
            1 => Some(Self::Informational),
            2 => Some(Self::Success),
            3 => Some(Self::Redirection),
            4 => Some(Self::ClientError),
            5 => Some(Self::ServerError),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Informational => "informational",
            Self::Success => "success",
            Self::Redirection => "redirection",
            Self::ClientError => "client-error",
            Self::ServerError => "server-error",
            Self::NetworkFault => "network-fault",
            Self::PayloadFault => "payload-fault",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested scenario: either a bare status code or a named fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    Status(u16),
    Fault(NamedFault),
}

impl ScenarioId {
    /// Validate a numeric status code
    pub fn from_code(code: u16) -> SimulatorResult<Self> {
        if (MIN_STATUS..=MAX_STATUS).contains(&code) {
            Ok(Self::Status(code))
        } else {
            Err(SimulationError::invalid_param(
                "code",
                format!("Status code must be between {} and {}, got {}", MIN_STATUS, MAX_STATUS, code),
            ))
        }
    }

    /// Parse a textual identifier: digits are a status code, anything else a fault name
    pub fn parse(identifier: &str) -> SimulatorResult<Self> {
        let trimmed = identifier.trim();
        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            let code = trimmed.parse::<u16>().map_err(|_| {
                SimulationError::invalid_param("code", format!("Status code out of range: {}", trimmed))
            })?;
            return Self::from_code(code);
        }
        trimmed.parse::<NamedFault>().map(Self::Fault)
    }

    pub fn fault(&self) -> Option<NamedFault> {
        match self {
            Self::Fault(fault) => Some(*fault),
            Self::Status(_) => None,
        }
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "{}", code),
            Self::Fault(fault) => write!(f, "{}", fault),
        }
    }
}

/// Immutable description of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioDescriptor {
    /// Identifier as reported in `X-Scenario`
    pub id: String,
    /// Status code the scenario is reported with
    pub status: u16,
    /// Short title, e.g. "Bad Request"
    pub title: String,
    /// Default human-readable message
    pub message: String,
    /// Suggested debugging tip
    pub tip: String,
    pub category: Category,
    /// Whether the response carries a body
    pub has_body: bool,
    pub common_causes: Vec<String>,
    /// Built-in delay applied before responding, if any
    #[serde(skip_serializing_if = "Option::is_none", with = "optional_millis", default)]
    pub default_delay: Option<Duration>,
}

impl ScenarioDescriptor {
    /// Title as a snake_case error type (`Bad Request` -> `bad_request`)
    pub fn error_type(&self) -> String {
        self.title
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect()
    }
}

struct CuratedStatus {
    title: &'static str,
    message: &'static str,
    tip: &'static str,
    causes: &'static [&'static str],
}

static CURATED: Lazy<HashMap<u16, CuratedStatus>> = Lazy::new(|| {
    let entries = [
        (400, CuratedStatus {
            title: "Bad Request",
            message: "The request contains invalid syntax or cannot be fulfilled.",
            tip: "Check your request body, query parameters, and ensure all required fields are present and properly formatted.",
            causes: &["Invalid JSON syntax", "Missing required fields", "Invalid data types"],
        }),
        (401, CuratedStatus {
            title: "Unauthorized",
            message: "Authentication credentials are missing or invalid.",
            tip: "Include a valid API key in the 'x-api-key' header or check your authentication token.",
            causes: &["Missing API key", "Invalid credentials", "Expired token"],
        }),
        (403, CuratedStatus {
            title: "Forbidden",
            message: "You don't have permission to access this resource.",
            tip: "Verify your account has the necessary permissions or contact support to upgrade your access level.",
            causes: &["Insufficient permissions", "Account suspended", "IP blocked"],
        }),
        (404, CuratedStatus {
            title: "Not Found",
            message: "The requested endpoint or resource does not exist.",
            tip: "Check the URL path and ensure you're calling the correct endpoint. Verify the resource ID exists.",
            causes: &["Wrong endpoint URL", "Resource deleted", "Typo in path"],
        }),
        (422, CuratedStatus {
            title: "Unprocessable Entity",
            message: "The request body contains invalid or missing required fields.",
            tip: "Validate your JSON payload against the API schema. Check field types and required properties.",
            causes: &["Validation errors", "Business logic violations", "Invalid field values"],
        }),
        (429, CuratedStatus {
            title: "Too Many Requests",
            message: "Rate limit exceeded. You've sent too many requests in a given time period.",
            tip: "Implement exponential backoff in your client. Check the 'Retry-After' header for the wait time.",
            causes: &["Too many requests", "Rate limit exceeded", "Burst limit reached"],
        }),
        (500, CuratedStatus {
            title: "Internal Server Error",
            message: "An unexpected error occurred on the server side.",
            tip: "This is likely a temporary issue. Try again in a few moments or contact support if it persists.",
            causes: &["Server bug", "Database connection error", "Unhandled exception"],
        }),
        (502, CuratedStatus {
            title: "Bad Gateway",
            message: "The server received an invalid response from an upstream server.",
            tip: "This indicates a temporary server issue. Retry your request with exponential backoff.",
            causes: &["Upstream server error", "Load balancer issues", "Network problems"],
        }),
        (503, CuratedStatus {
            title: "Service Unavailable",
            message: "The service is temporarily unavailable, often due to maintenance or overload.",
            tip: "Wait a few minutes and try again. Check the service status page for maintenance announcements.",
            causes: &["Server maintenance", "Overloaded server", "Temporary outage"],
        }),
        (504, CuratedStatus {
            title: "Gateway Timeout",
            message: "The server didn't receive a response from an upstream server in time.",
            tip: "Reduce request complexity or try again later. Consider implementing client-side timeouts.",
            causes: &["Slow upstream response", "Network timeout", "Processing timeout"],
        }),
    ];
    entries.into_iter().collect()
});

/// Status codes that never carry a response body
fn status_has_body(code: u16) -> bool {
    !matches!(code, 100..=199 | 204 | 205 | 304)
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Read-only scenario table
#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    faults: HashMap<NamedFault, ScenarioDescriptor>,
}

impl ScenarioCatalog {
    /// Build the catalog, resolving fault delays against the configuration
    pub fn new(delay: &DelayConfig) -> Self {
        let faults = NamedFault::ALL
            .iter()
            .map(|fault| (*fault, fault_descriptor(*fault, delay)))
            .collect();
        Self { faults }
    }

    /// Resolve a scenario to its descriptor
    pub fn lookup(&self, id: &ScenarioId) -> SimulatorResult<ScenarioDescriptor> {
        match id {
            ScenarioId::Status(code) => self.lookup_status(*code),
            ScenarioId::Fault(fault) => self
                .faults
                .get(fault)
                .cloned()
                .ok_or_else(|| SimulationError::UnknownScenario(fault.to_string())),
        }
    }

    /// Parse and resolve a textual identifier
    pub fn lookup_str(&self, identifier: &str) -> SimulatorResult<ScenarioDescriptor> {
        let id = ScenarioId::parse(identifier).map_err(|e| match e {
            SimulationError::InvalidParameters { .. } => {
                SimulationError::UnknownScenario(identifier.to_string())
            }
            other => other,
        })?;
        self.lookup(&id)
    }

    fn lookup_status(&self, code: u16) -> SimulatorResult<ScenarioDescriptor> {
        let category = Category::from_status(code)
            .ok_or_else(|| SimulationError::UnknownScenario(code.to_string()))?;

        let descriptor = match CURATED.get(&code) {
            Some(curated) => ScenarioDescriptor {
                id: code.to_string(),
                status: code,
                title: curated.title.to_string(),
                message: curated.message.to_string(),
                tip: curated.tip.to_string(),
                category,
                has_body: true,
                common_causes: to_strings(curated.causes),
                default_delay: None,
            },
            None => synthesized_descriptor(code, category),
        };
        Ok(descriptor)
    }

    /// Whether a status code has a hand-written entry
    pub fn is_curated(&self, code: u16) -> bool {
        CURATED.contains_key(&code)
    }

    /// Curated codes and named faults, for listing
    pub fn entries(&self) -> Vec<ScenarioDescriptor> {
        let curated: BTreeMap<u16, ScenarioDescriptor> = CURATED
            .keys()
            .filter_map(|code| self.lookup_status(*code).ok().map(|d| (*code, d)))
            .collect();

        let mut entries: Vec<ScenarioDescriptor> = curated.into_values().collect();
        entries.extend(NamedFault::ALL.iter().filter_map(|f| self.faults.get(f).cloned()));
        entries
    }

    /// Random-scenario candidates after removing exclusions; never empty
    pub fn random_pool(&self, exclude: &[u16]) -> Vec<u16> {
        let pool: Vec<u16> = RANDOM_POOL
            .iter()
            .copied()
            .filter(|code| !exclude.contains(code))
            .collect();

        if pool.is_empty() {
            vec![500]
        } else {
            pool
        }
    }
}

impl Default for ScenarioCatalog {
    fn default() -> Self {
        Self::new(&DelayConfig::default())
    }
}

fn synthesized_descriptor(code: u16, category: Category) -> ScenarioDescriptor {
    let (title, tip) = match category {
        Category::Informational => (
            "Informational",
            "Informational responses are interim; clients should wait for the final response.",
        ),
        Category::Success => (
            "Success",
            "The request succeeded. Check the body and headers for the result.",
        ),
        Category::Redirection => (
            "Redirection",
            "Follow the 'Location' header or update the URL you are calling.",
        ),
        Category::ClientError => (
            "Client Error",
            "Inspect the request you sent; the server rejected it as invalid.",
        ),
        _ => (
            "Server Error",
            "The failure is on the server side. Retry with exponential backoff.",
        ),
    };

    ScenarioDescriptor {
        id: code.to_string(),
        status: code,
        title: title.to_string(),
        message: format!("HTTP status code {} was returned.", code),
        tip: format!("{} Refer to HTTP status code documentation for this specific code.", tip),
        category,
        has_body: status_has_body(code),
        common_causes: vec!["Unknown cause".to_string()],
        default_delay: None,
    }
}

fn fault_descriptor(fault: NamedFault, delay: &DelayConfig) -> ScenarioDescriptor {
    let (title, message, tip, category, causes, default_delay): (
        &str,
        &str,
        &str,
        Category,
        &[&str],
        Option<Duration>,
    ) = match fault {
        NamedFault::Timeout => (
            "Gateway Timeout",
            "The upstream server did not respond before the gateway gave up.",
            "Implement progressive timeout values: connection timeout (5s), read timeout (30s).",
            Category::NetworkFault,
            &["Slow upstream response", "Network timeout", "Processing timeout"],
            Some(delay.timeout_delay),
        ),
        NamedFault::Slow => (
            "Slow Response",
            "The response was intentionally delayed.",
            "Test client timeout handling and loading states; show progress for long requests.",
            Category::NetworkFault,
            &["Overloaded upstream", "Cold start", "Large payload processing"],
            Some(delay.slow_delay),
        ),
        NamedFault::MalformedJson => (
            "Malformed JSON",
            "The response body is not valid JSON.",
            "Wrap response parsing in error handling and log the raw body when parsing fails.",
            Category::PayloadFault,
            &["Serializer bug", "Hand-built JSON", "Proxy rewriting the body"],
            None,
        ),
        NamedFault::TruncatedResponse => (
            "Truncated Response",
            "The response body ended before the document was complete.",
            "Compare received bytes with Content-Length and retry idempotent requests on short reads.",
            Category::PayloadFault,
            &["Connection dropped mid-transfer", "Proxy buffer limits", "Server crash while streaming"],
            None,
        ),
        NamedFault::ConnectionReset => (
            "Internal Server Error",
            "Connection reset by peer",
            "Retry idempotent requests with backoff and check for upstream crashes or load balancer idle timeouts.",
            Category::NetworkFault,
            &["Upstream process crashed", "Load balancer idle timeout", "Firewall dropping connections"],
            None,
        ),
        NamedFault::DnsFailure => (
            "Bad Gateway",
            "DNS resolution failed for upstream service",
            "Check network connectivity and DNS settings",
            Category::NetworkFault,
            &["Network connectivity issues", "DNS server problems", "Firewall blocking DNS"],
            None,
        ),
        NamedFault::SslError => (
            "SSL/TLS Error",
            "SSL certificate verification failed",
            "Check SSL certificate validity and chain",
            Category::NetworkFault,
            &["Expired certificate", "Self-signed certificate", "Certificate chain issues"],
            None,
        ),
    };

    ScenarioDescriptor {
        id: fault.id().to_string(),
        status: fault.status(),
        title: title.to_string(),
        message: message.to_string(),
        tip: tip.to_string(),
        category,
        has_body: true,
        common_causes: to_strings(causes),
        default_delay,
    }
}

mod optional_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_u64(d.as_millis() as u64),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
