// Poll cycle errors

use std::fmt;

use thiserror::Error;

use crate::backend::Endpoint;

/// Coarse failure class: transient unavailability vs. backend contract drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    SchemaViolation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Network => "network",
            ErrorKind::SchemaViolation => "schema_violation",
        })
    }
}

/// Failure of a single sub-fetch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("{endpoint}: request failed: {message}")]
    Network { endpoint: Endpoint, message: String },
    #[error("{endpoint}: timed out after {timeout_ms} ms")]
    Timeout { endpoint: Endpoint, timeout_ms: u64 },
    #[error("{endpoint}: HTTP {status}")]
    Status { endpoint: Endpoint, status: u16 },
    #[error("{endpoint}: schema violation: {reason}")]
    SchemaViolation { endpoint: Endpoint, reason: String },
}

impl FetchError {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            FetchError::Network { endpoint, .. }
            | FetchError::Timeout { endpoint, .. }
            | FetchError::Status { endpoint, .. }
            | FetchError::SchemaViolation { endpoint, .. } => *endpoint,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::SchemaViolation { .. } => ErrorKind::SchemaViolation,
            _ => ErrorKind::Network,
        }
    }
}

/// A failed poll cycle. Holds every sub-fetch failure in endpoint order; never empty.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("poll cycle failed: {}", join_failures(.failures))]
pub struct AggregationError {
    failures: Vec<FetchError>,
}

fn join_failures(failures: &[FetchError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl AggregationError {
    /// Callers pass at least one failure.
    pub(crate) fn new(failures: Vec<FetchError>) -> Self {
        debug_assert!(!failures.is_empty());
        Self { failures }
    }

    pub fn failures(&self) -> &[FetchError] {
        &self.failures
    }

    pub fn is_schema_violation(&self) -> bool {
        self.failures
            .iter()
            .any(|f| f.kind() == ErrorKind::SchemaViolation)
    }

    /// Schema violation wins over network when both occurred in one cycle.
    pub fn kind(&self) -> ErrorKind {
        if self.is_schema_violation() {
            ErrorKind::SchemaViolation
        } else {
            ErrorKind::Network
        }
    }
}

impl From<FetchError> for AggregationError {
    fn from(e: FetchError) -> Self {
        Self { failures: vec![e] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregation_error_lists_all_failures() {
        let err = AggregationError::new(vec![
            FetchError::Status {
                endpoint: Endpoint::System,
                status: 502,
            },
            FetchError::SchemaViolation {
                endpoint: Endpoint::Data,
                reason: "missing field `streams`".into(),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("/status/system: HTTP 502"));
        assert!(msg.contains("/status/data: schema violation"));
        assert!(err.is_schema_violation());
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    }

    #[test]
    fn timeout_is_network_kind() {
        let e = FetchError::Timeout {
            endpoint: Endpoint::Services,
            timeout_ms: 1500,
        };
        assert_eq!(e.kind(), ErrorKind::Network);
        assert_eq!(e.endpoint(), Endpoint::Services);
        assert_eq!(AggregationError::from(e).kind(), ErrorKind::Network);
    }
}
