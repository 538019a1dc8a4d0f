use crate::generation::plan::Unit;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Why a unit run did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The call itself failed; `status` is set when the provider answered
    TransportFailure { status: Option<u16>, detail: String },
    EmptyResponse,
    /// Saved segment count differs from the unit's slide count
    CardinalityMismatch { expected: usize, actual: usize },
    /// Storage error, render error or panic caught at the runner boundary
    Unhandled(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::TransportFailure {
                status: Some(status),
                detail,
            } => write!(f, "transport failure (HTTP {}): {}", status, detail),
            FailureKind::TransportFailure { status: None, detail } => {
                write!(f, "transport failure: {}", detail)
            }
            FailureKind::EmptyResponse => write!(f, "empty response"),
            FailureKind::CardinalityMismatch { expected, actual } => {
                write!(f, "slide count mismatch: expected {}, got {}", expected, actual)
            }
            FailureKind::Unhandled(message) => write!(f, "unhandled error: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Succeeded,
    Failed(FailureKind),
}

/// Result of one unit run
#[derive(Debug, Clone)]
pub struct Outcome {
    /// The unit as it was run, attempt included
    pub unit: Arc<Unit>,
    pub status: OutcomeStatus,
    pub summary: String,
    pub messages: Vec<String>,
    pub elapsed: Duration,
}

impl Outcome {
    pub fn success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Succeeded)
    }

    pub fn failure(&self) -> Option<&FailureKind> {
        match &self.status {
            OutcomeStatus::Failed(kind) => Some(kind),
            OutcomeStatus::Succeeded => None,
        }
    }
}
