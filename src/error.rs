//! Error types for the deckwright slide generation pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid record identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Failed to serialize record {identifier}: {message}")]
    Serialization { identifier: String, message: String },

    #[error("Could not allocate a unique path for {0} after {1} tries")]
    PathExhausted(String, usize),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors raised by a model provider client for a single request
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Malformed response envelope: {message}")]
    MalformedEnvelope { message: String, body: String },

    #[error("HTTP error: {0}")]
    Http(String),
}

impl ProviderError {
    /// HTTP status carried by the error, if the provider answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body, when one was received.
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            ProviderError::Status { body, .. } => Some(body),
            ProviderError::MalformedEnvelope { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Top-level errors. Only startup paths surface these to the user; per-unit
/// faults are folded into generation outcomes.
#[derive(Debug, Error)]
pub enum DeckError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Missing credential: {0} is not set. Add it to the environment or a .env file.")]
    MissingCredential(String),

    #[error("Source document not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Source document is invalid: {0}")]
    SourceInvalid(String),

    #[error("Unsupported slide index: {0} (expected 1..=18)")]
    UnsupportedIndex(u32),

    #[error("Invalid unit: {0}")]
    InvalidUnit(String),

    /// Some units ran out of attempts; `tally` is the final run report.
    #[error("{failed} batch(es) failed permanently\n{tally}")]
    GenerationIncomplete { failed: usize, tally: String },

    #[error("No slide records found in {0}. Run `deckwright generate` first.")]
    NoSlideRecords(PathBuf),

    /// Some script batches failed; `tally` lists the scripts written and the failures.
    #[error("{failed} script batch(es) failed\n{tally}")]
    NarrationIncomplete { failed: usize, tally: String },

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<config::ConfigError> for DeckError {
    fn from(err: config::ConfigError) -> Self {
        DeckError::ConfigError(err.to_string())
    }
}
