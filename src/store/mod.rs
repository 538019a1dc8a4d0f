//! Record and Fallback Stores
//!
//! Destinations for generated slide data. Parsed slide objects go to a
//! [`RecordStore`]; raw text that could not be parsed, and dumps of failed
//! provider calls, go to a [`FallbackSink`] for manual recovery.

pub mod fs;
pub mod latest;
pub mod memory;

pub use fs::{FsFallbackSink, JsonRecordStore};
pub use latest::{latest_records, LatestRecord};
pub use memory::{MemoryFallbackSink, MemoryRecordStore};

use crate::error::StorageError;
use std::path::PathBuf;

/// Structured record store interface
pub trait RecordStore: Send + Sync {
    /// Persist one decoded record. Returns where it was written.
    fn save(&self, identifier: &str, record: &serde_json::Value) -> Result<PathBuf, StorageError>;
}

/// Write-once sink for unparsed text
pub trait FallbackSink: Send + Sync {
    fn save(&self, identifier: &str, raw_text: &str) -> Result<PathBuf, StorageError>;
}

/// Identifier used for the record of a single slide.
pub fn slide_identifier(slide_index: u32) -> String {
    format!("slide{}", slide_index)
}

/// Identifiers become file name stems, so only a conservative alphabet is allowed.
pub fn validate_identifier(identifier: &str) -> Result<(), StorageError> {
    let valid = !identifier.is_empty()
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidIdentifier(identifier.to_string()))
    }
}
