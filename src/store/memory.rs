//! In-memory stores for dry runs and embedding callers that persist elsewhere.

use crate::error::StorageError;
use crate::store::{validate_identifier, FallbackSink, RecordStore};
use parking_lot::Mutex;
use std::path::PathBuf;

#[derive(Default)]
pub struct MemoryRecordStore {
    entries: Mutex<Vec<(String, serde_json::Value)>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of saved records, in save order.
    pub fn entries(&self) -> Vec<(String, serde_json::Value)> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl RecordStore for MemoryRecordStore {
    fn save(&self, identifier: &str, record: &serde_json::Value) -> Result<PathBuf, StorageError> {
        validate_identifier(identifier)?;
        let mut entries = self.entries.lock();
        entries.push((identifier.to_string(), record.clone()));
        Ok(PathBuf::from(format!("memory://records/{}/{}", identifier, entries.len())))
    }
}

#[derive(Default)]
pub struct MemoryFallbackSink {
    entries: Mutex<Vec<(String, String)>>,
}

impl MemoryFallbackSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries.lock().clone()
    }

    /// Entries whose identifier starts with `prefix`.
    pub fn entries_with_prefix(&self, prefix: &str) -> Vec<(String, String)> {
        self.entries
            .lock()
            .iter()
            .filter(|(id, _)| id.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl FallbackSink for MemoryFallbackSink {
    fn save(&self, identifier: &str, raw_text: &str) -> Result<PathBuf, StorageError> {
        validate_identifier(identifier)?;
        let mut entries = self.entries.lock();
        entries.push((identifier.to_string(), raw_text.to_string()));
        Ok(PathBuf::from(format!("memory://fallback/{}/{}", identifier, entries.len())))
    }
}
