//! Filesystem-backed stores.
//!
//! Files are named `{identifier}_{YYYYmmdd-HHMMSS}.{ext}`. Every write creates a
//! new file; a name collision within the same second gets a `-1`, `-2`, ...
//! suffix. Existing files are never overwritten.

use crate::error::StorageError;
use crate::store::{validate_identifier, FallbackSink, RecordStore};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

const MAX_NAME_ATTEMPTS: usize = 1000;

fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d-%H%M%S").to_string()
}

/// Write `bytes` to a fresh file under `dir`. Fails rather than overwrite.
fn write_once(dir: &Path, identifier: &str, extension: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
    validate_identifier(identifier)?;

    fs::create_dir_all(dir).map_err(|e| {
        StorageError::IoError(std::io::Error::new(
            e.kind(),
            format!("Failed to create directory {:?}: {}", dir, e),
        ))
    })?;

    let stem = format!("{}_{}", identifier, timestamp());
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = if attempt == 0 {
            format!("{}.{}", stem, extension)
        } else {
            format!("{}-{}.{}", stem, attempt, extension)
        };
        let path = dir.join(name);
        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(StorageError::IoError(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create {:?}: {}", path, e),
                )))
            }
        };
        file.write_all(bytes).map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                e.kind(),
                format!("Failed to write {:?}: {}", path, e),
            ))
        })?;
        return Ok(path);
    }

    Err(StorageError::PathExhausted(stem, MAX_NAME_ATTEMPTS))
}

/// Pretty-printed JSON files, one per record
pub struct JsonRecordStore {
    root: PathBuf,
}

impl JsonRecordStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl RecordStore for JsonRecordStore {
    fn save(&self, identifier: &str, record: &serde_json::Value) -> Result<PathBuf, StorageError> {
        let serialized =
            serde_json::to_vec_pretty(record).map_err(|e| StorageError::Serialization {
                identifier: identifier.to_string(),
                message: e.to_string(),
            })?;
        let path = write_once(&self.root, identifier, "json", &serialized)?;
        debug!(identifier, path = %path.display(), "Record saved");
        Ok(path)
    }
}

/// Plain-text files kept for postmortem and manual recovery
pub struct FsFallbackSink {
    root: PathBuf,
}

impl FsFallbackSink {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FallbackSink for FsFallbackSink {
    fn save(&self, identifier: &str, raw_text: &str) -> Result<PathBuf, StorageError> {
        let path = write_once(&self.root, identifier, "txt", raw_text.as_bytes())?;
        debug!(identifier, path = %path.display(), "Fallback text saved");
        Ok(path)
    }
}
