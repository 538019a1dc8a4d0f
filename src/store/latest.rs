//! Latest-record lookup.
//!
//! Downstream tools consume only the newest record per slide. Record file
//! names embed a sortable timestamp, so the greatest file name per slide wins.

use crate::error::StorageError;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
pub struct LatestRecord {
    pub slide: u32,
    pub path: PathBuf,
    pub record: serde_json::Value,
}

/// Slide number encoded in a record file name such as `slide12_20250101-120000.json`.
pub fn slide_number_from_file_name(name: &str) -> Option<u32> {
    let pattern = Regex::new(r"^slide(\d+)_.*\.json$").ok()?;
    pattern
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Sort key for a record file: timestamp stem, then collision suffix.
/// `slide1_T-2.json` was written after `slide1_T.json` and `slide1_T-1.json`.
fn write_order_key(path: &Path) -> (String, u32) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let timestamp_end = stem.find('_').map(|i| i + 1 + "YYYYmmdd-HHMMSS".len());
    match timestamp_end {
        Some(end) if end < stem.len() && stem.is_char_boundary(end) => {
            let (base, suffix) = stem.split_at(end);
            match suffix.strip_prefix('-').and_then(|n| n.parse().ok()) {
                Some(n) => (base.to_string(), n),
                None => (stem.clone(), 0),
            }
        }
        _ => (stem, 0),
    }
}

/// Newest parseable record per slide under `dir`, ordered by slide number.
///
/// Files that are not valid JSON are skipped with a warning.
pub fn latest_records(dir: &Path) -> Result<Vec<LatestRecord>, StorageError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut candidates: BTreeMap<u32, Vec<PathBuf>> = BTreeMap::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(slide) = slide_number_from_file_name(&name) {
            candidates.entry(slide).or_default().push(entry.path());
        }
    }

    let mut latest = Vec::new();
    for (slide, mut paths) in candidates {
        paths.sort_by_key(|path| write_order_key(path));
        for path in paths.into_iter().rev() {
            let raw = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(record) => {
                    latest.push(LatestRecord {
                        slide,
                        path,
                        record,
                    });
                    break;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unparseable record");
                }
            }
        }
    }

    Ok(latest)
}
