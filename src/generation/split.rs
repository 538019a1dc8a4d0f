//! Split a multi-object completion into per-slide records.
//!
//! Segments are separated by a line of three or more dashes. Each segment is
//! decoded as a JSON object and saved as `slide{index}`; segments that do not
//! decode are written to the fallback sink verbatim and still counted.
//!
//! Section header fields are owned by the deck layout and never persisted
//! from a model reply.

use crate::error::StorageError;
use crate::store::{slide_identifier, FallbackSink, RecordStore};
use regex::Regex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

/// Layout metadata of the section slides. Stripped from every decoded record.
pub const IMMUTABLE_META_KEYS: &[&str] = &[
    "leftNumber",
    "leftTitle",
    "leftSubtitle",
    "rightTitle",
    "rightNumber",
];

fn delimiter() -> &'static Regex {
    static DELIMITER: OnceLock<Regex> = OnceLock::new();
    DELIMITER.get_or_init(|| Regex::new(r"\n?-{3,}\n?").expect("delimiter pattern is valid"))
}

fn code_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*\n?(.*?)```").expect("fence pattern is valid")
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitReport {
    /// Segments persisted, parsed or not
    pub saved_count: usize,
    pub parsed_count: usize,
    pub fallback_count: usize,
    pub messages: Vec<String>,
    pub locations: Vec<PathBuf>,
}

/// Storage failed partway through a response. `report` covers the segments
/// written before the failure.
#[derive(Debug, Error)]
#[error("storage failed after {} saved segment(s): {source}", .report.saved_count)]
pub struct PartialSplit {
    pub report: SplitReport,
    #[source]
    pub source: StorageError,
}

/// Non-empty, trimmed segments in output order.
pub fn split_segments(content: &str) -> Vec<&str> {
    delimiter()
        .split(content)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Text from the first `{` to the last `}`, if there is such a region.
fn brace_region(segment: &str) -> Option<&str> {
    let start = segment.find('{')?;
    let end = segment.rfind('}')?;
    (end > start).then(|| segment[start..=end].trim())
}

/// Decode a segment as a JSON object.
///
/// Candidates, in order: the inside of a code fence, the brace region, the
/// segment itself. A fence left open or closed by a neighbouring segment is
/// covered by the brace region, as is a line of prose ahead of the object.
pub fn decode_record(segment: &str) -> Option<Value> {
    let fenced = code_fence()
        .captures(segment)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim());

    fenced
        .into_iter()
        .chain(brace_region(segment))
        .chain(std::iter::once(segment))
        .filter(|candidate| !candidate.is_empty())
        .filter_map(|candidate| serde_json::from_str::<Value>(candidate).ok())
        .find(Value::is_object)
}

/// Drop [`IMMUTABLE_META_KEYS`] from a decoded object.
pub fn strip_immutable_meta(mut record: Value) -> Value {
    if let Some(object) = record.as_object_mut() {
        for key in IMMUTABLE_META_KEYS {
            object.remove(*key);
        }
    }
    record
}

/// Persist every segment of `content`, indexing from `start_index`.
///
/// `end_index` only shapes diagnostics; segments past it are still saved.
pub fn split_and_persist(
    content: &str,
    start_index: u32,
    end_index: u32,
    records: &dyn RecordStore,
    fallback: &dyn FallbackSink,
) -> Result<SplitReport, PartialSplit> {
    let mut report = SplitReport::default();

    for (offset, segment) in split_segments(content).into_iter().enumerate() {
        let index = start_index + offset as u32;
        let identifier = slide_identifier(index);

        if index > end_index {
            report.messages.push(format!(
                "slide {} is beyond the requested range {}-{}",
                index, start_index, end_index
            ));
        }

        match decode_record(segment) {
            Some(record) => {
                let path = match records.save(&identifier, &strip_immutable_meta(record)) {
                    Ok(path) => path,
                    Err(source) => return Err(PartialSplit { report, source }),
                };
                report.parsed_count += 1;
                report.locations.push(path);
            }
            None => {
                let path = match fallback.save(&identifier, segment) {
                    Ok(path) => path,
                    Err(source) => return Err(PartialSplit { report, source }),
                };
                report.fallback_count += 1;
                report.messages.push(format!(
                    "slide {} is not a JSON object; raw text saved to {}",
                    index,
                    path.display()
                ));
                report.locations.push(path);
            }
        }
        report.saved_count += 1;
    }

    Ok(report)
}
