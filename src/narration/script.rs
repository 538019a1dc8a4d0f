//! Script generation: batches of slides through the remote call adapter.
//!
//! A batch either yields one script per slide or fails as a whole; a failed
//! batch does not stop the others.

use crate::error::StorageError;
use crate::generation::split::{decode_record, split_segments};
use crate::narration::prompt::{batch_prompt, slide_prompt};
use crate::narration::{NarrationLanguage, NarrationSettings, NarrationStyle};
use crate::provider::{RawResult, RemoteCallAdapter};
use crate::store::{JsonRecordStore, LatestRecord, RecordStore};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Identifier of the scripts file; files are `slide_scripts_{timestamp}.json`.
pub const SCRIPTS_IDENTIFIER: &str = "slide_scripts";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptBatchFailure {
    pub slides: Vec<u32>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScriptReport {
    /// One object per narrated slide, in slide order
    pub scripts: Vec<Value>,
    pub failures: Vec<ScriptBatchFailure>,
}

impl ScriptReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Decode a reply into one script per slide of `batch`.
///
/// A single-slide reply is decoded whole; a batch reply is split on the
/// record delimiter first. Missing `slideNumber` fields are filled in.
pub fn decode_scripts(content: &str, batch: &[LatestRecord]) -> Result<Vec<Value>, String> {
    let segments = if batch.len() == 1 {
        vec![content.trim()]
    } else {
        split_segments(content)
    };

    let mut scripts = Vec::with_capacity(segments.len());
    for (position, segment) in segments.iter().enumerate() {
        let script = decode_record(segment)
            .ok_or_else(|| format!("reply segment {} is not a JSON object", position + 1))?;
        scripts.push(script);
    }

    if scripts.len() != batch.len() {
        return Err(format!(
            "script count mismatch: expected {}, got {}",
            batch.len(),
            scripts.len()
        ));
    }

    for (script, slide) in scripts.iter_mut().zip(batch) {
        if let Some(object) = script.as_object_mut() {
            object
                .entry("slideNumber")
                .or_insert_with(|| Value::from(slide.slide));
        }
    }
    Ok(scripts)
}

pub struct ScriptGenerator {
    adapter: RemoteCallAdapter,
    style: NarrationStyle,
    language: NarrationLanguage,
    batch_size: usize,
    concurrency: usize,
}

impl ScriptGenerator {
    pub fn new(adapter: RemoteCallAdapter, settings: &NarrationSettings, concurrency: usize) -> Self {
        Self {
            adapter,
            style: settings.style,
            language: settings.language,
            batch_size: settings.batch_size.max(1),
            concurrency: concurrency.max(1),
        }
    }

    /// Narrate `slides` in consecutive batches. Results keep slide order.
    pub async fn generate(&self, slides: &[LatestRecord]) -> ScriptReport {
        let results: Vec<(Vec<u32>, Result<Vec<Value>, String>)> =
            stream::iter(slides.chunks(self.batch_size))
                .map(|batch| async move {
                    let numbers: Vec<u32> = batch.iter().map(|slide| slide.slide).collect();
                    (numbers, self.run_batch(batch).await)
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut report = ScriptReport::default();
        for (slides, result) in results {
            match result {
                Ok(scripts) => report.scripts.extend(scripts),
                Err(reason) => report.failures.push(ScriptBatchFailure { slides, reason }),
            }
        }
        report
    }

    async fn run_batch(&self, batch: &[LatestRecord]) -> Result<Vec<Value>, String> {
        let (first, last) = match (batch.first(), batch.last()) {
            (Some(first), Some(last)) => (first.slide, last.slide),
            _ => return Ok(Vec::new()),
        };
        let prompt = if batch.len() == 1 {
            slide_prompt(&batch[0], self.style, self.language)
        } else {
            batch_prompt(batch, self.style, self.language)
        };

        let started = Instant::now();
        let dump_id = format!("scripts{}-{}_call", first, last);
        let result = match self.adapter.call_prompt(&prompt, &dump_id).await {
            RawResult::Text(content) => decode_scripts(&content, batch),
            RawResult::Failed(failure) => Err(format!("{}: {}", failure.kind, failure.diagnostic)),
        };

        match &result {
            Ok(scripts) => info!(
                first,
                last,
                scripts = scripts.len(),
                duration_ms = started.elapsed().as_millis(),
                "Script batch completed"
            ),
            Err(reason) => warn!(first, last, reason = %reason, "Script batch failed"),
        }
        result
    }
}

/// Write all scripts as one JSON array under `dir`. Never overwrites.
pub fn write_scripts(dir: &Path, scripts: &[Value]) -> Result<PathBuf, StorageError> {
    JsonRecordStore::new(dir).save(SCRIPTS_IDENTIFIER, &Value::Array(scripts.to_vec()))
}
