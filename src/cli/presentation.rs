//! CLI presentation: text and json formatters for plan, latest, generate and script results.

use crate::error::{DeckError, StorageError};
use crate::generation::{RunReport, Unit};
use crate::narration::ScriptReport;
use crate::prompt::SlidePromptCatalog;
use crate::store::LatestRecord;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde_json::json;
use std::path::Path;

fn format_section_heading(title: &str) -> String {
    format!("{}\n{}", title, "-".repeat(title.chars().count()))
}

fn to_pretty_json(value: &serde_json::Value, what: &str) -> Result<String, DeckError> {
    serde_json::to_string_pretty(value).map_err(|e| {
        DeckError::Storage(StorageError::Serialization {
            identifier: what.to_string(),
            message: e.to_string(),
        })
    })
}

pub fn format_plan_text(units: &[Unit]) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Batch plan"));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["#", "Slides", "Label", "Expected"]);
    for (i, unit) in units.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            unit.range_label(),
            unit.label.clone(),
            unit.expected_count().to_string(),
        ]);
    }
    out.push_str(&format!("{}\n", table));

    let total: usize = units.iter().map(Unit::expected_count).sum();
    out.push_str(&format!("\n{} batches, {} slides", units.len(), total));
    out
}

pub fn format_plan_json(units: &[Unit]) -> Result<String, DeckError> {
    let batches: Vec<serde_json::Value> = units
        .iter()
        .map(|unit| {
            json!({
                "range_start": unit.range_start,
                "range_end": unit.range_end,
                "label": unit.label,
                "expected_count": unit.expected_count(),
            })
        })
        .collect();
    let total: usize = units.iter().map(Unit::expected_count).sum();
    to_pretty_json(&json!({ "batches": batches, "total_slides": total }), "plan")
}

pub fn format_latest_text(records: &[LatestRecord], dir: &Path) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Latest slide records"));
    if records.is_empty() {
        out.push_str(&format!("No slide records found in {}.", dir.display()));
        return out;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Slide", "Title", "File"]);
    for record in records {
        let file = record
            .path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        table.add_row(vec![
            record.slide.to_string(),
            SlidePromptCatalog::title(record.slide)
                .unwrap_or("-")
                .to_string(),
            file,
        ]);
    }
    out.push_str(&format!("{}\n", table));

    let missing: Vec<String> = (crate::prompt::FIRST_SLIDE..=crate::prompt::LAST_SLIDE)
        .filter(|slide| !records.iter().any(|r| r.slide == *slide))
        .map(|slide| slide.to_string())
        .collect();
    if !missing.is_empty() {
        out.push_str(&format!("\nMissing slides: {}", missing.join(", ")));
    }
    out
}

pub fn format_latest_json(records: &[LatestRecord]) -> Result<String, DeckError> {
    let value = serde_json::to_value(records).map_err(|e| {
        DeckError::Storage(StorageError::Serialization {
            identifier: "latest".to_string(),
            message: e.to_string(),
        })
    })?;
    to_pretty_json(&json!({ "records": value }), "latest")
}

/// Final tally: one row per round, then every permanently failed batch.
pub fn format_run_report(report: &RunReport, output_dir: &Path) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Generation rounds"));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Round", "Ran", "Succeeded", "Failed", "Retried", "Time", "Backoff"]);
    for round in &report.rounds {
        table.add_row(vec![
            round.round.to_string(),
            round.attempted.to_string(),
            round.succeeded.to_string(),
            round.failed.to_string(),
            round.retried.to_string(),
            format!("{:.1}s", round.elapsed_ms as f64 / 1000.0),
            if round.backoff_ms > 0 {
                format!("{:.1}s", round.backoff_ms as f64 / 1000.0)
            } else {
                "-".to_string()
            },
        ]);
    }
    out.push_str(&format!("{}\n\n", table));

    out.push_str(&format!(
        "{} batch(es) succeeded. Records in {}\n",
        report.succeeded.len(),
        output_dir.display()
    ));

    if report.is_complete() {
        out.push_str("All batches completed.");
    } else {
        out.push_str(&format!(
            "\n{}\n",
            format_section_heading("Permanently failed batches")
        ));
        for outcome in &report.exhausted {
            out.push_str(&format!("  - {}\n", outcome.summary));
            for message in &outcome.messages {
                out.push_str(&format!("      {}\n", message));
            }
        }
    }
    out
}

/// Scripts written, where they went, then every failed batch.
pub fn format_script_report(report: &ScriptReport, saved: Option<&Path>) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Narration scripts"));

    if !report.scripts.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Slide", "Title", "Talk points"]);
        for script in &report.scripts {
            let talk_points = script["talkPoints"].as_array().map(Vec::len).unwrap_or(0);
            table.add_row(vec![
                script["slideNumber"].to_string(),
                script["title"].as_str().unwrap_or("-").to_string(),
                talk_points.to_string(),
            ]);
        }
        out.push_str(&format!("{}\n\n", table));
    }

    match saved {
        Some(path) => out.push_str(&format!(
            "{} script(s) saved to {}\n",
            report.scripts.len(),
            path.display()
        )),
        None => out.push_str("No scripts were written.\n"),
    }

    if !report.failures.is_empty() {
        out.push_str(&format!("\n{}\n", format_section_heading("Failed script batches")));
        for failure in &report.failures {
            let slides: Vec<String> = failure.slides.iter().map(u32::to_string).collect();
            out.push_str(&format!("  - slides {}: {}\n", slides.join(", "), failure.reason));
        }
    }
    out
}
