//! Source document loading.
//!
//! The shared context for every unit in a run. Either a raw HTML/text file, or
//! a JSON export whose `content.html` field carries the document.

use crate::error::DeckError;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub text: String,
}

impl SourceDocument {
    pub fn load(path: &Path) -> Result<Self, DeckError> {
        if !path.is_file() {
            return Err(DeckError::SourceNotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DeckError::SourceInvalid(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let text = if is_json { Self::html_from_export(&raw)? } else { raw };

        if text.trim().is_empty() {
            return Err(DeckError::SourceInvalid(format!(
                "{} is empty",
                path.display()
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            text,
        })
    }

    fn html_from_export(raw: &str) -> Result<String, DeckError> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| DeckError::SourceInvalid(format!("Export is not valid JSON: {}", e)))?;
        value
            .get("content")
            .and_then(|content| content.get("html"))
            .and_then(|html| html.as_str())
            .filter(|html| !html.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                DeckError::SourceInvalid("Export has no 'content.html' field".to_string())
            })
    }
}
