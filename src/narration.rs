//! Narration Scripts
//!
//! Presenter scripts written from the newest record of each slide. One call
//! covers a batch of consecutive slides; the replies are collected into a
//! single timestamped JSON array under the scripts directory.

pub mod prompt;
pub mod script;

pub use prompt::{batch_prompt, slide_prompt, NARRATION_SYSTEM_PROMPT};
pub use script::{decode_scripts, write_scripts, ScriptBatchFailure, ScriptGenerator, ScriptReport};

use crate::provider::ProviderSettings;
use crate::store::LatestRecord;
use serde::{Deserialize, Serialize};

/// Tone of the narration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NarrationStyle {
    #[default]
    Concise,
    Persuasive,
    Friendly,
}

impl NarrationStyle {
    pub fn hint(&self) -> &'static str {
        match self {
            NarrationStyle::Concise => "concise, leading with the key message",
            NarrationStyle::Persuasive => "persuasive, pressing the point home for investors",
            NarrationStyle::Friendly => "conversational, natural and warm",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NarrationLanguage {
    #[default]
    Ko,
    En,
}

impl NarrationLanguage {
    pub fn name(&self) -> &'static str {
        match self {
            NarrationLanguage::Ko => "Korean",
            NarrationLanguage::En => "English",
        }
    }
}

/// Settings for the `script` command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationSettings {
    #[serde(default)]
    pub style: NarrationStyle,

    #[serde(default)]
    pub language: NarrationLanguage,

    /// Model for script calls. Needs to accept a temperature.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Slides per call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Only narrate the first N slides
    #[serde(default)]
    pub max_slides: Option<usize>,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.6
}

fn default_batch_size() -> usize {
    1
}

impl Default for NarrationSettings {
    fn default() -> Self {
        Self {
            style: NarrationStyle::default(),
            language: NarrationLanguage::default(),
            model: default_model(),
            temperature: default_temperature(),
            batch_size: default_batch_size(),
            max_slides: None,
        }
    }
}

impl NarrationSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("Model cannot be empty".to_string());
        }
        if self.batch_size == 0 {
            return Err("Batch size must be at least 1".to_string());
        }
        if self.max_slides == Some(0) {
            return Err("Max slides must be at least 1 when set".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "Temperature must be within 0.0..=2.0, got {}",
                self.temperature
            ));
        }
        Ok(())
    }

    /// Provider settings for script calls: the shared endpoint with this model and temperature.
    pub fn provider_settings(&self, base: &ProviderSettings) -> ProviderSettings {
        ProviderSettings {
            model: self.model.clone(),
            temperature: Some(self.temperature),
            system_prompt: NARRATION_SYSTEM_PROMPT.to_string(),
            ..base.clone()
        }
    }

    /// Slides to narrate, in slide order, capped at `max_slides`.
    pub fn select(&self, mut slides: Vec<LatestRecord>) -> Vec<LatestRecord> {
        slides.sort_by_key(|slide| slide.slide);
        if let Some(max) = self.max_slides {
            slides.truncate(max);
        }
        slides
    }
}
