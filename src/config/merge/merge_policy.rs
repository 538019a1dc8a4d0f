//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Only keys that later file layers commonly override are seeded here; every
/// other field falls back to its serde default.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("provider.model", "o4-mini-2025-04-16")?
        .set_default("provider.base_url", "https://api.openai.com/v1")?
        .set_default("paths.source", ".data/EX2.json")?
        .set_default("paths.output_dir", "slides")
}
