//! Configuration System
//!
//! Layered configuration for a generation run: built-in defaults, the user's
//! global config file, the workspace `deckwright.toml`, then an
//! environment-specific file. CLI flags are applied on top by the caller.

use crate::error::DeckError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use crate::generation::GenerationSettings;
pub use crate::narration::NarrationSettings;
pub use crate::provider::ProviderSettings;

mod credentials;
mod merge;
mod source;
mod sources;

pub use credentials::{Credentials, API_KEY_ENV};
pub use source::SourceDocument;

/// Name of the workspace configuration file.
pub const WORKSPACE_CONFIG_FILE: &str = "deckwright.toml";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeckConfig {
    /// Chat-completion provider settings
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Scheduler, retry and backoff settings
    #[serde(default)]
    pub generation: GenerationSettings,

    /// Narration script settings
    #[serde(default)]
    pub narration: NarrationSettings,

    /// Input and output locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Input and output locations. Relative paths are resolved against the workspace root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Source document (raw HTML, or a JSON export carrying `content.html`)
    #[serde(default = "default_source")]
    pub source: PathBuf,

    /// Directory receiving one JSON record per generated slide
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory receiving raw text that could not be parsed, and failed call dumps
    #[serde(default)]
    pub fallback_dir: Option<PathBuf>,

    /// Directory receiving narration script files
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,
}

fn default_source() -> PathBuf {
    PathBuf::from(".data/EX2.json")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("slides")
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("slide_scripts")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            output_dir: default_output_dir(),
            fallback_dir: None,
            scripts_dir: default_scripts_dir(),
        }
    }
}

/// Absolute locations derived from [`PathsConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub source: PathBuf,
    pub output_dir: PathBuf,
    pub fallback_dir: PathBuf,
    pub scripts_dir: PathBuf,
}

impl PathsConfig {
    pub fn resolve(&self, workspace_root: &Path) -> ResolvedPaths {
        let output_dir = resolve_against(workspace_root, &self.output_dir);
        let fallback_dir = match &self.fallback_dir {
            Some(dir) => resolve_against(workspace_root, dir),
            None => output_dir.join("fallback"),
        };
        ResolvedPaths {
            source: resolve_against(workspace_root, &self.source),
            output_dir,
            fallback_dir,
            scripts_dir: resolve_against(workspace_root, &self.scripts_dir),
        }
    }
}

fn resolve_against(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Provider(String),
    Generation(String),
    Narration(String),
    Paths(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
            ValidationError::Generation(msg) => write!(f, "Generation: {}", msg),
            ValidationError::Narration(msg) => write!(f, "Narration: {}", msg),
            ValidationError::Paths(msg) => write!(f, "Paths: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl DeckConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.provider.validate() {
            errors.push(ValidationError::Provider(e));
        }
        if let Err(e) = self.generation.validate() {
            errors.push(ValidationError::Generation(e));
        }
        if let Err(e) = self.narration.validate() {
            errors.push(ValidationError::Narration(e));
        }
        if self.paths.source.as_os_str().is_empty() {
            errors.push(ValidationError::Paths(
                "Source path cannot be empty".to_string(),
            ));
        }
        if self.paths.output_dir.as_os_str().is_empty() {
            errors.push(ValidationError::Paths(
                "Output directory cannot be empty".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold all errors into a single [`DeckError`].
    pub fn ensure_valid(&self) -> Result<(), DeckError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            DeckError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })
    }
}

/// Loads [`DeckConfig`] from the layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (lowest to highest): defaults, `~/.config/deckwright/config.toml`,
    /// `<workspace>/deckwright.toml`, `<workspace>/config/{DECK_ENV}.toml`.
    pub fn load(workspace_root: &Path) -> Result<DeckConfig, DeckError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        let config: DeckConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Load configuration from a single explicit file on top of the defaults.
    pub fn load_from_file(path: &Path) -> Result<DeckConfig, DeckError> {
        if !path.exists() {
            return Err(DeckError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = merge::merge_policy::builder_with_defaults()?
            .add_source(config::File::from(path.to_path_buf()).required(true));
        let config: DeckConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }
}
