//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_latest_json, format_latest_text, format_plan_json, format_plan_text, format_run_report,
    format_script_report,
};
use crate::config::{ConfigLoader, Credentials, DeckConfig, SourceDocument};
use crate::error::DeckError;
use crate::generation::{
    default_plan, parse_batch, validate_plan, ConsoleReporter, RoundReporter, RoundScheduler,
    StabilityLoop, TracingReporter, Unit, UnitRunner,
};
use crate::narration::{write_scripts, NarrationLanguage, NarrationStyle, ScriptGenerator};
use crate::prompt::SlidePromptCatalog;
use crate::provider::{OpenAIClient, RemoteCallAdapter};
use crate::store::{latest_records, FsFallbackSink, JsonRecordStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Flag values that override the loaded configuration for one `generate` run.
#[derive(Debug, Default, Clone)]
pub struct GenerateOverrides {
    pub source: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub max_attempts: Option<u32>,
    pub model: Option<String>,
    pub debug_dump: bool,
}

impl GenerateOverrides {
    pub fn apply(&self, config: &mut DeckConfig) {
        if let Some(ref source) = self.source {
            config.paths.source = source.clone();
        }
        if let Some(ref output) = self.output {
            config.paths.output_dir = output.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.generation.concurrency = concurrency;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.generation.max_attempts = max_attempts;
        }
        if let Some(ref model) = self.model {
            config.provider.model = model.clone();
        }
        if self.debug_dump {
            config.generation.debug_dump = true;
        }
    }
}

/// Flag values that override the loaded configuration for one `script` run.
#[derive(Debug, Default, Clone)]
pub struct ScriptOverrides {
    pub slides: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub style: Option<NarrationStyle>,
    pub language: Option<NarrationLanguage>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub batch_size: Option<usize>,
    pub max_slides: Option<usize>,
}

impl ScriptOverrides {
    pub fn apply(&self, config: &mut DeckConfig) {
        if let Some(ref slides) = self.slides {
            config.paths.output_dir = slides.clone();
        }
        if let Some(ref output) = self.output {
            config.paths.scripts_dir = output.clone();
        }
        if let Some(style) = self.style {
            config.narration.style = style;
        }
        if let Some(language) = self.language {
            config.narration.language = language;
        }
        if let Some(ref model) = self.model {
            config.narration.model = model.clone();
        }
        if let Some(temperature) = self.temperature {
            config.narration.temperature = temperature;
        }
        if let Some(batch_size) = self.batch_size {
            config.narration.batch_size = batch_size;
        }
        if let Some(max_slides) = self.max_slides {
            config.narration.max_slides = Some(max_slides);
        }
    }
}

fn current_thread_runtime() -> Result<tokio::runtime::Runtime, DeckError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| DeckError::ConfigError(format!("Failed to create tokio runtime: {}", e)))
}

/// Default plan, or the given `START-END[:LABEL]` batches. Always validated.
pub fn resolve_plan(batches: &[String]) -> Result<Vec<Unit>, DeckError> {
    let units = if batches.is_empty() {
        default_plan()
    } else {
        batches
            .iter()
            .map(|batch| parse_batch(batch))
            .collect::<Result<Vec<_>, _>>()?
    };
    validate_plan(&units)?;
    Ok(units)
}

/// Runtime context for CLI execution: workspace root and loaded configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: DeckConfig,
    console_progress: bool,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, DeckError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Ok(Self::with_config(workspace_root, config))
    }

    pub fn with_config(workspace_root: PathBuf, config: DeckConfig) -> Self {
        Self {
            workspace_root,
            config,
            console_progress: true,
        }
    }

    /// Print per-batch progress to stdout. When off, progress goes to the log only.
    pub fn with_console_progress(mut self, enabled: bool) -> Self {
        self.console_progress = enabled;
        self
    }

    pub fn config(&self) -> &DeckConfig {
        &self.config
    }

    pub fn console_progress(&self) -> bool {
        self.console_progress
    }

    fn round_reporter(&self) -> Arc<dyn RoundReporter> {
        if self.console_progress {
            Arc::new(ConsoleReporter)
        } else {
            Arc::new(TracingReporter)
        }
    }

    pub fn execute(&self, command: &Commands) -> Result<String, DeckError> {
        match command {
            Commands::Generate {
                batches,
                source,
                output,
                concurrency,
                max_attempts,
                model,
                debug_dump,
            } => {
                let overrides = GenerateOverrides {
                    source: source.clone(),
                    output: output.clone(),
                    concurrency: *concurrency,
                    max_attempts: *max_attempts,
                    model: model.clone(),
                    debug_dump: *debug_dump,
                };
                self.handle_generate(batches, &overrides)
            }
            Commands::Plan { batches, format } => {
                let units = resolve_plan(batches)?;
                if format == "json" {
                    format_plan_json(&units)
                } else {
                    Ok(format_plan_text(&units))
                }
            }
            Commands::Script {
                slides,
                output,
                style,
                language,
                model,
                temperature,
                batch_size,
                max_slides,
            } => {
                let overrides = ScriptOverrides {
                    slides: slides.clone(),
                    output: output.clone(),
                    style: *style,
                    language: *language,
                    model: model.clone(),
                    temperature: *temperature,
                    batch_size: *batch_size,
                    max_slides: *max_slides,
                };
                self.handle_script(&overrides)
            }
            Commands::Latest { output, format } => {
                let dir = match output {
                    Some(dir) if dir.is_absolute() => dir.clone(),
                    Some(dir) => self.workspace_root.join(dir),
                    None => self.config.paths.resolve(&self.workspace_root).output_dir,
                };
                let records = latest_records(&dir)?;
                if format == "json" {
                    format_latest_json(&records)
                } else {
                    Ok(format_latest_text(&records, &dir))
                }
            }
        }
    }

    fn handle_generate(
        &self,
        batches: &[String],
        overrides: &GenerateOverrides,
    ) -> Result<String, DeckError> {
        let mut config = self.config.clone();
        overrides.apply(&mut config);
        config.ensure_valid()?;

        let units = resolve_plan(batches)?;
        let paths = config.paths.resolve(&self.workspace_root);
        let credentials = Credentials::from_env(&self.workspace_root)?;
        let source = SourceDocument::load(&paths.source)?;

        info!(
            source = %paths.source.display(),
            output = %paths.output_dir.display(),
            batches = units.len(),
            model = %config.provider.model,
            "Starting generation"
        );

        let records = Arc::new(JsonRecordStore::new(&paths.output_dir));
        let fallback = Arc::new(FsFallbackSink::new(&paths.fallback_dir));
        let client = Arc::new(OpenAIClient::from_settings(
            &config.provider,
            credentials.api_key(),
        )?);
        let adapter = RemoteCallAdapter::new(
            client,
            fallback.clone(),
            config.provider.system_prompt.clone(),
        )
        .with_options(config.provider.completion_options())
        .with_timeout(config.generation.call_timeout());

        let runner = UnitRunner::new(
            adapter,
            Arc::new(SlidePromptCatalog::new()),
            records,
            fallback,
            &config.generation,
        );
        let scheduler = RoundScheduler::new(
            Arc::new(runner),
            config.generation.concurrency,
            self.round_reporter(),
        );
        let stability = StabilityLoop::new(scheduler, config.generation.backoff_policy());

        let runtime = current_thread_runtime()?;

        let started = Instant::now();
        let report = runtime.block_on(stability.run_until_stable(&source.text, units));
        info!(
            rounds = report.total_rounds(),
            succeeded = report.succeeded.len(),
            exhausted = report.exhausted.len(),
            duration_ms = started.elapsed().as_millis(),
            "Generation finished"
        );

        let tally = format_run_report(&report, &paths.output_dir);
        if report.is_complete() {
            Ok(tally)
        } else {
            Err(DeckError::GenerationIncomplete {
                failed: report.exhausted.len(),
                tally,
            })
        }
    }

    fn handle_script(&self, overrides: &ScriptOverrides) -> Result<String, DeckError> {
        let mut config = self.config.clone();
        overrides.apply(&mut config);
        config.ensure_valid()?;

        let paths = config.paths.resolve(&self.workspace_root);
        let slides = config.narration.select(latest_records(&paths.output_dir)?);
        if slides.is_empty() {
            return Err(DeckError::NoSlideRecords(paths.output_dir));
        }
        let credentials = Credentials::from_env(&self.workspace_root)?;

        info!(
            slides_dir = %paths.output_dir.display(),
            scripts_dir = %paths.scripts_dir.display(),
            slides = slides.len(),
            batch_size = config.narration.batch_size,
            model = %config.narration.model,
            "Starting narration"
        );

        let provider = config.narration.provider_settings(&config.provider);
        let client = Arc::new(OpenAIClient::from_settings(&provider, credentials.api_key())?);
        let adapter = RemoteCallAdapter::new(
            client,
            Arc::new(FsFallbackSink::new(&paths.fallback_dir)),
            provider.system_prompt.clone(),
        )
        .with_options(provider.completion_options())
        .with_timeout(config.generation.call_timeout());
        let generator =
            ScriptGenerator::new(adapter, &config.narration, config.generation.concurrency);

        let runtime = current_thread_runtime()?;
        let report = runtime.block_on(generator.generate(&slides));

        let saved = if report.scripts.is_empty() {
            None
        } else {
            Some(write_scripts(&paths.scripts_dir, &report.scripts)?)
        };
        info!(
            scripts = report.scripts.len(),
            failed_batches = report.failures.len(),
            "Narration finished"
        );

        let tally = format_script_report(&report, saved.as_deref());
        if report.is_complete() {
            Ok(tally)
        } else {
            Err(DeckError::NarrationIncomplete {
                failed: report.failures.len(),
                tally,
            })
        }
    }
}
