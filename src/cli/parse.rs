//! CLI parse: clap types for deckwright. No behavior; definitions only.

use crate::narration::{NarrationLanguage, NarrationStyle};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// deckwright - generate IR deck slide data from a source document
#[derive(Parser)]
#[command(name = "deckwright")]
#[command(about = "Generate IR deck slide JSON from an HTML document, batch by batch")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate slide records for every batch, retrying failed batches
    Generate {
        /// Batch to run, as START-END[:LABEL]; repeatable. Defaults to the full deck plan
        #[arg(long = "batch", value_name = "START-END[:LABEL]")]
        batches: Vec<String>,

        /// Source document (HTML, or a JSON export with content.html)
        #[arg(long)]
        source: Option<PathBuf>,

        /// Output directory for slide records
        #[arg(long)]
        output: Option<PathBuf>,

        /// Batches in flight at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Total runs allowed per batch
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Model identifier
        #[arg(long)]
        model: Option<String>,

        /// Dump raw content of count-mismatched responses
        #[arg(long)]
        debug_dump: bool,
    },
    /// Show the batch plan and expected slide counts
    Plan {
        /// Batch to show instead of the default plan; repeatable
        #[arg(long = "batch", value_name = "START-END[:LABEL]")]
        batches: Vec<String>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Write presenter scripts from the newest record of each slide
    Script {
        /// Directory holding slide records (defaults to the configured output directory)
        #[arg(long)]
        slides: Option<PathBuf>,

        /// Directory receiving the scripts file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Narration tone
        #[arg(long, value_enum)]
        style: Option<NarrationStyle>,

        /// Narration language
        #[arg(long, value_enum)]
        language: Option<NarrationLanguage>,

        /// Model identifier for script calls
        #[arg(long)]
        model: Option<String>,

        /// Sampling temperature
        #[arg(long)]
        temperature: Option<f32>,

        /// Slides per call
        #[arg(long)]
        batch_size: Option<usize>,

        /// Only narrate the first N slides
        #[arg(long)]
        max_slides: Option<usize>,
    },
    /// List the newest record per slide in the output directory
    Latest {
        /// Output directory to read (defaults to the configured one)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}
