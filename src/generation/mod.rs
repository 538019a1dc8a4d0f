//! Batch generation: unit plan, per-unit runner, concurrent rounds and the
//! retry loop that drives rounds until every unit succeeds or runs out of attempts.

pub mod executor;
pub mod outcome;
pub mod plan;
pub mod run;
pub mod runner;
pub mod split;

pub use executor::{ConsoleReporter, RoundReporter, RoundResult, RoundScheduler, TracingReporter};
pub use outcome::{FailureKind, Outcome, OutcomeStatus};
pub use plan::{default_plan, parse_batch, validate_plan, Unit};
pub use run::{BackoffPolicy, RoundSummary, RunReport, StabilityLoop};
pub use runner::UnitRunner;
pub use split::{split_and_persist, PartialSplit, SplitReport};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduler, retry and backoff settings for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Units in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Total runs allowed per unit, first attempt included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    /// Upper bound of the uniform jitter added to each backoff
    #[serde(default = "default_jitter_max_ms")]
    pub jitter_max_ms: u64,

    /// Fixed delay before every remote call
    #[serde(default = "default_pre_call_delay_ms")]
    pub pre_call_delay_ms: u64,

    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Dump raw content of count-mismatched responses to the fallback sink
    #[serde(default)]
    pub debug_dump: bool,
}

fn default_concurrency() -> usize {
    3
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    2000
}

fn default_jitter_max_ms() -> u64 {
    1000
}

fn default_pre_call_delay_ms() -> u64 {
    500
}

fn default_call_timeout_secs() -> u64 {
    120
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            jitter_max_ms: default_jitter_max_ms(),
            pre_call_delay_ms: default_pre_call_delay_ms(),
            call_timeout_secs: default_call_timeout_secs(),
            debug_dump: false,
        }
    }
}

impl GenerationSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("Concurrency must be at least 1".to_string());
        }
        if self.max_attempts == 0 {
            return Err("Max attempts must be at least 1".to_string());
        }
        if self.call_timeout_secs == 0 {
            return Err("Call timeout must be at least 1 second".to_string());
        }
        Ok(())
    }

    pub fn pre_call_delay(&self) -> Duration {
        Duration::from_millis(self.pre_call_delay_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.base_backoff_ms),
            Duration::from_millis(self.jitter_max_ms),
        )
    }
}
