//! Stability loop: runs rounds until no unit is left to retry.

use crate::generation::executor::RoundScheduler;
use crate::generation::outcome::Outcome;
use crate::generation::plan::Unit;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Exponential backoff with uniform jitter: `base * 2^(round-1) + uniform(0, jitter_max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    jitter_max: Duration,
}

impl BackoffPolicy {
    const MAX_EXPONENT: u32 = 16;

    pub fn new(base: Duration, jitter_max: Duration) -> Self {
        Self { base, jitter_max }
    }

    /// Delay after `round` (1-based) with a fixed jitter fraction in `[0, 1]`.
    pub fn delay_with(&self, round: u32, jitter_fraction: f64) -> Duration {
        let exponent = round.saturating_sub(1).min(Self::MAX_EXPONENT);
        let backoff = self.base.saturating_mul(1u32 << exponent);
        let jitter = self.jitter_max.mul_f64(jitter_fraction.clamp(0.0, 1.0));
        backoff.saturating_add(jitter)
    }

    pub fn delay(&self, round: u32) -> Duration {
        let fraction: f64 = rand::thread_rng().gen();
        self.delay_with(round, fraction)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundSummary {
    pub round: u32,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub retried: usize,
    pub elapsed_ms: u128,
    /// Backoff slept after this round, zero for the last round
    pub backoff_ms: u128,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub rounds: Vec<RoundSummary>,
    pub succeeded: Vec<Arc<Unit>>,
    /// Final failed outcome of every unit that ran out of attempts
    pub exhausted: Vec<Outcome>,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.exhausted.is_empty()
    }

    pub fn total_rounds(&self) -> usize {
        self.rounds.len()
    }
}

pub struct StabilityLoop {
    scheduler: RoundScheduler,
    backoff: BackoffPolicy,
}

impl StabilityLoop {
    pub fn new(scheduler: RoundScheduler, backoff: BackoffPolicy) -> Self {
        Self { scheduler, backoff }
    }

    pub async fn run_until_stable(&self, context: &str, initial_units: Vec<Unit>) -> RunReport {
        let mut pending: Vec<Arc<Unit>> = initial_units.into_iter().map(Arc::new).collect();
        let mut report = RunReport::default();
        let max_attempts = self.scheduler.max_attempts();
        let mut round = 0u32;

        while !pending.is_empty() {
            round += 1;
            info!(
                round,
                units = pending.len(),
                concurrency = self.scheduler.concurrency(),
                "Round started"
            );

            let started = Instant::now();
            let result = self.scheduler.run_round(context, &pending).await;
            let elapsed = started.elapsed();

            let retried = result.retry_candidates.len();
            let mut summary = RoundSummary {
                round,
                attempted: pending.len(),
                succeeded: result.succeeded_count(),
                failed: result.failed_count(),
                retried,
                elapsed_ms: elapsed.as_millis(),
                backoff_ms: 0,
            };

            for outcome in result.outcomes {
                if outcome.success() {
                    report.succeeded.push(Arc::clone(&outcome.unit));
                } else if outcome.unit.attempt >= max_attempts {
                    warn!(
                        range = %outcome.unit.range_label(),
                        attempts = outcome.unit.attempt,
                        "Unit exhausted its attempts: {}",
                        outcome.summary
                    );
                    report.exhausted.push(outcome);
                }
            }

            if retried > 0 {
                let delay = self.backoff.delay(round);
                summary.backoff_ms = delay.as_millis();
                info!(
                    round,
                    retrying = retried,
                    delay_ms = delay.as_millis(),
                    "Backing off before next round"
                );
                report.rounds.push(summary);
                tokio::time::sleep(delay).await;
            } else {
                info!(round, succeeded = summary.succeeded, failed = summary.failed, "Round finished");
                report.rounds.push(summary);
            }

            pending = result.retry_candidates;
        }

        if !report.is_complete() {
            warn!(
                exhausted = report.exhausted.len(),
                rounds = report.rounds.len(),
                "Run finished with permanently failed units"
            );
        }
        report
    }
}
