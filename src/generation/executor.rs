//! Round scheduler: runs a round of units concurrently under a permit ceiling.
//! Reports outcomes as they complete; returns them in input order together with the retry set.

use crate::generation::outcome::{FailureKind, Outcome, OutcomeStatus};
use crate::generation::plan::Unit;
use crate::generation::runner::UnitRunner;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Receives outcomes while a round is running and once it has finished.
pub trait RoundReporter: Send + Sync {
    /// Called in completion order.
    fn unit_completed(&self, outcome: &Outcome);

    /// Called once per round with outcomes in input order.
    fn round_completed(&self, outcomes: &[Outcome]);
}

/// Reports through `tracing` only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl RoundReporter for TracingReporter {
    fn unit_completed(&self, outcome: &Outcome) {
        info!(
            range = %outcome.unit.range_label(),
            attempt = outcome.unit.attempt,
            success = outcome.success(),
            "{}",
            outcome.summary
        );
    }

    fn round_completed(&self, outcomes: &[Outcome]) {
        for outcome in outcomes {
            for message in &outcome.messages {
                info!(range = %outcome.unit.range_label(), "{}", message);
            }
        }
    }
}

/// Prints live summaries to stdout, then a per-round dump in plan order.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl RoundReporter for ConsoleReporter {
    fn unit_completed(&self, outcome: &Outcome) {
        println!("{}", outcome.summary);
    }

    fn round_completed(&self, outcomes: &[Outcome]) {
        println!("Round results:");
        for outcome in outcomes {
            println!("  {}", outcome.summary);
            for message in &outcome.messages {
                println!("    - {}", message);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoundResult {
    /// Index `i` belongs to input unit `i`
    pub outcomes: Vec<Outcome>,
    /// Failed units still under the attempt limit, next attempt, input order
    pub retry_candidates: Vec<Arc<Unit>>,
}

impl RoundResult {
    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.succeeded_count()
    }
}

/// Failed outcomes whose unit may run again, re-materialised with the next attempt.
pub fn retry_candidates(outcomes: &[Outcome], max_attempts: u32) -> Vec<Arc<Unit>> {
    outcomes
        .iter()
        .filter(|outcome| !outcome.success() && outcome.unit.attempt < max_attempts)
        .map(|outcome| Arc::new(outcome.unit.next_attempt()))
        .collect()
}

pub struct RoundScheduler {
    runner: Arc<UnitRunner>,
    semaphore: Semaphore,
    concurrency: usize,
    reporter: Arc<dyn RoundReporter>,
}

impl RoundScheduler {
    pub fn new(runner: Arc<UnitRunner>, concurrency: usize, reporter: Arc<dyn RoundReporter>) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            runner,
            semaphore: Semaphore::new(concurrency),
            concurrency,
            reporter,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn max_attempts(&self) -> u32 {
        self.runner.max_attempts()
    }

    pub async fn run_round(&self, context: &str, units: &[Arc<Unit>]) -> RoundResult {
        let mut slots: Vec<Option<Outcome>> = vec![None; units.len()];
        let mut futures = FuturesUnordered::new();

        for (index, unit) in units.iter().enumerate() {
            let unit = Arc::clone(unit);
            futures.push(async move {
                let outcome = match self.semaphore.acquire().await {
                    Ok(_permit) => self.runner.run(context, unit).await,
                    Err(_) => closed_outcome(unit),
                };
                (index, outcome)
            });
        }

        while let Some((index, outcome)) = futures.next().await {
            self.reporter.unit_completed(&outcome);
            slots[index] = Some(outcome);
        }

        let outcomes: Vec<Outcome> = slots.into_iter().flatten().collect();
        let retry_candidates = retry_candidates(&outcomes, self.max_attempts());
        self.reporter.round_completed(&outcomes);

        RoundResult {
            outcomes,
            retry_candidates,
        }
    }
}

fn closed_outcome(unit: Arc<Unit>) -> Outcome {
    warn!(range = %unit.range_label(), "Scheduler semaphore closed");
    Outcome {
        summary: format!("[failed] {} attempt {}: scheduler closed", unit, unit.attempt),
        unit,
        status: OutcomeStatus::Failed(FailureKind::Unhandled("semaphore closed".to_string())),
        messages: Vec::new(),
        elapsed: Duration::ZERO,
    }
}
