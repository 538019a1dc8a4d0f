//! Scheduling guarantees under arbitrary latencies and failure patterns.

use async_trait::async_trait;
use deckwright::error::ProviderError;
use deckwright::generation::{
    GenerationSettings, Outcome, RoundReporter, RoundScheduler, StabilityLoop, Unit, UnitRunner,
};
use deckwright::prompt::SlidePromptCatalog;
use deckwright::provider::{
    ChatMessage, CompletionOptions, CompletionResponse, ModelProviderClient, RemoteCallAdapter,
};
use deckwright::store::{MemoryFallbackSink, MemoryRecordStore};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Single-slide units; unit `i` covers slide `i + 1`.
struct PlannedProvider {
    latency_ms: Vec<u64>,
    failures_left: Mutex<Vec<u32>>,
}

fn slide_of(instruction: &str) -> usize {
    instruction
        .split("produce slides ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|n| n.parse::<usize>().ok())
        .unwrap_or(1)
}

#[async_trait]
impl ModelProviderClient for PlannedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<CompletionResponse, ProviderError> {
        let slot = slide_of(&messages[messages.len() - 1].content) - 1;
        tokio::time::sleep(Duration::from_millis(self.latency_ms[slot])).await;

        let fail = {
            let mut failures = self.failures_left.lock();
            if failures[slot] > 0 {
                failures[slot] -= 1;
                true
            } else {
                false
            }
        };
        if fail {
            return Err(ProviderError::Status {
                status: 500,
                body: "scripted".to_string(),
            });
        }
        Ok(CompletionResponse {
            content: "{\"ok\": true}".to_string(),
            model: "planned".to_string(),
            finish_reason: None,
        })
    }

    fn provider_name(&self) -> &str {
        "planned"
    }

    fn model_name(&self) -> &str {
        "planned"
    }
}

#[derive(Default)]
struct AttemptLog {
    rounds: Mutex<Vec<Vec<(u32, u32)>>>,
}

impl RoundReporter for AttemptLog {
    fn unit_completed(&self, _outcome: &Outcome) {}

    fn round_completed(&self, outcomes: &[Outcome]) {
        self.rounds.lock().push(
            outcomes
                .iter()
                .map(|o| (o.unit.range_start, o.unit.attempt))
                .collect(),
        );
    }
}

fn build(
    latency_ms: Vec<u64>,
    failures: Vec<u32>,
    concurrency: usize,
    max_attempts: u32,
    log: Arc<AttemptLog>,
) -> RoundScheduler {
    let settings = GenerationSettings {
        concurrency,
        max_attempts,
        pre_call_delay_ms: 0,
        base_backoff_ms: 100,
        jitter_max_ms: 50,
        ..GenerationSettings::default()
    };
    let fallback = Arc::new(MemoryFallbackSink::new());
    let provider = Arc::new(PlannedProvider {
        latency_ms,
        failures_left: Mutex::new(failures),
    });
    let runner = UnitRunner::new(
        RemoteCallAdapter::new(provider, fallback.clone(), "system"),
        Arc::new(SlidePromptCatalog::new()),
        Arc::new(MemoryRecordStore::new()),
        fallback,
        &settings,
    );
    RoundScheduler::new(Arc::new(runner), concurrency, log)
}

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap()
}

fn single_slide_units(n: usize) -> Vec<Unit> {
    (1..=n as u32)
        .map(|i| Unit::new(i, i, format!("slide {}", i)).unwrap())
        .collect()
}

/// Outcomes come back in input order whatever the completion order.
#[test]
fn test_outcome_order_ignores_latency() {
    let mut runner = proptest::test_runner::TestRunner::new(proptest::test_runner::Config {
        cases: 64,
        ..proptest::test_runner::Config::default()
    });

    runner
        .run(
            &(prop::collection::vec(0u64..500, 1..18), 1usize..6),
            |(latency_ms, concurrency)| {
                let n = latency_ms.len();
                let log = Arc::new(AttemptLog::default());
                let scheduler = build(latency_ms, vec![0; n], concurrency, 1, log);
                let units: Vec<Arc<Unit>> = single_slide_units(n).into_iter().map(Arc::new).collect();

                let result = paused_runtime().block_on(scheduler.run_round("<html/>", &units));

                let starts: Vec<u32> = result.outcomes.iter().map(|o| o.unit.range_start).collect();
                let expected: Vec<u32> = (1..=n as u32).collect();
                prop_assert_eq!(starts, expected);
                prop_assert!(result.outcomes.iter().all(Outcome::success));
                Ok(())
            },
        )
        .unwrap();
}

/// Attempts grow by one per round, never pass the limit, and the loop ends
/// within `max_attempts` rounds.
#[test]
fn test_retry_attempts_are_monotonic_and_bounded() {
    let mut runner = proptest::test_runner::TestRunner::new(proptest::test_runner::Config {
        cases: 64,
        ..proptest::test_runner::Config::default()
    });

    runner
        .run(
            &(prop::collection::vec(0u32..6, 1..10), 1u32..5, 1usize..4),
            |(failures, max_attempts, concurrency)| {
                let n = failures.len();
                let log = Arc::new(AttemptLog::default());
                let scheduler = build(vec![5; n], failures.clone(), concurrency, max_attempts, log.clone());
                let stability = StabilityLoop::new(
                    scheduler,
                    deckwright::generation::BackoffPolicy::new(
                        Duration::from_millis(100),
                        Duration::from_millis(50),
                    ),
                );

                let report = paused_runtime()
                    .block_on(stability.run_until_stable("<html/>", single_slide_units(n)));

                prop_assert!(report.total_rounds() <= max_attempts as usize);

                let mut last_attempt: HashMap<u32, u32> = HashMap::new();
                for round in log.rounds.lock().iter() {
                    for (start, attempt) in round {
                        prop_assert!(*attempt <= max_attempts);
                        let expected = last_attempt.get(start).map(|a| a + 1).unwrap_or(1);
                        prop_assert_eq!(*attempt, expected);
                        last_attempt.insert(*start, *attempt);
                    }
                }

                let expected_exhausted = failures.iter().filter(|f| **f >= max_attempts).count();
                prop_assert_eq!(report.exhausted.len(), expected_exhausted);
                prop_assert_eq!(report.succeeded.len(), n - expected_exhausted);
                Ok(())
            },
        )
        .unwrap();
}
