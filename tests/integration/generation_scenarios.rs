//! End-to-end scheduler and retry-loop scenarios against a scripted provider.

use super::support::{objects, settings, Harness, ScriptedProvider, Step};
use deckwright::generation::{default_plan, FailureKind, Unit};
use std::sync::Arc;
use std::time::Duration;

const CONTEXT: &str = "<html><body>IR deck source</body></html>";

#[tokio::test(start_paused = true)]
async fn test_all_units_succeed_in_one_round() {
    let harness = Harness::new(ScriptedProvider::new());
    let settings = settings(3, 3);

    let report = harness
        .stability_loop(&settings)
        .run_until_stable(CONTEXT, default_plan())
        .await;

    assert!(report.is_complete());
    assert_eq!(report.total_rounds(), 1);
    assert_eq!(report.succeeded.len(), 7);
    assert_eq!(harness.records.len(), 18);
    assert!(harness.fallback.is_empty());
    assert!(harness.provider.peak() <= 3);
    assert_eq!(harness.reporter.rounds.lock()[0].len(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_short_response_is_retried_at_next_attempt() {
    let provider = ScriptedProvider::new().script(1, vec![Step::Objects(2)]);
    let harness = Harness::new(provider);
    let settings = settings(3, 3);
    let unit = Arc::new(Unit::new(1, 3, "cover").unwrap());

    let round = harness
        .scheduler(&settings)
        .run_round(CONTEXT, &[unit])
        .await;

    let outcome = &round.outcomes[0];
    assert!(!outcome.success());
    assert_eq!(
        outcome.failure(),
        Some(&FailureKind::CardinalityMismatch {
            expected: 3,
            actual: 2
        })
    );
    assert!(outcome.summary.contains("expected 3, got 2"));
    assert_eq!(round.retry_candidates.len(), 1);
    assert_eq!(round.retry_candidates[0].attempt, 2);
    assert_eq!(round.retry_candidates[0].range_start, 1);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_unit_is_dumped_and_retried_after_backoff() {
    let provider = ScriptedProvider::new().script(4, vec![Step::Status(429)]);
    let harness = Harness::new(provider);
    let settings = settings(3, 3);

    let started = tokio::time::Instant::now();
    let report = harness
        .stability_loop(&settings)
        .run_until_stable(CONTEXT, default_plan())
        .await;
    let elapsed = started.elapsed();

    assert!(report.is_complete());
    assert_eq!(report.total_rounds(), 2);
    assert_eq!(harness.provider.calls_for(4), 2);

    let dumps = harness.fallback.entries_with_prefix("batch4-5_call");
    assert_eq!(dumps.len(), 1);
    assert!(dumps[0].1.contains("429"));

    let backoff = report.rounds[0].backoff_ms;
    assert!((2000..=3000).contains(&backoff), "backoff was {}ms", backoff);
    assert!(elapsed >= Duration::from_millis(2000));

    let first_round = harness.reporter.rounds.lock()[0].clone();
    assert!(first_round.contains(&(4, 1, false)));
}

#[tokio::test(start_paused = true)]
async fn test_unit_that_never_succeeds_is_reported_exhausted() {
    let provider = ScriptedProvider::new().script(
        15,
        vec![Step::Status(500), Step::Status(500), Step::Status(500)],
    );
    let harness = Harness::new(provider);
    let settings = settings(3, 3);

    let report = harness
        .stability_loop(&settings)
        .run_until_stable(CONTEXT, default_plan())
        .await;

    assert!(!report.is_complete());
    assert_eq!(report.total_rounds(), 3);
    assert_eq!(report.succeeded.len(), 6);
    assert_eq!(report.exhausted.len(), 1);

    let exhausted = &report.exhausted[0];
    assert_eq!(exhausted.unit.range_start, 15);
    assert_eq!(exhausted.unit.attempt, 3);
    assert!(matches!(
        exhausted.failure(),
        Some(FailureKind::TransportFailure {
            status: Some(500),
            ..
        })
    ));
    assert_eq!(harness.provider.calls_for(15), 3);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_segment_is_kept_and_counts() {
    let content = "{\"a\":1}\n---\nnot-json\n---\n{\"b\":2}".to_string();
    let provider = ScriptedProvider::new().script(1, vec![Step::Reply(content)]);
    let harness = Harness::new(provider);
    let settings = settings(1, 3);
    let unit = Arc::new(Unit::new(1, 3, "cover").unwrap());

    let round = harness
        .scheduler(&settings)
        .run_round(CONTEXT, &[unit])
        .await;

    assert!(round.outcomes[0].success());
    assert_eq!(harness.records.len(), 2);
    let fallback = harness.fallback.entries();
    assert_eq!(fallback, vec![("slide2".to_string(), "not-json".to_string())]);

    let ids: Vec<String> = harness.records.entries().into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec!["slide1", "slide3"]);
}

#[tokio::test(start_paused = true)]
async fn test_second_round_runs_only_failed_units_under_ceiling() {
    let provider = ScriptedProvider::new()
        .script(1, vec![Step::Objects(1)])
        .script(9, vec![Step::Status(503)])
        .latency(1, Duration::from_millis(200))
        .latency(9, Duration::from_millis(200));
    let harness = Harness::new(provider);
    let settings = settings(2, 3);

    let report = harness
        .stability_loop(&settings)
        .run_until_stable(CONTEXT, default_plan())
        .await;

    assert!(report.is_complete());
    assert_eq!(report.total_rounds(), 2);
    assert_eq!(harness.reporter.round_starts(1), vec![1, 9]);
    assert!(harness
        .reporter
        .rounds
        .lock()[1]
        .iter()
        .all(|(_, attempt, success)| *attempt == 2 && *success));
    assert_eq!(harness.provider.calls().len(), 9);
    assert!(harness.provider.peak() <= 2);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_unit_does_not_stop_siblings() {
    let provider = ScriptedProvider::new().script(6, vec![Step::Panic]);
    let harness = Harness::new(provider);
    let settings = settings(7, 1);

    let round = harness
        .scheduler(&settings)
        .run_round(CONTEXT, &default_plan().into_iter().map(Arc::new).collect::<Vec<_>>())
        .await;

    assert_eq!(round.outcomes.len(), 7);
    assert_eq!(round.succeeded_count(), 6);
    assert!(matches!(
        round.outcomes[2].failure(),
        Some(FailureKind::Unhandled(message)) if message.contains("scripted panic")
    ));
    assert!(round.retry_candidates.is_empty());
    assert_eq!(harness.reporter.completed.lock().len(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_extra_segments_fail_the_unit_but_are_persisted() {
    let provider = ScriptedProvider::new().script(17, vec![Step::Reply(objects(3))]);
    let harness = Harness::new(provider);
    let settings = settings(1, 1);
    let unit = Arc::new(Unit::new(17, 18, "team").unwrap());

    let round = harness
        .scheduler(&settings)
        .run_round(CONTEXT, &[unit])
        .await;

    assert_eq!(
        round.outcomes[0].failure(),
        Some(&FailureKind::CardinalityMismatch {
            expected: 2,
            actual: 3
        })
    );
    assert_eq!(harness.records.len(), 3);
    assert_eq!(harness.records.entries()[2].0, "slide19");
}
