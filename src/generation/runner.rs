//! Unit runner: one unit end to end, from rendered instruction to persisted records.
//!
//! A run never returns an error. Every fault, panics included, is folded into
//! the [`Outcome`] so that one unit cannot take down its round.

use crate::error::DeckError;
use crate::generation::outcome::{FailureKind, Outcome, OutcomeStatus};
use crate::generation::plan::Unit;
use crate::generation::split::split_and_persist;
use crate::generation::GenerationSettings;
use crate::prompt::{render_instruction, PromptRenderer};
use crate::provider::{CallFailureKind, RawResult, RemoteCallAdapter};
use crate::store::{FallbackSink, RecordStore};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub struct UnitRunner {
    adapter: RemoteCallAdapter,
    renderer: Arc<dyn PromptRenderer>,
    records: Arc<dyn RecordStore>,
    fallback: Arc<dyn FallbackSink>,
    max_attempts: u32,
    pre_call_delay: Duration,
    debug_dump: bool,
}

impl UnitRunner {
    pub fn new(
        adapter: RemoteCallAdapter,
        renderer: Arc<dyn PromptRenderer>,
        records: Arc<dyn RecordStore>,
        fallback: Arc<dyn FallbackSink>,
        settings: &GenerationSettings,
    ) -> Self {
        Self {
            adapter,
            renderer,
            records,
            fallback,
            max_attempts: settings.max_attempts,
            pre_call_delay: settings.pre_call_delay(),
            debug_dump: settings.debug_dump,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run one unit against the shared source document.
    pub async fn run(&self, context: &str, unit: Arc<Unit>) -> Outcome {
        if !self.pre_call_delay.is_zero() {
            tokio::time::sleep(self.pre_call_delay).await;
        }

        debug!(unit = %unit, attempt = unit.attempt, "Unit started");
        let started = Instant::now();
        let result = AssertUnwindSafe(self.attempt(context, &unit))
            .catch_unwind()
            .await;
        let elapsed = started.elapsed();

        let (status, messages) = match result {
            Ok(Ok(attempt)) => attempt,
            Ok(Err(err)) => (
                OutcomeStatus::Failed(FailureKind::Unhandled(err.to_string())),
                Vec::new(),
            ),
            Err(payload) => (
                OutcomeStatus::Failed(FailureKind::Unhandled(format!(
                    "panic: {}",
                    panic_message(payload.as_ref())
                ))),
                Vec::new(),
            ),
        };

        let summary = self.summarize(&unit, &status, elapsed);
        match &status {
            OutcomeStatus::Succeeded => info!(
                range = %unit.range_label(),
                attempt = unit.attempt,
                duration_ms = elapsed.as_millis(),
                "Unit succeeded"
            ),
            OutcomeStatus::Failed(kind) => warn!(
                range = %unit.range_label(),
                attempt = unit.attempt,
                max_attempts = self.max_attempts,
                duration_ms = elapsed.as_millis(),
                failure = %kind,
                "Unit failed"
            ),
        }

        Outcome {
            unit,
            status,
            summary,
            messages,
            elapsed,
        }
    }

    async fn attempt(
        &self,
        context: &str,
        unit: &Unit,
    ) -> Result<(OutcomeStatus, Vec<String>), DeckError> {
        let instruction = render_instruction(self.renderer.as_ref(), unit)?;

        let content = match self
            .adapter
            .call(context, &instruction, &unit.dump_identifier("call"))
            .await
        {
            RawResult::Text(text) if !text.trim().is_empty() => text,
            RawResult::Text(_) => {
                return Ok((OutcomeStatus::Failed(FailureKind::EmptyResponse), Vec::new()))
            }
            RawResult::Failed(failure) => {
                let kind = match failure.kind {
                    CallFailureKind::EmptyContent => FailureKind::EmptyResponse,
                    CallFailureKind::Status(status) => FailureKind::TransportFailure {
                        status: Some(status),
                        detail: failure.diagnostic.clone(),
                    },
                    _ => FailureKind::TransportFailure {
                        status: None,
                        detail: failure.diagnostic.clone(),
                    },
                };
                return Ok((OutcomeStatus::Failed(kind), vec![failure.diagnostic]));
            }
        };

        let report = match split_and_persist(
            &content,
            unit.range_start,
            unit.range_end,
            self.records.as_ref(),
            self.fallback.as_ref(),
        ) {
            Ok(report) => report,
            Err(partial) => {
                warn!(
                    range = %unit.range_label(),
                    saved = partial.report.saved_count,
                    error = %partial.source,
                    "Storage failed partway through a response"
                );
                let failure = FailureKind::Unhandled(partial.to_string());
                let mut messages = partial.report.messages;
                messages.extend(
                    partial
                        .report
                        .locations
                        .iter()
                        .map(|path| format!("saved before the failure: {}", path.display())),
                );
                return Ok((OutcomeStatus::Failed(failure), messages));
            }
        };
        let mut messages = report.messages;

        let expected = unit.expected_count();
        if report.saved_count != expected {
            if self.debug_dump {
                match self.fallback.save(&unit.dump_identifier("mismatch"), &content) {
                    Ok(path) => messages.push(format!("raw content dumped to {}", path.display())),
                    Err(e) => messages.push(format!("could not dump raw content: {}", e)),
                }
            }
            return Ok((
                OutcomeStatus::Failed(FailureKind::CardinalityMismatch {
                    expected,
                    actual: report.saved_count,
                }),
                messages,
            ));
        }

        Ok((OutcomeStatus::Succeeded, messages))
    }

    fn summarize(&self, unit: &Unit, status: &OutcomeStatus, elapsed: Duration) -> String {
        let secs = elapsed.as_secs_f64();
        match status {
            OutcomeStatus::Succeeded => format!(
                "[ok] {} attempt {}/{}: {} slides saved in {:.1}s",
                unit,
                unit.attempt,
                self.max_attempts,
                unit.expected_count(),
                secs
            ),
            OutcomeStatus::Failed(kind) => format!(
                "[failed] {} attempt {}/{}: {} after {:.1}s",
                unit, unit.attempt, self.max_attempts, kind, secs
            ),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
