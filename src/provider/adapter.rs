//! Remote call adapter: one chat-completion request per call, no retries.
//!
//! Every failure is folded into [`RawResult::Failed`] and the raw response (or
//! the diagnostic, when nothing was received) is dumped to the fallback sink.

use crate::error::ProviderError;
use crate::provider::{ChatMessage, CompletionOptions, ModelProviderClient};
use crate::store::FallbackSink;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Why a call produced no usable text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallFailureKind {
    /// Non-success HTTP status
    Status(u16),
    Timeout,
    Connection,
    MalformedEnvelope,
    /// Success status but blank completion content
    EmptyContent,
    /// Blank context or instruction; nothing was sent
    InvalidRequest,
    Other,
}

impl fmt::Display for CallFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallFailureKind::Status(status) => write!(f, "HTTP {}", status),
            CallFailureKind::Timeout => write!(f, "timeout"),
            CallFailureKind::Connection => write!(f, "connection error"),
            CallFailureKind::MalformedEnvelope => write!(f, "malformed envelope"),
            CallFailureKind::EmptyContent => write!(f, "empty content"),
            CallFailureKind::InvalidRequest => write!(f, "invalid request"),
            CallFailureKind::Other => write!(f, "transport error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFailure {
    pub kind: CallFailureKind,
    pub diagnostic: String,
}

/// Result of one remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawResult {
    /// Trimmed completion text
    Text(String),
    Failed(CallFailure),
}

impl From<&ProviderError> for CallFailureKind {
    fn from(err: &ProviderError) -> Self {
        match (err.status(), err) {
            (Some(status), _) => CallFailureKind::Status(status),
            (None, ProviderError::Timeout(_)) => CallFailureKind::Timeout,
            (None, ProviderError::Connection(_)) => CallFailureKind::Connection,
            (None, ProviderError::MalformedEnvelope { .. }) => CallFailureKind::MalformedEnvelope,
            (None, _) => CallFailureKind::Other,
        }
    }
}

pub struct RemoteCallAdapter {
    client: Arc<dyn ModelProviderClient>,
    fallback: Arc<dyn FallbackSink>,
    system_prompt: String,
    options: CompletionOptions,
    timeout: Duration,
}

impl RemoteCallAdapter {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(
        client: Arc<dyn ModelProviderClient>,
        fallback: Arc<dyn FallbackSink>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            client,
            fallback,
            system_prompt: system_prompt.into(),
            options: CompletionOptions::default(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Issue one request. `dump_id` names the fallback entry written on failure.
    pub async fn call(&self, context: &str, instruction: &str, dump_id: &str) -> RawResult {
        if context.trim().is_empty() || instruction.trim().is_empty() {
            return RawResult::Failed(CallFailure {
                kind: CallFailureKind::InvalidRequest,
                diagnostic: "Context and instruction must both be non-empty".to_string(),
            });
        }

        let messages = vec![
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(format!("Here is the full HTML document:\n{}", context)),
            ChatMessage::user(instruction.to_string()),
        ];
        self.send(messages, instruction, dump_id).await
    }

    /// Issue one request carrying a self-contained prompt and no shared document.
    pub async fn call_prompt(&self, prompt: &str, dump_id: &str) -> RawResult {
        if prompt.trim().is_empty() {
            return RawResult::Failed(CallFailure {
                kind: CallFailureKind::InvalidRequest,
                diagnostic: "Prompt must be non-empty".to_string(),
            });
        }

        let messages = vec![
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(prompt.to_string()),
        ];
        self.send(messages, prompt, dump_id).await
    }

    async fn send(&self, messages: Vec<ChatMessage>, instruction: &str, dump_id: &str) -> RawResult {
        let start = Instant::now();
        info!(
            provider = self.client.provider_name(),
            model = self.client.model_name(),
            dump_id,
            instruction_chars = instruction.chars().count(),
            "Provider request sent"
        );

        let outcome =
            tokio::time::timeout(self.timeout, self.client.complete(messages, self.options.clone()))
                .await;
        let duration_ms = start.elapsed().as_millis();

        let (failure, raw) = match outcome {
            Ok(Ok(response)) => {
                let text = response.content.trim();
                if !text.is_empty() {
                    info!(
                        dump_id,
                        duration_ms,
                        response_chars = text.chars().count(),
                        finish_reason = ?response.finish_reason,
                        "Provider response received"
                    );
                    return RawResult::Text(text.to_string());
                }
                (
                    CallFailure {
                        kind: CallFailureKind::EmptyContent,
                        diagnostic: format!(
                            "Provider returned empty content (finish_reason: {:?})",
                            response.finish_reason
                        ),
                    },
                    response.content,
                )
            }
            Ok(Err(err)) => {
                let raw = err.raw_body().unwrap_or_default().to_string();
                (
                    CallFailure {
                        kind: CallFailureKind::from(&err),
                        diagnostic: err.to_string(),
                    },
                    raw,
                )
            }
            Err(_) => (
                CallFailure {
                    kind: CallFailureKind::Timeout,
                    diagnostic: format!("No response within {}s", self.timeout.as_secs()),
                },
                String::new(),
            ),
        };

        warn!(
            dump_id,
            duration_ms,
            kind = %failure.kind,
            diagnostic = %failure.diagnostic,
            "Provider call failed"
        );
        self.dump_failure(dump_id, &failure, &raw);
        RawResult::Failed(failure)
    }

    fn dump_failure(&self, dump_id: &str, failure: &CallFailure, raw: &str) {
        let body = format!(
            "kind: {}\ndiagnostic: {}\n\n{}",
            failure.kind, failure.diagnostic, raw
        );
        match self.fallback.save(dump_id, &body) {
            Ok(path) => debug!(dump_id, path = %path.display(), "Failed call dumped"),
            // The call already failed; a dump error must not mask it.
            Err(e) => warn!(dump_id, error = %e, "Could not dump failed call"),
        }
    }
}
