//! Integration tests for the deckwright generation and narration pipelines

mod filesystem_pipeline;
mod generation_scenarios;
mod narration;
mod provider_http;
