//! deckwright: IR deck slide generation
//!
//! Turns a source HTML document into per-slide JSON records through a
//! chat-completion API. Slides are generated in batches; batches run
//! concurrently under a ceiling, and failed batches are retried with
//! exponential backoff until every batch succeeds or runs out of attempts.
//! Narration scripts are then written from the newest record of each slide.

pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod logging;
pub mod narration;
pub mod prompt;
pub mod provider;
pub mod store;
