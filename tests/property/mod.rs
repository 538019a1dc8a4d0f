//! Property-based tests for splitting and scheduling guarantees

mod scheduling;
mod splitting;
