//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::DeckError;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &DeckError) -> String {
    match e {
        DeckError::GenerationIncomplete { tally, .. }
        | DeckError::NarrationIncomplete { tally, .. } => tally.clone(),
        _ => format!("Error: {}", e),
    }
}

/// Process exit code for a failed command.
pub fn exit_code(e: &DeckError) -> i32 {
    match e {
        DeckError::GenerationIncomplete { .. } | DeckError::NarrationIncomplete { .. } => 1,
        DeckError::ConfigError(_) | DeckError::InvalidUnit(_) | DeckError::UnsupportedIndex(_) => 2,
        DeckError::MissingCredential(_)
        | DeckError::SourceNotFound(_)
        | DeckError::SourceInvalid(_)
        | DeckError::NoSlideRecords(_) => 3,
        DeckError::Provider(_) | DeckError::Storage(_) => 1,
    }
}
