//! API credential loading. A missing key is a startup error, never a per-call failure.

use crate::error::DeckError;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Environment variable carrying the chat-completion API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Credentials for the completion endpoint.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Result<Self, DeckError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DeckError::MissingCredential(API_KEY_ENV.to_string()));
        }
        Ok(Self { api_key })
    }

    /// Load `.env` from the workspace (or the current directory) if present,
    /// then read [`API_KEY_ENV`] from the process environment.
    pub fn from_env(workspace_root: &Path) -> Result<Self, DeckError> {
        let env_file = workspace_root.join(".env");
        let loaded = if env_file.exists() {
            dotenvy::from_path(&env_file).map(|_| env_file)
        } else {
            dotenvy::dotenv()
        };
        match loaded {
            Ok(path) => debug!(env_file = %path.display(), "Loaded environment file"),
            Err(e) => debug!(error = %e, "No environment file loaded"),
        }

        let key = std::env::var(API_KEY_ENV)
            .map_err(|_| DeckError::MissingCredential(API_KEY_ENV.to_string()))?;
        Self::new(key)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}
