//! Settings for the sync engine, loadable from an optional TOML file.
//!
//! A missing file yields defaults; unknown keys are ignored. The engines
//! take a [`SyncSettings`] snapshot by value so no global mutable state is
//! involved.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML in settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("settings file too large: {0} bytes (max {1})")]
    TooLarge(u64, u64),
}

/// Immutable snapshot of the knobs the sync and fetch paths honor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Hard cap on any response body, in bytes.
    pub max_response_bytes: usize,

    /// Maximum number of articles kept per feed per sync (0 = unlimited).
    pub max_articles_per_feed: usize,

    /// User-agent sent with feed fetches.
    pub user_agent: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_response_bytes: 10 * 1024 * 1024,
            max_articles_per_feed: 0,
            user_agent: concat!("feedling/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl SyncSettings {
    /// Maximum settings file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Load settings from a TOML file.
    ///
    /// - Missing or empty file → `Ok(SyncSettings::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line info
    /// - Unknown keys → silently accepted
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(meta.len(), Self::MAX_FILE_SIZE));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let settings: SyncSettings = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            timeout_secs = settings.request_timeout_secs,
            "Loaded sync settings"
        );
        Ok(settings)
    }
}
