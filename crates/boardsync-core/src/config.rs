//! Board configuration.

use crate::history::DEFAULT_HISTORY_LIMIT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Default coalescing window for outbound updates, in milliseconds.
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 16;

/// Default idle time after which a dangling lasso is cancelled, in seconds.
pub const DEFAULT_LASSO_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Per-replica settings. Every field is optional in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoardConfig {
    /// Origin stamped on outgoing envelopes. A random uuid when absent.
    pub origin: Option<String>,
    pub update_interval_ms: u64,
    pub history_limit: usize,
    pub lasso_timeout_secs: u64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            origin: None,
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            lasso_timeout_secs: DEFAULT_LASSO_TIMEOUT_SECS,
        }
    }
}

impl BoardConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "historyLimit",
                message: "must keep at least one snapshot".to_string(),
            });
        }
        if matches!(&self.origin, Some(origin) if origin.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "origin",
                message: "must not be blank".to_string(),
            });
        }
        Ok(())
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// The configured origin, or a fresh random one.
    pub fn resolve_origin(&self) -> String {
        self.origin
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn lasso_timeout(&self) -> Duration {
        Duration::from_secs(self.lasso_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BoardConfig::default();
        assert_eq!(config.update_interval(), Duration::from_millis(16));
        assert_eq!(config.history_limit, 100);
        assert_eq!(config.lasso_timeout(), Duration::from_secs(30));
        assert_ne!(config.resolve_origin(), config.resolve_origin());
    }

    #[test]
    fn test_partial_json() {
        let config = BoardConfig::from_json(r#"{"origin":"tablet","historyLimit":5}"#).unwrap();
        assert_eq!(config.resolve_origin(), "tablet");
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.update_interval_ms, DEFAULT_UPDATE_INTERVAL_MS);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            BoardConfig::from_json(r#"{"historyLimit":0}"#),
            Err(ConfigError::Invalid { field: "historyLimit", .. })
        ));
        assert!(matches!(
            BoardConfig::from_json(r#"{"origin":"  "}"#),
            Err(ConfigError::Invalid { field: "origin", .. })
        ));
        assert!(matches!(BoardConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"lassoTimeoutSecs": 5}}"#).unwrap();
        let config = BoardConfig::from_file(file.path()).unwrap();
        assert_eq!(config.lasso_timeout(), Duration::from_secs(5));

        assert!(matches!(
            BoardConfig::from_file("/nonexistent/boardsync.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
