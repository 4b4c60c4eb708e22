use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RuntimeError, RuntimeResult};

pub const DEFAULT_DRAFT_DIR: &str = ".talentflow/drafts";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings shared by the sessions and the HTTP collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Base URL of the storage collaborator; sessions run offline when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_draft_dir")]
    pub draft_dir: PathBuf,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_draft_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DRAFT_DIR)
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            draft_dir: default_draft_dir(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_file(path: &Path) -> RuntimeResult<Self> {
        let config_error = |reason: String| RuntimeError::Config {
            path: path.display().to_string(),
            reason,
        };
        let contents = std::fs::read_to_string(path).map_err(|err| config_error(err.to_string()))?;
        serde_json::from_str(&contents).map_err(|err| config_error(err.to_string()))
    }

    /// Loads `path` when given, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> RuntimeResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{ "api_base_url": "http://localhost:4000" }"#)
                .expect("deserialize");
        assert_eq!(config.api_base_url.as_deref(), Some("http://localhost:4000"));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.draft_dir, PathBuf::from(DEFAULT_DRAFT_DIR));
    }

    #[test]
    fn unreadable_file_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing.json");
        let err = RuntimeConfig::from_file(&path).expect_err("missing");
        assert!(err.to_string().contains("missing.json"));
    }
}
