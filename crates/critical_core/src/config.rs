use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_RENDERER: &str = "phantomjs";
pub const DEFAULT_HELPER_SCRIPT: &str = "penthouse.js";
pub const DEFAULT_ENCODING: &str = "utf-8";

pub const ENV_RENDERER_PATH: &str = "CRITICAL_RENDERER_PATH";
pub const ENV_HELPER_PATH: &str = "CRITICAL_HELPER_PATH";
pub const ENV_ENCODING: &str = "CRITICAL_ENCODING";
pub const ENV_TIMEOUT_MS: &str = "CRITICAL_TIMEOUT_MS";
pub const ENV_ARTIFACT_DIR: &str = "CRITICAL_ARTIFACT_DIR";

/// How the external renderer is located and fed.
///
/// Built once by the caller and passed by reference into every extraction;
/// nothing in the engine mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Renderer executable, resolved through `PATH` when bare.
    pub renderer: PathBuf,
    /// Script handed to the renderer as its first argument.
    pub helper_script: PathBuf,
    /// WHATWG label used to encode artifacts and decode fetched stylesheets.
    pub encoding: String,
    /// Upper bound on the renderer's run time; `None` waits indefinitely.
    pub timeout_ms: Option<u64>,
    /// Where artifacts are created; `None` uses the system temp dir.
    pub artifact_dir: Option<PathBuf>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            renderer: PathBuf::from(DEFAULT_RENDERER),
            helper_script: PathBuf::from(DEFAULT_HELPER_SCRIPT),
            encoding: DEFAULT_ENCODING.to_string(),
            timeout_ms: None,
            artifact_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: expected {expected}")]
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl ExtractionConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Applies `CRITICAL_*` overrides read through `lookup`.
    ///
    /// Empty values are ignored so an exported-but-blank variable does not
    /// clobber a file setting.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        if let Some(value) = get(ENV_RENDERER_PATH) {
            self.renderer = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_HELPER_PATH) {
            self.helper_script = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_ENCODING) {
            self.encoding = value.trim().to_string();
        }
        if let Some(value) = get(ENV_TIMEOUT_MS) {
            let parsed = value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    var: ENV_TIMEOUT_MS,
                    value: value.clone(),
                    expected: "milliseconds as an unsigned integer",
                })?;
            self.timeout_ms = Some(parsed);
        }
        if let Some(value) = get(ENV_ARTIFACT_DIR) {
            self.artifact_dir = Some(PathBuf::from(value));
        }
        Ok(self)
    }
}
