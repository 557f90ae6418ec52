//! Runtime configuration.
//!
//! Built-in defaults are overlaid by an optional TOML file (path taken from
//! `RUSTY_EDIT_CONFIG`) and then by individual environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `RUSTY_EDIT_OLLAMA_URL` | `base_url` |
//! | `RUSTY_EDIT_MODEL` | `model` |
//! | `RUSTY_EDIT_STREAM` | `stream` (`1`/`true`/`yes`/`on`) |

use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;
use tracing::{info, warn};

pub const CONFIG_PATH_VAR: &str = "RUSTY_EDIT_CONFIG";
pub const URL_VAR: &str = "RUSTY_EDIT_OLLAMA_URL";
pub const MODEL_VAR: &str = "RUSTY_EDIT_MODEL";
pub const STREAM_VAR: &str = "RUSTY_EDIT_STREAM";

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama2";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the text-generation backend.
    pub base_url: String,
    pub model: String,
    /// Use streaming generation instead of a single batch response.
    pub stream: bool,
    /// Soft deadline the controller races against each request.
    pub assist_timeout_secs: u64,
    /// Hard limit on a single HTTP generate call.
    pub request_timeout_secs: u64,
    /// Availability probe timeout.
    pub probe_timeout_secs: u64,
    pub model_check_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            stream: false,
            assist_timeout_secs: 90,
            request_timeout_secs: 300,
            probe_timeout_secs: 2,
            model_check_timeout_secs: 5,
        }
    }
}

impl Config {
    /// Defaults, then the file named by `RUSTY_EDIT_CONFIG`, then env overrides.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Same as [`load`](Self::load) with an injectable environment lookup.
    pub fn load_with<F>(env: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match env(CONFIG_PATH_VAR) {
            Some(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        config.apply_env(env);
        config.normalize();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = env(URL_VAR).filter(|v| !v.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(model) = env(MODEL_VAR).filter(|v| !v.trim().is_empty()) {
            self.model = model.trim().to_string();
        }
        if let Some(raw) = env(STREAM_VAR) {
            match parse_flag(&raw) {
                Some(flag) => self.stream = flag,
                None => warn!("Ignoring {}={:?}: expected a boolean", STREAM_VAR, raw),
            }
        }
    }

    fn normalize(&mut self) {
        while self.base_url.ends_with('/') {
            self.base_url.pop();
        }
        if self.base_url.is_empty() {
            self.base_url = DEFAULT_BASE_URL.to_string();
        }
        if self.model.is_empty() {
            self.model = DEFAULT_MODEL.to_string();
        }
    }

    pub fn assist_timeout(&self) -> Duration {
        Duration::from_secs(self.assist_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn model_check_timeout(&self) -> Duration {
        Duration::from_secs(self.model_check_timeout_secs)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
