//! Configuration loading and management.
//!
//! Loads studio configuration from `./sflcast.toml` (or
//! `$SFLCAST_CONFIG_PATH`). Environment variables override file values; file
//! values override defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::providers::gemini::{DEFAULT_MODEL, GEMINI_API_BASE};

// ── Top-level config ────────────────────────────────────────────

/// Top-level studio configuration loaded from TOML.
///
/// Path: `./sflcast.toml` or `$SFLCAST_CONFIG_PATH`.
/// Env vars override file values; file values override defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Generative-model client settings (`[llm]`).
    pub llm: LlmConfig,
    /// Filesystem paths (`[paths]`).
    pub paths: PathsConfig,
}

/// Generative-model client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key. Usually injected via `SFLCAST_API_KEY` or `GEMINI_API_KEY`
    /// rather than written to the file.
    pub api_key: Option<String>,
    /// Model identifier used for every generation call.
    pub model: String,
    /// API base URL, overridable for proxies and tests.
    pub base_url: String,
    /// Optional thinking-token budget passed through to the model.
    pub thinking_budget: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_owned(),
            base_url: GEMINI_API_BASE.to_owned(),
            thinking_budget: None,
        }
    }
}

/// Filesystem paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory for rotated JSON log files.
    pub logs_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            logs_dir: default_logs_dir(),
        }
    }
}

fn default_logs_dir() -> String {
    directories::ProjectDirs::from("", "", "sflcast")
        .map(|dirs| dirs.data_dir().join("logs").display().to_string())
        .unwrap_or_else(|| "logs".to_owned())
}

impl StudioConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// Config file path: `$SFLCAST_CONFIG_PATH` or `./sflcast.toml`.
    /// If the file does not exist, returns defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse configuration from a TOML string, no env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error when the TOML does not parse.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse config TOML")
    }

    fn load_from_file() -> Result<Self> {
        let path = Self::config_path_with(|key| std::env::var(key).ok());
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                Ok(StudioConfig::default())
            }
            Err(e) => Err(anyhow::anyhow!("failed to read config file: {e}")),
        }
    }

    /// Resolve config path using a custom env resolver (for testing).
    fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        match env("SFLCAST_CONFIG_PATH") {
            Some(p) => PathBuf::from(p),
            None => PathBuf::from("sflcast.toml"),
        }
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability (avoids unsafe `set_var` in
    /// tests).
    fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        // LLM. The generic GEMINI_API_KEY is honored so a shared shell
        // environment works, but the SFLCAST_ variant wins.
        if let Some(key) = env("SFLCAST_API_KEY").or_else(|| env("GEMINI_API_KEY")) {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = env("SFLCAST_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = env("SFLCAST_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(v) = env("SFLCAST_THINKING_BUDGET") {
            match v.parse() {
                Ok(n) => self.llm.thinking_budget = Some(n),
                Err(_) => tracing::warn!(
                    var = "SFLCAST_THINKING_BUDGET",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }

        // Paths.
        if let Some(dir) = env("SFLCAST_LOGS_DIR") {
            self.paths.logs_dir = dir;
        }
    }

    /// The configured API key.
    ///
    /// # Errors
    ///
    /// Returns an error naming the expected environment variable when no key
    /// is configured.
    pub fn require_api_key(&self) -> Result<&str> {
        self.llm
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .context("no API key configured; set SFLCAST_API_KEY or GEMINI_API_KEY")
    }
}
