//! Configuration management for the Gomoku workspace.
//!
//! Configuration lives in a single file at `~/.gomoku/config.json` and is
//! loaded exactly once at startup. The loaded struct is passed explicitly to
//! every component; nothing reads ambient state after `Config::load` returns.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (`QWEN_API_KEY`, `QWEN_API_BASE`, `GOMOKU_MODEL`)
//! 2. Explicit config file values
//! 3. Default values

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".gomoku"),
        |dirs| dirs.home_dir().join(".gomoku"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Move advisor (LLM) settings
    #[serde(default)]
    pub advisor: AdvisorConfig,

    /// Sandbox resource-limit settings, deserialized by the sandbox crate
    /// into its `ResourceLimitPolicy`. Kept as raw JSON here so the policy
    /// type stays owned by the sandbox component.
    #[serde(default)]
    pub sandbox: serde_json::Value,

    /// Logging settings
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Settings for the OpenAI-compatible move suggestion API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// API key; empty disables the advisor
    #[serde(default)]
    pub api_key: String,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            model: default_model(),
        }
    }
}

fn default_api_base() -> String {
    "https://dashscope.aliyuncs.com/compatible-mode/v1".into()
}

fn default_model() -> String {
    "qwen-turbo".into()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output format: "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

impl Config {
    /// Load configuration from the default location, falling back to
    /// defaults when no file exists, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&config_path())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from an explicit path. A missing file yields the
    /// default configuration; a malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(config)
    }

    /// Apply environment variable overrides on top of file values.
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("QWEN_API_KEY") {
            if !key.is_empty() {
                self.advisor.api_key = key;
            }
        }
        if let Ok(base) = std::env::var("QWEN_API_BASE") {
            if !base.is_empty() {
                self.advisor.api_base = base;
            }
        }
        if let Ok(model) = std::env::var("GOMOKU_MODEL") {
            if !model.is_empty() {
                self.advisor.model = model;
            }
        }
    }
}
