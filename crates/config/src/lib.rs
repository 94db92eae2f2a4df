//! Configuration loading and validation for loopwright.
//!
//! Settings come from `~/.loopwright/config.toml`, with a couple of
//! environment-variable overrides for the values people change most
//! often. A missing file means defaults; a malformed file is an error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model to address (e.g. "qwen3:8b")
    #[serde(default = "default_model")]
    pub model_id: String,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token, if the endpoint requires one
    #[serde(default)]
    pub api_key: Option<String>,

    /// Generation randomness
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling cutoff
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Per-turn wall clock bound on the chat client, in seconds
    #[serde(default = "default_request_timeout_s")]
    pub request_timeout_s: u64,

    /// Transport-level retries with exponential backoff at the client
    #[serde(default)]
    pub transport_retries: u32,

    /// Upper bound on tool-invoking turns per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Cap on serialized tool result size
    #[serde(default = "default_result_max_bytes")]
    pub result_max_bytes: usize,

    /// Default per-handler timeout, in seconds
    #[serde(default = "default_handler_timeout_s")]
    pub handler_timeout_s: u64,

    /// Replay repeated identical idempotent tool calls
    #[serde(default)]
    pub allow_idempotent_short_circuit: bool,

    /// Advertise the reserved `final_answer` tool
    #[serde(default)]
    pub offer_final_answer_tool: bool,

    /// Overrides the built-in system prompt when set
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_model() -> String {
    "qwen3:8b".into()
}

fn default_base_url() -> String {
    "http://localhost:11434/v1".into()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_top_p() -> f32 {
    0.9
}

fn default_request_timeout_s() -> u64 {
    60
}

fn default_max_iterations() -> u32 {
    10
}

fn default_result_max_bytes() -> usize {
    8192
}

fn default_handler_timeout_s() -> u64 {
    30
}

impl AppConfig {
    /// Load configuration from the default path (~/.loopwright/config.toml).
    ///
    /// Environment variables take priority over the file:
    /// - `LOOPWRIGHT_MODEL` overrides `model_id`
    /// - `LOOPWRIGHT_BASE_URL` overrides `base_url`
    /// - `LOOPWRIGHT_API_KEY` overrides `api_key`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(model) = std::env::var("LOOPWRIGHT_MODEL") {
            config.model_id = model;
        }
        if let Ok(base_url) = std::env::var("LOOPWRIGHT_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(api_key) = std::env::var("LOOPWRIGHT_API_KEY") {
            config.api_key = Some(api_key);
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".loopwright")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ConfigError::ValidationError(
                "top_p must be between 0.0 and 1.0".into(),
            ));
        }
        if self.result_max_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "result_max_bytes must be greater than zero".into(),
            ));
        }
        if self.request_timeout_s == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_s must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Generate a default config TOML string (for first-run setup).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_id: default_model(),
            base_url: default_base_url(),
            api_key: None,
            temperature: default_temperature(),
            top_p: default_top_p(),
            request_timeout_s: default_request_timeout_s(),
            transport_retries: 0,
            max_iterations: default_max_iterations(),
            result_max_bytes: default_result_max_bytes(),
            handler_timeout_s: default_handler_timeout_s(),
            allow_idempotent_short_circuit: false,
            offer_final_answer_tool: false,
            system_prompt: None,
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.model_id, "qwen3:8b");
        assert_eq!(config.base_url, "http://localhost:11434/v1");
        assert!((config.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.result_max_bytes, 8192);
        assert!(!config.allow_idempotent_short_circuit);
        assert!(!config.offer_final_answer_tool);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.model_id, "qwen3:8b");
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model_id = \"llama3:70b\"\nmax_iterations = 4\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model_id, "llama3:70b");
        assert_eq!(config.max_iterations, 4);
        assert_eq!(config.result_max_bytes, 8192);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model_id = [not toml").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn out_of_range_temperature_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "temperature = 3.5\n").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn default_toml_round_trips() {
        let rendered = AppConfig::default_toml();
        let parsed: AppConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.model_id, AppConfig::default().model_id);
        assert_eq!(parsed.max_iterations, AppConfig::default().max_iterations);
    }
}
