//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/parley/config.toml`, then
//! environment variables override individual values:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `OPENAI_API_KEY` | `llm.api_key` |
//! | `OPENAI_MODEL` | `llm.model` |
//! | `REDIS_URL` | `history.redis_url` |
//! | `APP_ENV` | `env` |
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/parley/` (~/.config/parley/)
//! - State/Logs: `$XDG_STATE_HOME/parley/` (~/.local/state/parley/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Deployment environment (dev, staging, prod); namespaces storage keys
    #[serde(default = "default_env")]
    pub env: String,

    /// Completion API settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Transcript storage settings
    #[serde(default)]
    pub history: HistoryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env: default_env(),
            llm: LlmConfig::default(),
            history: HistoryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_env() -> String {
    "dev".to_string()
}

/// Completion API configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// API key (usually supplied through `OPENAI_API_KEY`)
    pub api_key: Option<String>,
    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,
    /// API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Sampling temperature passed with every request
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            endpoint: default_endpoint(),
            temperature: default_temperature(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

/// Transcript storage configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    /// Turn pairs to keep; the transcript holds at most twice this many messages
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Seconds of inactivity after which a durable transcript expires
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Key namespace; defaults to `"{env}:"`
    pub key_prefix: Option<String>,

    /// Redis URL; when absent transcripts are kept in memory only
    pub redis_url: Option<String>,

    /// Connect/read/write timeout for the durable backend, in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            ttl_seconds: default_ttl_seconds(),
            key_prefix: None,
            redis_url: None,
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl HistoryConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

fn default_max_turns() -> usize {
    20
}

fn default_ttl_seconds() -> u64 {
    30 * 24 * 3600
}

fn default_connect_timeout_ms() -> u64 {
    250
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path and apply environment overrides
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Config::default()
        };

        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// Empty values are ignored so an exported-but-blank variable does not
    /// wipe out a value from the file.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = get("REDIS_URL") {
            self.history.redis_url = Some(url);
        }
        if let Some(env) = get("APP_ENV") {
            self.env = env;
        }
    }

    /// Validate configuration, returning an error describing the first problem
    pub fn validate(&self) -> Result<()> {
        if self.env.trim().is_empty() {
            return Err(Error::Config("env must not be empty".to_string()));
        }
        if self.history.max_turns == 0 {
            return Err(Error::Config(
                "history.max_turns must be at least 1".to_string(),
            ));
        }
        if self.history.ttl_seconds == 0 {
            return Err(Error::Config(
                "history.ttl_seconds must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::Config(
                "llm.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        Ok(())
    }

    /// Storage key namespace: `history.key_prefix`, or `"{env}:"`
    pub fn key_prefix(&self) -> String {
        self.history
            .key_prefix
            .clone()
            .unwrap_or_else(|| format!("{}:", self.env))
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/parley/config.toml` (~/.config/parley/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("parley").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/parley/` (~/.local/state/parley/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("parley")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/parley/parley.log` (~/.local/state/parley/parley.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("parley.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.env, "dev");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.history.max_turns, 20);
        assert_eq!(config.history.ttl_seconds, 2_592_000);
        assert!(config.history.redis_url.is_none());
        assert_eq!(config.history.connect_timeout(), Duration::from_millis(250));
        assert_eq!(config.key_prefix(), "dev:");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
env = "prod"

[llm]
model = "gpt-4o"
temperature = 0.2

[history]
max_turns = 5
ttl_seconds = 600
redis_url = "redis://localhost:6379/0"

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.env, "prod");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.endpoint, "https://api.openai.com/v1");
        assert_eq!(config.history.max_turns, 5);
        assert_eq!(config.history.ttl(), Duration::from_secs(600));
        assert_eq!(
            config.history.redis_url.as_deref(),
            Some("redis://localhost:6379/0")
        );
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.key_prefix(), "prod:");
    }

    #[test]
    fn test_explicit_key_prefix_wins() {
        let config: Config = toml::from_str(
            r#"
env = "prod"
[history]
key_prefix = "chat:prod:"
"#,
        )
        .unwrap();
        assert_eq!(config.key_prefix(), "chat:prod:");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(env_of(&[
            ("OPENAI_API_KEY", "sk-env"),
            ("OPENAI_MODEL", "gpt-4.1-mini"),
            ("REDIS_URL", "redis://cache:6379"),
            ("APP_ENV", "staging"),
        ]));
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.llm.model, "gpt-4.1-mini");
        assert_eq!(
            config.history.redis_url.as_deref(),
            Some("redis://cache:6379")
        );
        assert_eq!(config.key_prefix(), "staging:");
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-file".to_string());
        config.apply_env(env_of(&[("OPENAI_API_KEY", ""), ("REDIS_URL", "  ")]));
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-file"));
        assert!(config.history.redis_url.is_none());
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.history.max_turns = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.history.ttl_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.llm.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "env = \"test\"\n[history]\nmax_turns = 3\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.env, "test");
        assert_eq!(config.history.max_turns, 3);

        std::fs::write(&path, "env = [not valid").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_log_path() {
        assert!(Config::log_path().ends_with("parley/parley.log"));
    }
}
