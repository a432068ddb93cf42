//! Configuration loading and validation for nearbot.
//!
//! Loads configuration from `nearbot.toml` (path overridable via the
//! `NEARBOT_CONFIG` env var) with environment variable overrides for
//! secrets and deployment-specific settings. Components receive these
//! structs through their constructors — business logic never reads the
//! process environment directly, so tests can substitute any value.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// The root configuration structure.
///
/// Maps directly to `nearbot.toml`. Every field has a serde default, so an
/// empty file (or no file at all) yields a fully working local setup.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Model backend configuration
    #[serde(default)]
    pub model: ModelConfig,

    /// Web search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// IP geolocation configuration
    #[serde(default)]
    pub location: LocationConfig,

    /// On-disk storage paths and retention
    #[serde(default)]
    pub storage: StorageConfig,

    /// Prompt assembly limits
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Gateway (HTTP server) configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("model", &self.model)
            .field("search", &self.search)
            .field("location", &self.location)
            .field("storage", &self.storage)
            .field("prompt", &self.prompt)
            .field("gateway", &self.gateway)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration: `NEARBOT_CONFIG` path if set, else
    /// `./nearbot.toml` if present, else all defaults. Environment
    /// overrides are applied last.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("NEARBOT_CONFIG").unwrap_or_else(|_| "nearbot.toml".into());
        let mut config = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            tracing::debug!(path = %path, "No config file found, using defaults");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific TOML file, without env overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply environment variable overrides on top of the file values.
    ///
    /// - `OLLAMA_BASE_URL` — model backend URL
    /// - `NEARBOT_MODEL` — model name
    /// - `BRAVE_API_KEY` — search credential (never stored in the file)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            self.model.base_url = url;
        }
        if let Ok(model) = std::env::var("NEARBOT_MODEL") {
            self.model.model = model;
        }
        if let Ok(key) = std::env::var("BRAVE_API_KEY") {
            self.search.api_key = Some(key);
        }
    }
}

// ── Model backend ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_url")]
    pub base_url: String,

    #[serde(default = "default_model_name")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Completion timeout. The completion call is the critical path, so it
    /// gets a much longer bound than the context sources.
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
}

fn default_model_url() -> String {
    "http://localhost:11434".into()
}
fn default_model_name() -> String {
    "llama3".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_model_timeout() -> u64 {
    60
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_model_url(),
            model: default_model_name(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_model_timeout(),
        }
    }
}

// ── Web search ────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Brave Search subscription token. Absent means search is disabled and
    /// every query resolves to "no results".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_search_url")]
    pub base_url: String,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("max_results", &self.max_results)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_search_url() -> String {
    "https://api.search.brave.com/res/v1/web/search".into()
}
fn default_max_results() -> usize {
    3
}
fn default_source_timeout() -> u64 {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_search_url(),
            max_results: default_max_results(),
            timeout_secs: default_source_timeout(),
        }
    }
}

// ── Geolocation ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_geo_url")]
    pub base_url: String,

    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,
}

fn default_geo_url() -> String {
    "https://ipapi.co".into()
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            base_url: default_geo_url(),
            timeout_secs: default_source_timeout(),
        }
    }
}

// ── Storage ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_favorites_path")]
    pub favorites_path: String,

    #[serde(default = "default_memory_path")]
    pub memory_path: String,

    /// Hard cap on remembered exchanges, enforced on every write.
    #[serde(default = "default_memory_retention")]
    pub memory_retention: usize,
}

fn default_favorites_path() -> String {
    "data/favorites.json".into()
}
fn default_memory_path() -> String {
    "data/memory.json".into()
}
fn default_memory_retention() -> usize {
    10
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            favorites_path: default_favorites_path(),
            memory_path: default_memory_path(),
            memory_retention: default_memory_retention(),
        }
    }
}

// ── Prompt ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Maximum rendered prompt size in characters.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// How many remembered exchanges to include.
    #[serde(default = "default_memory_limit")]
    pub memory_limit: usize,
}

fn default_max_chars() -> usize {
    2048
}
fn default_memory_limit() -> usize {
    3
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            memory_limit: default_memory_limit(),
        }
    }
}

// ── Gateway ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}
