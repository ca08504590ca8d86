//! # Application Configuration
//!
//! This module defines the configuration structure for the `asknova-server`
//! and provides the logic for loading it from a `config.yml` file and
//! environment variables. Required settings (the database path and a usable
//! AI provider definition) are validated here, at startup, so a
//! misconfigured process fails immediately with a diagnostic instead of
//! lazily on its first request.

use asknova::constants::{DEFAULT_AI_TIMEOUT_SECS, DEFAULT_ERP_TIMEOUT_SECS};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates a required configuration file was not found.
    NotFound(String),
    /// Indicates the resolved configuration is unusable.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Loaded from `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The path to the SQLite database file. Required; there is no default
    /// so a missing store connection fails startup.
    pub db_url: String,
    /// Optional CORS origin the browser client is served from.
    #[serde(default)]
    pub cors_origin: Option<String>,
    /// The key of the provider (from `providers`) answering chat fallbacks.
    #[serde(default = "default_chat_provider")]
    pub chat_provider: String,
    /// Bound, in seconds, on a single generative-AI call.
    #[serde(default = "default_ai_timeout_secs")]
    pub ai_timeout_secs: u64,
    /// The proxied ERP surface.
    #[serde(default)]
    pub erp: ErpConfig,
    /// A map of named, reusable AI provider configurations.
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_port() -> u16 {
    8080
}

fn default_chat_provider() -> String {
    "gemini_default".to_string()
}

fn default_ai_timeout_secs() -> u64 {
    DEFAULT_AI_TIMEOUT_SECS
}

fn default_erp_timeout_secs() -> u64 {
    DEFAULT_ERP_TIMEOUT_SECS
}

/// Connection settings for the proxied ERP surface.
#[derive(Debug, Deserialize, Clone)]
pub struct ErpConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_erp_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ErpConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            auth_token: None,
            timeout_secs: DEFAULT_ERP_TIMEOUT_SECS,
        }
    }
}

/// A reusable configuration for a specific AI provider instance.
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// The type of provider (e.g., "gemini", "local").
    pub provider: String,
    /// The API URL. Optional for providers like Gemini where it can be
    /// derived from the model name.
    pub api_url: Option<String>,
    /// The API key, which can be null for local providers.
    pub api_key: Option<String>,
    pub model_name: String,
}

// Helper to read a file, substitute env vars, and return its content.
// Returns Ok(None) if the file does not exist, or an error if it fails to read.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}").unwrap();
    let expanded_content = re.replace_all(&content, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_else(|_| "".to_string())
    });

    Ok(Some(expanded_content.to_string()))
}

/// Loads the application configuration from a file and environment variables.
///
/// Layering, lowest to highest precedence:
/// 1. The main config file (an explicit override path, `config.yml`, or the
///    `config.<AI_PROVIDER>.yml` template), with `${VAR}` substitution.
/// 2. Plain environment variables for top-level keys such as `PORT`.
/// 3. `ASKNOVA_`-prefixed environment variables for nested overrides
///    (e.g., `ASKNOVA_ERP__BASE_URL`).
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let base_path = env!("CARGO_MANIFEST_DIR");
    let mut builder = ConfigBuilder::builder();

    let main_config_path = if let Some(override_path) = config_path_override {
        override_path.to_string()
    } else {
        let user_config_path = format!("{base_path}/config.yml");
        if std::path::Path::new(&user_config_path).exists() {
            info!("Loading user-defined configuration from '{user_config_path}'.");
            user_config_path
        } else {
            let provider = env::var("AI_PROVIDER").unwrap_or_else(|_| "gemini".to_string());
            let fallback_path = format!("{base_path}/config.{provider}.yml");
            info!("'{user_config_path}' not found. Falling back to '{fallback_path}' based on AI_PROVIDER='{provider}'.");
            fallback_path
        }
    };

    let main_content = read_and_substitute(&main_config_path)?.ok_or_else(|| {
        ConfigError::NotFound(format!(
            "Main config file not found at '{main_config_path}'. Please ensure 'config.yml' \
             exists or your AI_PROVIDER is set to load a valid template ('gemini' or 'local')."
        ))
    })?;
    builder = builder.add_source(File::from_str(&main_content, FileFormat::Yaml));

    let settings = builder
        .add_source(Environment::default())
        .add_source(
            Environment::with_prefix("ASKNOVA")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    validate(&config)?;
    Ok(config)
}

/// Startup validation of the resolved configuration.
fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.db_url.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "db_url must point to a SQLite database file (or ':memory:')".to_string(),
        ));
    }
    if config.providers.is_empty() {
        return Err(ConfigError::Invalid(
            "at least one AI provider must be configured".to_string(),
        ));
    }
    let chat_provider = config.providers.get(&config.chat_provider).ok_or_else(|| {
        ConfigError::Invalid(format!(
            "chat_provider '{}' does not name a configured provider",
            config.chat_provider
        ))
    })?;
    if chat_provider.provider == "gemini"
        && chat_provider
            .api_key
            .as_deref()
            .unwrap_or_default()
            .is_empty()
    {
        return Err(ConfigError::Invalid(format!(
            "provider '{}' requires a non-empty api_key",
            config.chat_provider
        )));
    }
    Ok(())
}
