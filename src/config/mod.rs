pub mod validation;

use std::path::Path;

use serde::{Deserialize, Serialize};

use self::validation::validate_config;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Upstream request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_http_pool_max_idle_per_host")]
    pub http_pool_max_idle_per_host: usize,
    #[serde(default = "default_http_pool_idle_timeout_secs")]
    pub http_pool_idle_timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_worker_threads: Option<usize>,
    #[serde(default = "default_max_request_body_bytes")]
    pub max_request_body_bytes: usize,
    /// Honor `HTTP_PROXY`/`HTTPS_PROXY` for backend and image fetches.
    #[serde(default)]
    pub http_use_env_proxy: bool,
    /// Bind this many `SO_REUSEPORT` listeners (Unix only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_reuse_port_listener_count: Option<usize>,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_timeout() -> u64 {
    180
}
fn default_http_pool_max_idle_per_host() -> usize {
    16
}
fn default_http_pool_idle_timeout_secs() -> u64 {
    15
}
fn default_max_request_body_bytes() -> usize {
    20 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            timeout: default_timeout(),
            http_pool_max_idle_per_host: default_http_pool_max_idle_per_host(),
            http_pool_idle_timeout_secs: default_http_pool_idle_timeout_secs(),
            runtime_worker_threads: None,
            max_request_body_bytes: default_max_request_body_bytes(),
            http_use_env_proxy: false,
            tcp_reuse_port_listener_count: None,
        }
    }
}

/// Gemini backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Value sent as `x-goog-api-client` on every backend call.
    #[serde(default = "default_api_client")]
    pub api_client: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_embeddings_model")]
    pub default_embeddings_model: String,
    /// Requested model names starting with one of these are forwarded as-is.
    #[serde(default = "default_model_prefixes")]
    pub model_prefixes: Vec<String>,
    #[serde(default = "default_safety_threshold")]
    pub safety_threshold: String,
    #[serde(default = "default_harm_categories")]
    pub harm_categories: Vec<String>,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_api_version() -> String {
    "v1beta".to_string()
}
fn default_api_client() -> String {
    "genai-js/0.21.0".to_string()
}
fn default_model() -> String {
    "gemini-1.5-pro-latest".to_string()
}
fn default_embeddings_model() -> String {
    "text-embedding-004".to_string()
}
fn default_model_prefixes() -> Vec<String> {
    vec!["gemini-".to_string(), "learnlm-".to_string()]
}
fn default_safety_threshold() -> String {
    "BLOCK_NONE".to_string()
}
fn default_harm_categories() -> Vec<String> {
    [
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_CIVIC_INTEGRITY",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: default_api_version(),
            api_client: default_api_client(),
            default_model: default_model(),
            default_embeddings_model: default_embeddings_model(),
            model_prefixes: default_model_prefixes(),
            safety_threshold: default_safety_threshold(),
            harm_categories: default_harm_categories(),
        }
    }
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

/// Load configuration from a YAML file and validate it.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading the file fails, [`ConfigError::Yaml`]
/// when parsing fails, or [`ConfigError::Validation`] when semantic validation fails.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_yaml::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields the built-in defaults.
///
/// # Errors
///
/// Same as [`load_config`] for a file that exists.
pub fn load_config_or_default(path: &str) -> Result<AppConfig, ConfigError> {
    if Path::new(path).exists() {
        return load_config(path);
    }
    let config = AppConfig::default();
    validate_config(&config)?;
    Ok(config)
}
