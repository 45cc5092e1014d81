//! Configuration module
//! Handles loading configuration from environment variables and config file,
//! and resolving which upstream platform a base URL belongs to.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{QuotaError, QuotaResult};

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = "glm-quota-api";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_QUERY_DEBOUNCE_MIN: i64 = 1;

pub const ZAI_ORIGIN: &str = "https://api.z.ai";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub query_debounce: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Option<String>,
    pub auth_token: Option<String>,
    pub host: String,
    pub port: u16,
    /// Minutes an upstream response stays cached
    pub query_debounce_min: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            auth_token: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            query_debounce_min: DEFAULT_QUERY_DEBOUNCE_MIN,
        }
    }
}

impl Config {
    /// Load configuration from config file and environment variables
    /// Environment variables take precedence over config file values
    pub fn load() -> Result<Self> {
        let config_path = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME);

        let file_config: Option<ConfigFile> = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            Some(toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?)
        } else {
            None
        };

        Self::from_sources(file_config.as_ref())
    }

    /// Merge environment variables over an optional parsed config file
    pub fn from_sources(file_config: Option<&ConfigFile>) -> Result<Self> {
        let base_url = get_env_or_file(
            "ANTHROPIC_BASE_URL",
            file_config.and_then(|c| c.api.base_url.as_ref()),
        );

        let auth_token = get_env_or_file(
            "ANTHROPIC_AUTH_TOKEN",
            file_config.and_then(|c| c.api.auth_token.as_ref()),
        );

        let host = get_env_or_file("HOST", file_config.and_then(|c| c.server.host.as_ref()))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match std::env::var("PORT").ok().filter(|v| !v.trim().is_empty()) {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {}", v))?,
            None => file_config
                .and_then(|c| c.server.port)
                .unwrap_or(DEFAULT_PORT),
        };

        let query_debounce_min = match std::env::var("QUERY_DEBOUNCE")
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("QUERY_DEBOUNCE is not an integer: {}", v))?,
            None => file_config
                .and_then(|c| c.server.query_debounce)
                .unwrap_or(DEFAULT_QUERY_DEBOUNCE_MIN),
        };

        Ok(Config {
            base_url,
            auth_token,
            host,
            port,
            query_debounce_min,
        })
    }

    /// Cache TTL for upstream responses; non-positive minutes disable caching
    pub fn debounce(&self) -> Duration {
        let minutes = self.query_debounce_min.max(0) as u64;
        Duration::from_secs(minutes.saturating_mul(60))
    }

    pub fn require_auth_token(&self) -> QuotaResult<&str> {
        self.auth_token.as_deref().ok_or_else(|| {
            QuotaError::Configuration(
                "ANTHROPIC_AUTH_TOKEN environment variable is not set".to_string(),
            )
        })
    }

    pub fn require_base_url(&self) -> QuotaResult<&str> {
        self.base_url.as_deref().ok_or_else(|| {
            QuotaError::Configuration(
                "ANTHROPIC_BASE_URL environment variable is not set. Set it to https://api.z.ai/api/anthropic or https://open.bigmodel.cn/api/anthropic".to_string(),
            )
        })
    }
}

fn get_env_or_file(env_key: &str, file_value: Option<&String>) -> Option<String> {
    std::env::var(env_key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| file_value.map(|s| s.trim().to_string()))
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Zai,
    Zhipu,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Zai => write!(f, "ZAI"),
            Platform::Zhipu => write!(f, "ZHIPU"),
        }
    }
}

/// Detect the platform of a base URL and return its API origin
pub fn resolve_base_domain(base_url: &str) -> QuotaResult<(Platform, String)> {
    if base_url.contains("api.z.ai") {
        return Ok((Platform::Zai, ZAI_ORIGIN.to_string()));
    }

    if base_url.contains("open.bigmodel.cn") || base_url.contains("dev.bigmodel.cn") {
        let parsed = url::Url::parse(base_url).map_err(|e| {
            QuotaError::UnrecognizedBaseUrl(format!("{} (failed to parse URL: {})", base_url, e))
        })?;
        let host = parsed.host_str().unwrap_or_default();
        let authority = match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        return Ok((Platform::Zhipu, format!("{}://{}", parsed.scheme(), authority)));
    }

    Err(QuotaError::UnrecognizedBaseUrl(base_url.to_string()))
}
