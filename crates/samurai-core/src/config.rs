use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::credentials::AuthPolicy;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_BASE_URL: &str = "SAMURAI_API_BASE_URL";
pub const ENV_TOKEN: &str = "SAMURAI_TOKEN";
pub const ENV_AUTH_POLICY: &str = "SAMURAI_AUTH_POLICY";

#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub auth_policy: Option<AuthPolicy>,
    pub request_timeout_secs: Option<u64>,
    pub token: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_base_url", &self.api_base_url)
            .field("auth_policy", &self.auth_policy)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Settings the client actually runs with, after env overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub auth_policy: AuthPolicy,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {:?}", path))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn save_token(token: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.token = Some(token.to_string());
        config.save()
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("samurai"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn resolve(&self) -> ClientSettings {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Env vars win over the file, the file wins over defaults.
    pub fn resolve_with(&self, env: impl Fn(&str) -> Option<String>) -> ClientSettings {
        let base_url = env(ENV_BASE_URL)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let auth_policy = env(ENV_AUTH_POLICY)
            .and_then(|v| AuthPolicy::from_str(&v))
            .or(self.auth_policy)
            .unwrap_or_default();

        let timeout = Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));

        ClientSettings {
            base_url,
            timeout,
            auth_policy,
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token_with(|key| std::env::var(key).ok())
    }

    pub fn token_with(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        env(ENV_TOKEN)
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.token.clone())
    }

    /// Where the token comes from: "env", "config", or None
    pub fn token_source(&self) -> Option<&'static str> {
        if std::env::var(ENV_TOKEN).is_ok_and(|t| !t.trim().is_empty()) {
            Some("env")
        } else if self.token.is_some() {
            Some("config")
        } else {
            None
        }
    }
}
