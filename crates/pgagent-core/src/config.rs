//! Application configuration: on-disk JSON plus environment overrides.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// LLM provider family. `Mock` needs no network and is the default when
/// nothing else is configured.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    #[default]
    Mock,
    Ollama,
    Openai,
    Azure,
    Lmstudio,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProviderKind,
    pub url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub deployment: Option<String>,
}

fn default_port() -> u16 {
    5050
}

fn default_allowlist_path() -> String {
    "./config/allowed_tools.json".to_string()
}

fn default_registry_path() -> String {
    "./runtime/registry.json".to_string()
}

fn default_audit_path() -> String {
    "./runtime/audit.db".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SandboxSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct LogSettings {
    pub file: Option<String>,
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_token() -> String {
    "123".to_string()
}

/// Full resolved application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_token")]
    pub token: String,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub sandbox: SandboxSettings,
    #[serde(default = "default_allowlist_path")]
    pub allowlist_path: String,
    #[serde(default = "default_registry_path")]
    pub registry_path: String,
    #[serde(default = "default_audit_path")]
    pub audit_path: String,
    #[serde(default)]
    pub log: LogSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            token: default_token(),
            llm: LlmConfig::default(),
            sandbox: SandboxSettings::default(),
            allowlist_path: default_allowlist_path(),
            registry_path: default_registry_path(),
            audit_path: default_audit_path(),
            log: LogSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load from the path named by `AGENT_CONFIG`, falling back to `default_path`,
    /// falling back again to built-in defaults if neither is readable or parses.
    /// A missing or malformed file is never fatal — it is logged and defaults apply.
    pub fn load(default_path: impl AsRef<Path>) -> Self {
        let path = std::env::var("AGENT_CONFIG").unwrap_or_else(|_| {
            default_path.as_ref().to_string_lossy().to_string()
        });

        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!("failed to parse config at {path}: {e}, using defaults");
                    AppConfig::default()
                }
            },
            Err(_) => {
                tracing::warn!("no config file at {path}, using defaults");
                AppConfig::default()
            }
        };

        if let Ok(port) = std::env::var("AGENT_PORT") {
            if let Ok(p) = port.parse() {
                config.port = p;
            }
        }

        if let Ok(sandbox) = std::env::var("AGENT_SANDBOX") {
            config.sandbox.enabled = sandbox == "1";
        }

        if let Ok(token) = std::env::var("AGENT_TOKEN") {
            config.token = token;
        }

        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::ConfigError("port must be nonzero".into()));
        }
        Ok(())
    }
}
