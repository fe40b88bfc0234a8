//! Error types shared across the agent

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("authentication failed: {reason}")]
    AuthFailed { reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("tool '{0}' not found in registry")]
    ToolNotFound(String),

    #[error("tool '{0}' not allowed")]
    NotAllowed(String),

    #[error("unsafe command: {0}")]
    Unsafe(String),

    #[error("registry has unresolved conflicts: {0:?}")]
    RegistryConflict(Vec<String>),

    #[error("llm error: {provider} - {message}")]
    LlmError { provider: String, message: String },

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("sandbox error: {0}")]
    SandboxError(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn auth_failed(reason: impl Into<String>) -> Self {
        Self::AuthFailed { reason: reason.into() }
    }

    pub fn llm_error(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LlmError { provider: provider.into(), message: message.into() }
    }
}
