//! LLM provider abstraction: a single non-streaming `chat` capability.

use pgagent_core::{Error, Result};

/// A chat completion backend. Implementations must not parse or validate the
/// returned text as a plan — that is the planner's job.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn chat(&self, prompt: &str, model: Option<&str>) -> Result<String>;
}

/// Strips a leading/trailing ``` fence (optionally tagged `json`) that some
/// models wrap their output in.
pub fn strip_markdown_fence(text: &str) -> String {
    let without_open = regex::Regex::new(r"```(?:json)?\s*").unwrap().replace(text, "");
    let without_close = regex::Regex::new(r"\s*```").unwrap().replace(&without_open, "");
    without_close.trim().to_string()
}

pub(crate) fn connection_error(provider: &str, e: impl std::fmt::Display) -> Error {
    Error::llm_error(provider, format!("connection error: {e}"))
}
