//! pgagent-llm — pluggable chat-completion backend for the planner.

pub mod http;
pub mod mock;
pub mod provider;

pub use http::HttpProvider;
pub use mock::MockProvider;
pub use provider::{strip_markdown_fence, LlmProvider};

use pgagent_core::{LlmConfig, LlmProviderKind};
use std::sync::Arc;

/// Builds the configured provider. `Mock` needs no network and is returned
/// directly; every other kind goes through the HTTP-JSON client.
pub fn build_provider(config: &LlmConfig) -> Arc<dyn LlmProvider> {
    match config.provider {
        LlmProviderKind::Mock => Arc::new(MockProvider),
        kind => Arc::new(HttpProvider::new(kind, config.clone())),
    }
}
