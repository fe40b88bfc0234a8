//! HTTP-JSON providers: ollama, openai, azure, lmstudio.

use crate::provider::{connection_error, strip_markdown_fence, LlmProvider};
use pgagent_core::{Error, LlmConfig, LlmProviderKind, Result};
use std::time::Duration;

/// Upper bound on a single completion round-trip; local CPU-only models can
/// be very slow.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(1800);

pub struct HttpProvider {
    kind: LlmProviderKind,
    client: reqwest::Client,
    config: LlmConfig,
}

impl HttpProvider {
    pub fn new(kind: LlmProviderKind, config: LlmConfig) -> Self {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build().unwrap_or_default();
        Self { kind, client, config }
    }

    fn provider_name(&self) -> &'static str {
        match self.kind {
            LlmProviderKind::Ollama => "ollama",
            LlmProviderKind::Openai => "openai",
            LlmProviderKind::Azure => "azure",
            LlmProviderKind::Lmstudio => "lmstudio",
            LlmProviderKind::Mock => "mock",
        }
    }

    async fn chat_ollama(&self, prompt: &str, model: &str) -> Result<String> {
        let url = self.config.url.as_deref().unwrap_or("http://localhost:11434");
        let payload = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "format": "json",
        });

        let resp = self
            .client
            .post(format!("{url}/api/generate"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| connection_error("ollama", e))?;

        let body: serde_json::Value =
            resp.json().await.map_err(|e| Error::llm_error("ollama", format!("bad response body: {e}")))?;

        let text = body.get("response").and_then(|v| v.as_str()).unwrap_or("").to_string();
        Ok(strip_markdown_fence(&text))
    }

    async fn chat_openai(&self, prompt: &str, model: &str) -> Result<String> {
        let url = self.config.endpoint.as_deref().unwrap_or("https://api.openai.com/v1/chat/completions");
        let payload = serde_json::json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
        });

        let mut req = self.client.post(url).json(&payload);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| connection_error("openai", e))?;
        let body: serde_json::Value =
            resp.json().await.map_err(|e| Error::llm_error("openai", format!("bad response body: {e}")))?;

        let text = body["choices"][0]["message"]["content"].as_str().unwrap_or("").to_string();
        Ok(strip_markdown_fence(&text))
    }

    async fn chat_azure(&self, prompt: &str, model: &str) -> Result<String> {
        let endpoint = self
            .config
            .endpoint
            .as_deref()
            .ok_or_else(|| Error::ConfigError("azure provider requires an endpoint".to_string()))?;
        let deployment = self.config.deployment.as_deref().unwrap_or(model);
        let url = format!("{endpoint}/openai/deployments/{deployment}/chat/completions?api-version=2024-02-01");

        let payload = serde_json::json!({
            "messages": [{"role": "user", "content": prompt}],
        });

        let mut req = self.client.post(url).json(&payload);
        if let Some(key) = &self.config.api_key {
            req = req.header("api-key", key);
        }

        let resp = req.send().await.map_err(|e| connection_error("azure", e))?;
        let body: serde_json::Value =
            resp.json().await.map_err(|e| Error::llm_error("azure", format!("bad response body: {e}")))?;

        let text = body["choices"][0]["message"]["content"].as_str().unwrap_or("").to_string();
        Ok(strip_markdown_fence(&text))
    }

    async fn chat_lmstudio(&self, prompt: &str, model: &str) -> Result<String> {
        let url = self.config.url.as_deref().unwrap_or("http://localhost:1234");
        let payload = serde_json::json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
        });

        let resp = self
            .client
            .post(format!("{url}/v1/chat/completions"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| connection_error("lmstudio", e))?;

        let body: serde_json::Value =
            resp.json().await.map_err(|e| Error::llm_error("lmstudio", format!("bad response body: {e}")))?;

        let text = body["choices"][0]["message"]["content"].as_str().unwrap_or("").to_string();
        Ok(strip_markdown_fence(&text))
    }
}

#[async_trait::async_trait]
impl LlmProvider for HttpProvider {
    fn name(&self) -> &str {
        self.provider_name()
    }

    async fn chat(&self, prompt: &str, model: Option<&str>) -> Result<String> {
        let model = model.or(self.config.model.as_deref()).unwrap_or("default");

        let result = match self.kind {
            LlmProviderKind::Ollama => self.chat_ollama(prompt, model).await,
            LlmProviderKind::Openai => self.chat_openai(prompt, model).await,
            LlmProviderKind::Azure => self.chat_azure(prompt, model).await,
            LlmProviderKind::Lmstudio => self.chat_lmstudio(prompt, model).await,
            LlmProviderKind::Mock => unreachable!("mock provider is constructed separately"),
        };

        if let Err(e) = &result {
            tracing::error!("llm request failed: {e}");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_name_matches_kind() {
        let provider = HttpProvider::new(LlmProviderKind::Ollama, LlmConfig::default());
        assert_eq!(provider.name(), "ollama");
    }
}
