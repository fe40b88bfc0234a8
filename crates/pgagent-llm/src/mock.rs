//! Canned provider used for tests and when no real backend is configured.

use crate::provider::LlmProvider;
use pgagent_core::Result;

pub struct MockProvider;

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat(&self, _prompt: &str, _model: Option<&str>) -> Result<String> {
        Ok(serde_json::json!({
            "goal": "Verify backup freshness (mock mode)",
            "mode": "readonly",
            "max_steps": 1,
            "steps": [
                {
                    "id": "check_pg_data",
                    "tool": "pg_isready",
                    "args": [],
                    "intent": "Check server readiness for diagnosis",
                    "on_error": "continue"
                }
            ]
        })
        .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_a_valid_plan_shaped_json() {
        let provider = MockProvider;
        let text = provider.chat("anything", None).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["mode"], "readonly");
        assert_eq!(value["steps"][0]["tool"], "pg_isready");
    }
}
