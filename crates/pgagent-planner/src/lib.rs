//! pgagent-planner — prompt assembly, robust JSON extraction, and plan
//! validation against the registry and security filters.

pub mod extract;
pub mod prompt;
pub mod validate;

pub use extract::{extract_json, ExtractError};
pub use prompt::build_planner_prompt;
pub use validate::validate_plan;

use pgagent_core::Plan;
use pgagent_llm::LlmProvider;
use pgagent_security::Allowlist;
use std::collections::BTreeMap;

/// Full planning round-trip: assemble the prompt, call the LLM, extract and
/// validate the JSON it returns. Never panics or propagates an error —
/// anything that goes wrong yields `Plan::error(...)`.
pub async fn plan(
    provider: &dyn LlmProvider,
    model: Option<&str>,
    question: &str,
    mode: &str,
    pg_version: &str,
    registry_binaries: &BTreeMap<String, String>,
    tools_help: &BTreeMap<String, String>,
    rag_context: &str,
    allowlist: &Allowlist,
) -> Plan {
    let registry_names: Vec<String> = registry_binaries.keys().cloned().collect();
    let prompt_text = build_planner_prompt(question, mode, pg_version, &registry_names, tools_help, rag_context);

    let raw_response = match provider.chat(&prompt_text, model).await {
        Ok(text) => text,
        Err(e) => return Plan::error(format!("llm request failed: {e}")),
    };

    let cleaned = pgagent_llm::strip_markdown_fence(&raw_response);

    let json_str = match extract_json(&cleaned) {
        Ok(s) => s,
        Err(e) => return Plan::error(e.to_string()),
    };

    let value: serde_json::Value = match serde_json::from_str(&json_str) {
        Ok(v) => v,
        Err(e) => return Plan::error(format!("malformed plan JSON: {e}")),
    };

    validate_plan(&value, registry_binaries, allowlist)
}
