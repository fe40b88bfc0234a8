//! Validates an LLM-proposed plan against the registry and the security
//! filters before it is ever allowed near the orchestrator.

use pgagent_core::{Mode, OnError, Plan, Step};
use pgagent_security::{safety, Allowlist};
use std::collections::BTreeMap;

const MAX_STEPS_PER_PLAN: usize = 5;

/// Resolves a tool name against the registry's binary map. Exact matches
/// win; otherwise a prefix match is accepted only if exactly one registry
/// key starts with the given name (e.g. `psql` matching the lone `psql-16`).
fn resolve_registry_key(tool_basename: &str, registry_binaries: &BTreeMap<String, String>) -> Option<String> {
    if registry_binaries.contains_key(tool_basename) {
        return Some(tool_basename.to_string());
    }

    let mut matches: Vec<&String> = registry_binaries.keys().filter(|k| k.starts_with(tool_basename)).collect();
    if matches.len() == 1 {
        return matches.pop().cloned();
    }

    None
}

fn basename(tool: &str) -> &str {
    tool.rsplit('/').next().unwrap_or(tool)
}

/// Validates one raw step object. Returns `None` if any check fails — the
/// caller silently drops it rather than failing the whole plan.
fn validate_step(raw: &serde_json::Value, registry_binaries: &BTreeMap<String, String>, allowlist: &Allowlist) -> Option<Step> {
    let tool_raw = raw.get("tool")?.as_str()?;
    if tool_raw.is_empty() {
        return None;
    }

    let args_value = raw.get("args").and_then(|v| v.as_array());
    let args: Vec<String> = match args_value {
        Some(arr) => {
            let mut out = Vec::with_capacity(arr.len());
            for item in arr {
                out.push(item.as_str()?.to_string());
            }
            out
        }
        None => Vec::new(),
    };

    let tool = basename(tool_raw);
    let resolved_key = resolve_registry_key(tool, registry_binaries)?;
    let resolved_path = registry_binaries.get(&resolved_key)?;

    if !allowlist.is_tool_allowed(&resolved_key) {
        return None;
    }

    let mut command = resolved_path.clone();
    for arg in &args {
        command.push(' ');
        command.push_str(arg);
    }
    if !safety::is_safe(&command) {
        return None;
    }

    let on_error_raw = raw.get("on_error").and_then(|v| v.as_str());
    let on_error = OnError::parse_or_default(on_error_raw);

    let id = raw.get("id").and_then(|v| v.as_str()).unwrap_or(&resolved_key).to_string();
    let intent = raw.get("intent").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let justification = raw.get("justification").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let risk_assessment = raw.get("risk_assessment").and_then(|v| v.as_str()).unwrap_or_default().to_string();

    Some(Step { id, tool: resolved_key, args, intent, justification, risk_assessment, on_error })
}

/// Validates the full plan object. Unparsable plans and plans that retain
/// zero steps after validation — even if every proposed step was simply
/// dropped for failing admission — both fall back to `Plan::error`.
pub fn validate_plan(raw: &serde_json::Value, registry_binaries: &BTreeMap<String, String>, allowlist: &Allowlist) -> Plan {
    let goal = raw.get("goal").and_then(|v| v.as_str()).unwrap_or("").to_string();

    if goal.starts_with("MISSING_TOOL:") {
        return Plan { goal, mode: Mode::Readonly, max_steps: 0, steps: Vec::new() };
    }

    let mode = raw.get("mode").and_then(|v| v.as_str()).map(Mode::clamp).unwrap_or_default();

    let max_steps = raw
        .get("max_steps")
        .and_then(|v| v.as_u64())
        .map(|v| (v as usize).min(MAX_STEPS_PER_PLAN))
        .unwrap_or(MAX_STEPS_PER_PLAN);

    let raw_steps = raw.get("steps").and_then(|v| v.as_array()).cloned().unwrap_or_default();

    let mut steps: Vec<Step> = raw_steps
        .iter()
        .filter_map(|s| validate_step(s, registry_binaries, allowlist))
        .collect();
    steps.truncate(max_steps);

    if steps.is_empty() {
        return Plan::error("plan had no valid steps");
    }

    Plan { goal, mode, max_steps, steps }
}
