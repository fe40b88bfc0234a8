//! Shared data model: registry, plans, execution records, audit rows.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One discovered binary, enriched with metadata for the planner.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolEntry {
    pub name: String,
    pub absolute_path: String,
    #[serde(default = "unknown_version")]
    pub version_string: String,
    #[serde(default)]
    pub description: String,
}

fn unknown_version() -> String {
    "unknown".to_string()
}

/// Full snapshot produced by a discovery scan.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub scanned_at: String,
    pub binaries: BTreeMap<String, String>,
    pub tools: Vec<ToolEntry>,
    pub has_conflicts: bool,
    pub conflicts: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub capabilities: serde_json::Value,
}

impl RegistrySnapshot {
    pub fn conflicted_names(&self) -> Vec<String> {
        self.conflicts.keys().cloned().collect()
    }
}

/// Plan execution mode. Readonly biases the planner toward non-mutating tools;
/// enforcement still lives in the allowlist and safety filter.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Readonly,
    Maintenance,
    Change,
}

impl Mode {
    /// Parse from an arbitrary string, clamping anything unrecognized to Readonly.
    pub fn clamp(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "maintenance" => Mode::Maintenance,
            "change" => Mode::Change,
            _ => Mode::Readonly,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    #[default]
    Abort,
    Continue,
}

impl OnError {
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(|s| s.to_ascii_lowercase()) {
            Some(ref s) if s == "continue" => OnError::Continue,
            Some(ref s) if s == "abort" => OnError::Abort,
            _ => OnError::Abort,
        }
    }
}

/// One invocation proposed by the LLM, surviving planner validation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub tool: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub justification: String,
    #[serde(default)]
    pub risk_assessment: String,
    #[serde(default)]
    pub on_error: OnError,
}

fn default_max_steps() -> usize {
    5
}

/// A bounded sequence of tool invocations proposed by the LLM.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Plan {
    pub goal: String,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            goal: format!("Error: {}", message.into()),
            mode: Mode::Readonly,
            max_steps: 0,
            steps: Vec::new(),
        }
    }
}

/// Result of running one resolved command through the sandbox executor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub command_executed: String,
}

/// One step's outcome, as recorded in plan state history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub step: Step,
    pub command: String,
    pub result: ExecOutput,
    pub duration_ms: u64,
}

/// One row of the append-only audit log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: String,
    pub command: String,
    pub executed_command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

pub const REJECTED_BY_ALLOWLIST: &str = "REJECTED_BY_ALLOWLIST";
pub const REJECTED_BY_SAFETY: &str = "REJECTED_BY_SAFETY";

/// Accumulated state of one orchestrator run, returned to the caller.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlanState {
    pub history: Vec<ExecutionRecord>,
    pub errors: Vec<String>,
    #[serde(default)]
    pub elapsed_ms: u64,
}
