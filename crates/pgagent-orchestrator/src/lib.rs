//! pgagent-orchestrator — runs a validated plan step by step, re-checking
//! admission at execution time since the registry or allowlist may have
//! changed since planning.

use pgagent_core::{ExecutionRecord, OnError, Plan, PlanState};
use pgagent_exec::SandboxExecutor;
use pgagent_security::{safety, Allowlist};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

const MAX_PLAN_DURATION: Duration = Duration::from_secs(60);

fn build_command(tool: &str, args: &[String], binaries: &BTreeMap<String, String>) -> String {
    let path = binaries.get(tool).cloned().unwrap_or_else(|| tool.to_string());
    let mut command = path;
    for arg in args {
        command.push(' ');
        command.push_str(arg);
    }
    command
}

/// Executes `plan` against the current registry snapshot, step by step.
/// Never panics: every failure mode is recorded in `state.errors` and the
/// loop moves on or stops according to the step's `on_error` policy.
pub async fn run_plan(
    plan: &Plan,
    binaries: &BTreeMap<String, String>,
    allowlist: &Allowlist,
    executor: &SandboxExecutor,
) -> PlanState {
    let mut state = PlanState::default();
    let start = Instant::now();

    for (i, step) in plan.steps.iter().enumerate() {
        if i >= plan.max_steps {
            break;
        }

        if start.elapsed() > MAX_PLAN_DURATION {
            state.errors.push("Plan aborted: timeout".to_string());
            break;
        }

        if step.tool.is_empty() {
            state.errors.push("missing tool in step".to_string());
            if step.on_error == OnError::Abort {
                break;
            }
            continue;
        }

        if !allowlist.is_tool_allowed(&step.tool) {
            let msg = format!("tool not allowed: {}", step.tool);
            tracing::warn!("{msg}");
            state.errors.push(msg);
            if step.on_error == OnError::Abort {
                break;
            }
            continue;
        }

        let command = build_command(&step.tool, &step.args, binaries);

        if !safety::is_safe(&command) {
            let msg = format!("unsafe command blocked: {command}");
            tracing::warn!("{msg}");
            state.errors.push(msg);
            if step.on_error == OnError::Abort {
                break;
            }
            continue;
        }

        tracing::info!("executing plan step {i}: {command}");
        let step_start = Instant::now();
        let result = executor.run(&command, binaries).await;
        let duration_ms = step_start.elapsed().as_millis() as u64;

        let exit_code = result.exit_code;
        state.history.push(ExecutionRecord { step: step.clone(), command: command.clone(), result, duration_ms });

        if exit_code != 0 && step.on_error == OnError::Abort {
            state.errors.push(format!("step {i} failed, aborting plan"));
            break;
        }
    }

    state.elapsed_ms = start.elapsed().as_millis() as u64;
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgagent_audit::AuditStore;
    use pgagent_core::Step;
    use std::io::Write;
    use std::sync::Arc;

    fn allowlist_with(tools: &[&str]) -> (Allowlist, std::path::PathBuf) {
        let mut path = std::env::temp_dir();
        path.push(format!("pgagent-orch-test-{}-{}.json", tools.join("-"), std::process::id()));
        let body = serde_json::json!({ "allowed_tools": tools });
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{}", body).unwrap();
        (Allowlist::new(&path), path)
    }

    fn audit_store() -> (Arc<AuditStore>, std::path::PathBuf) {
        let mut path = std::env::temp_dir();
        path.push(format!("pgagent-orch-audit-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        (Arc::new(AuditStore::open(&path).unwrap()), path)
    }

    #[tokio::test]
    async fn runs_a_single_successful_step() {
        let (allowlist, alist_path) = allowlist_with(&["true"]);
        let (audit, audit_path) = audit_store();
        let executor = SandboxExecutor::new(allowlist.clone(), audit, false);

        let mut binaries = BTreeMap::new();
        binaries.insert("true".to_string(), "/usr/bin/true".to_string());

        let plan = Plan {
            goal: "noop".to_string(),
            mode: pgagent_core::Mode::Readonly,
            max_steps: 1,
            steps: vec![Step {
                id: "s1".to_string(),
                tool: "true".to_string(),
                args: vec![],
                intent: String::new(),
                justification: String::new(),
                risk_assessment: String::new(),
                on_error: OnError::Abort,
            }],
        };

        let state = run_plan(&plan, &binaries, &allowlist, &executor).await;
        assert_eq!(state.history.len(), 1);
        assert!(state.errors.is_empty());
        let _ = std::fs::remove_file(alist_path);
        let _ = std::fs::remove_file(audit_path);
    }

    #[tokio::test]
    async fn disallowed_tool_is_recorded_as_error_and_aborts() {
        let (allowlist, alist_path) = allowlist_with(&["true"]);
        let (audit, audit_path) = audit_store();
        let executor = SandboxExecutor::new(allowlist.clone(), audit, false);

        let plan = Plan {
            goal: "bad".to_string(),
            mode: pgagent_core::Mode::Readonly,
            max_steps: 1,
            steps: vec![Step {
                id: "s1".to_string(),
                tool: "rm".to_string(),
                args: vec!["-rf".to_string(), "/".to_string()],
                intent: String::new(),
                justification: String::new(),
                risk_assessment: String::new(),
                on_error: OnError::Abort,
            }],
        };

        let state = run_plan(&plan, &BTreeMap::new(), &allowlist, &executor).await;
        assert!(state.history.is_empty());
        assert_eq!(state.errors.len(), 1);
        assert!(state.errors[0].contains("not allowed"));
        let _ = std::fs::remove_file(alist_path);
        let _ = std::fs::remove_file(audit_path);
    }

    #[tokio::test]
    async fn max_steps_bounds_execution() {
        let (allowlist, alist_path) = allowlist_with(&["true"]);
        let (audit, audit_path) = audit_store();
        let executor = SandboxExecutor::new(allowlist.clone(), audit, false);
        let mut binaries = BTreeMap::new();
        binaries.insert("true".to_string(), "/usr/bin/true".to_string());

        let steps = (0..3)
            .map(|i| Step {
                id: format!("s{i}"),
                tool: "true".to_string(),
                args: vec![],
                intent: String::new(),
                justification: String::new(),
                risk_assessment: String::new(),
                on_error: OnError::Continue,
            })
            .collect();

        let plan = Plan { goal: "many".to_string(), mode: pgagent_core::Mode::Readonly, max_steps: 1, steps };
        let state = run_plan(&plan, &binaries, &allowlist, &executor).await;
        assert_eq!(state.history.len(), 1);
        let _ = std::fs::remove_file(alist_path);
        let _ = std::fs::remove_file(audit_path);
    }
}
