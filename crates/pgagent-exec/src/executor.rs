//! The sandboxed command executor: allowlist, safety, resolution, sandbox
//! wrapping, timeout-bounded execution, and audit — in that order.

use crate::resolve::resolve_tool_path;
use crate::sandbox::{build_bwrap_command, bwrap_available};
use pgagent_audit::AuditStore;
use pgagent_core::{ExecOutput, REJECTED_BY_ALLOWLIST, REJECTED_BY_SAFETY};
use pgagent_security::{safety, Allowlist};
use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

const EXEC_TIMEOUT: Duration = Duration::from_secs(45);

pub struct SandboxExecutor {
    allowlist: Allowlist,
    audit: Arc<AuditStore>,
    sandbox_enabled: bool,
}

impl SandboxExecutor {
    pub fn new(allowlist: Allowlist, audit: Arc<AuditStore>, sandbox_enabled: bool) -> Self {
        Self { allowlist, audit, sandbox_enabled }
    }

    /// Runs `command` through the full admission and execution pipeline.
    /// `binaries` is the registry's current name-to-path map, used for
    /// resolution.
    pub async fn run(&self, command: &str, binaries: &BTreeMap<String, String>) -> ExecOutput {
        if !self.allowlist.is_tool_allowed(command) {
            self.audit.log(command, REJECTED_BY_ALLOWLIST, -1, "", "tool not allowed");
            return ExecOutput {
                stdout: String::new(),
                stderr: "tool not allowed".to_string(),
                exit_code: -1,
                command_executed: REJECTED_BY_ALLOWLIST.to_string(),
            };
        }

        if !safety::is_safe(command) {
            let reason = safety::get_unsafe_reason(command);
            self.audit.log(command, REJECTED_BY_SAFETY, -1, "", &reason);
            return ExecOutput {
                stdout: String::new(),
                stderr: reason,
                exit_code: -1,
                command_executed: REJECTED_BY_SAFETY.to_string(),
            };
        }

        let tokens = match shell_words::split(command) {
            Ok(t) if !t.is_empty() => t,
            _ => {
                let msg = "could not tokenize command";
                self.audit.log(command, "UNRESOLVED", -1, "", msg);
                return ExecOutput {
                    stdout: String::new(),
                    stderr: msg.to_string(),
                    exit_code: -1,
                    command_executed: "UNRESOLVED".to_string(),
                };
            }
        };

        let tool = &tokens[0];
        let args = &tokens[1..];

        let resolved = match resolve_tool_path(tool, binaries) {
            Some(p) => p,
            None => {
                let msg = format!("tool '{tool}' could not be resolved to an executable path");
                self.audit.log(command, "UNRESOLVED", -1, "", &msg);
                return ExecOutput {
                    stdout: String::new(),
                    stderr: msg,
                    exit_code: -1,
                    command_executed: "UNRESOLVED".to_string(),
                };
            }
        };

        let (program, spawn_args, command_executed) = if self.sandbox_enabled && bwrap_available() {
            let wrapped = build_bwrap_command(&resolved, args);
            let executed = wrapped.join(" ");
            (wrapped[0].clone(), wrapped[1..].to_vec(), executed)
        } else {
            if self.sandbox_enabled {
                tracing::warn!("bwrap not available, running '{tool}' unsandboxed");
            }
            let mut full = vec![resolved.clone()];
            full.extend(args.iter().cloned());
            (resolved.clone(), args.to_vec(), full.join(" "))
        };

        let spawn = Command::new(&program)
            .args(&spawn_args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawn {
            Ok(c) => c,
            Err(e) => {
                let msg = format!("failed to spawn: {e}");
                self.audit.log(command, &command_executed, -1, "", &msg);
                return ExecOutput { stdout: String::new(), stderr: msg, exit_code: -1, command_executed };
            }
        };

        let output = tokio::time::timeout(EXEC_TIMEOUT, child.wait_with_output()).await;

        let result = match output {
            Ok(Ok(out)) => ExecOutput {
                stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
                exit_code: out.status.code().unwrap_or(-1),
                command_executed: command_executed.clone(),
            },
            Ok(Err(e)) => ExecOutput {
                stdout: String::new(),
                stderr: format!("execution failed: {e}"),
                exit_code: -1,
                command_executed: command_executed.clone(),
            },
            Err(_) => ExecOutput {
                stdout: String::new(),
                stderr: "command timed out after 45s".to_string(),
                exit_code: 124,
                command_executed: command_executed.clone(),
            },
        };

        self.audit.log(command, &result.command_executed, result.exit_code, &result.stdout, &result.stderr);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn allowlist_with(tools: &[&str]) -> (Allowlist, std::path::PathBuf) {
        let mut path = std::env::temp_dir();
        path.push(format!("pgagent-exec-test-{}-{}.json", tools.join("-"), std::process::id()));
        let body = serde_json::json!({ "allowed_tools": tools });
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{}", body).unwrap();
        (Allowlist::new(&path), path)
    }

    fn audit_store() -> (Arc<AuditStore>, std::path::PathBuf) {
        let mut path = std::env::temp_dir();
        path.push(format!("pgagent-exec-audit-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        (Arc::new(AuditStore::open(&path).unwrap()), path)
    }

    #[tokio::test]
    async fn rejects_disallowed_tool_without_spawning() {
        let (allowlist, alist_path) = allowlist_with(&["psql"]);
        let (audit, audit_path) = audit_store();
        let executor = SandboxExecutor::new(allowlist, audit, false);
        let out = executor.run("rm -rf /", &BTreeMap::new()).await;
        assert_eq!(out.exit_code, -1);
        assert_eq!(out.command_executed, REJECTED_BY_ALLOWLIST);
        let _ = std::fs::remove_file(alist_path);
        let _ = std::fs::remove_file(audit_path);
    }

    #[tokio::test]
    async fn rejects_unsafe_allowed_command() {
        let (allowlist, alist_path) = allowlist_with(&["psql"]);
        let (audit, audit_path) = audit_store();
        let executor = SandboxExecutor::new(allowlist, audit, false);
        let out = executor.run("psql -c 'SELECT 1;' ; whoami", &BTreeMap::new()).await;
        assert_eq!(out.exit_code, -1);
        assert_eq!(out.command_executed, REJECTED_BY_SAFETY);
        let _ = std::fs::remove_file(alist_path);
        let _ = std::fs::remove_file(audit_path);
    }

    #[tokio::test]
    async fn unresolvable_tool_reports_error_without_sandbox() {
        let (allowlist, alist_path) = allowlist_with(&["psql"]);
        let (audit, audit_path) = audit_store();
        let executor = SandboxExecutor::new(allowlist, audit, false);
        let out = executor.run("psql --version", &BTreeMap::new()).await;
        // psql is unlikely to be on PATH in the test environment; if it
        // happens to be, this just executes it. Either way exit_code won't
        // be the admission-rejection sentinel.
        assert_ne!(out.command_executed, REJECTED_BY_ALLOWLIST);
        assert_ne!(out.command_executed, REJECTED_BY_SAFETY);
        let _ = std::fs::remove_file(alist_path);
        let _ = std::fs::remove_file(audit_path);
    }

    #[tokio::test]
    async fn runs_resolved_binary_unsandboxed() {
        let (allowlist, alist_path) = allowlist_with(&["true"]);
        let (audit, audit_path) = audit_store();
        let executor = SandboxExecutor::new(allowlist, audit, false);
        let mut binaries = BTreeMap::new();
        binaries.insert("true".to_string(), "/usr/bin/true".to_string());
        let out = executor.run("true", &binaries).await;
        assert_eq!(out.exit_code, 0);
        let _ = std::fs::remove_file(alist_path);
        let _ = std::fs::remove_file(audit_path);
    }
}
