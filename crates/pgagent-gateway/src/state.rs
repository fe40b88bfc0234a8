//! Shared application state handed to every axum handler.

use pgagent_audit::AuditStore;
use pgagent_exec::SandboxExecutor;
use pgagent_llm::LlmProvider;
use pgagent_security::Allowlist;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

pub struct AppState {
    pub token: String,
    pub audit: Arc<AuditStore>,
    pub allowlist: Allowlist,
    pub executor: SandboxExecutor,
    pub llm: Arc<dyn LlmProvider>,
    pub llm_model: Option<String>,
    pub registry_path: PathBuf,
    pub discoverable_names: HashSet<String>,
    pub started_at: Instant,
}
