//! Wires up the axum router and serves it.

use crate::handlers::{audit_handler, exec_handler, explore_handler, health_handler, plan_exec_handler, registry_handler};
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use pgagent_audit::AuditStore;
use pgagent_core::AppConfig;
use pgagent_exec::SandboxExecutor;
use pgagent_security::Allowlist;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Default set of binary names discovery scans for, independent of whatever
/// is currently in the allowlist file — this is deliberately broader than
/// the allowlist so operators can widen the allowlist without re-scanning.
fn default_discoverable_names() -> HashSet<String> {
    [
        "psql", "pg_dump", "pg_isready", "patronictl", "pgbackrest", "pg_verifybackup", "repmgr", "pg_basebackup",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

pub async fn start_gateway(config: AppConfig) -> anyhow::Result<()> {
    config.validate().map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let allowlist = Allowlist::new(&config.allowlist_path);
    let audit = Arc::new(AuditStore::open(&config.audit_path)?);
    let executor = SandboxExecutor::new(allowlist.clone(), audit.clone(), config.sandbox.enabled);
    let llm = pgagent_llm::build_provider(&config.llm);

    let state = Arc::new(AppState {
        token: config.token.clone(),
        audit,
        allowlist,
        executor,
        llm,
        llm_model: config.llm.model.clone(),
        registry_path: PathBuf::from(&config.registry_path),
        discoverable_names: default_discoverable_names(),
        started_at: Instant::now(),
    });

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/registry", get(registry_handler))
        .route("/explore/{tool}", get(explore_handler))
        .route("/exec", post(exec_handler))
        .route("/audit", get(audit_handler))
        .route("/plan_exec", post(plan_exec_handler))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(state);

    let bind_addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;

    info!("pgagent starting");
    info!("  listening on: {bind_addr}");
    info!("  sandbox enabled: {}", config.sandbox.enabled);
    info!("  llm provider: {:?}", config.llm.provider);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
