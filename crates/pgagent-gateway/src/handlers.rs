//! Route handlers for the agent's front door.

use crate::auth::verify_token;
use crate::state::AppState;
use axum::extract::{Path as AxumPath, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    let header_value = headers.get("authorization").and_then(|v| v.to_str().ok());
    verify_token(&state.token, header_value)
}

fn unauthorized() -> axum::response::Response {
    (StatusCode::UNAUTHORIZED, Json(serde_json::json!({"error": "Unauthorized"}))).into_response()
}

pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "pgagent",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn registry_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> axum::response::Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    match pgagent_registry::get_registry(&state.registry_path, &state.discoverable_names) {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({"error": e.to_string()}))).into_response(),
    }
}

#[derive(Deserialize)]
pub struct ExploreQuery {
    sub: Option<String>,
}

pub async fn explore_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AxumPath(tool): AxumPath<String>,
    Query(query): Query<ExploreQuery>,
) -> axum::response::Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    if !state.allowlist.is_tool_allowed(&tool) {
        return (StatusCode::FORBIDDEN, Json(serde_json::json!({"error": "tool not allowed"}))).into_response();
    }

    let snapshot = match pgagent_registry::get_registry(&state.registry_path, &state.discoverable_names) {
        Ok(s) => s,
        Err(e) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({"error": e.to_string()}))).into_response()
        }
    };

    let help_cmd = pgagent_registry::help_invocation(&tool, query.sub.as_deref());
    let result = state.executor.run(&help_cmd, &snapshot.binaries).await;

    if result.exit_code != 0 {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": format!("could not run {help_cmd}"), "details": result.stderr})),
        )
            .into_response();
    }

    let blueprint = pgagent_registry::parse_help_text(&result.stdout, &tool, query.sub.as_deref());
    Json(blueprint).into_response()
}

#[derive(Deserialize)]
pub struct ExecRequest {
    command: Option<String>,
    #[serde(default)]
    dry_run: bool,
}

pub async fn exec_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ExecRequest>,
) -> axum::response::Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    let Some(command) = body.command.filter(|c| !c.is_empty()) else {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": "Missing 'command'"}))).into_response();
    };

    if body.dry_run {
        return match pgagent_security::admit(&state.allowlist, &command) {
            Ok(()) => Json(serde_json::json!({"command": command, "would_execute": true})).into_response(),
            Err(pgagent_core::Error::NotAllowed(tool)) => (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({"error": format!("tool '{tool}' not allowed")})),
            )
                .into_response(),
            Err(pgagent_core::Error::Unsafe(reason)) => {
                (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": reason}))).into_response()
            }
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({"error": e.to_string()}))).into_response(),
        };
    }

    let snapshot = match pgagent_registry::get_registry(&state.registry_path, &state.discoverable_names) {
        Ok(s) => s,
        Err(e) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({"error": e.to_string()}))).into_response()
        }
    };

    let result = state.executor.run(&command, &snapshot.binaries).await;
    Json(result).into_response()
}

#[derive(Deserialize)]
pub struct AuditQuery {
    limit: Option<u32>,
}

pub async fn audit_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AuditQuery>,
) -> axum::response::Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    let limit = query.limit.unwrap_or(10);
    Json(state.audit.last(limit)).into_response()
}

#[derive(Deserialize)]
pub struct PlanExecRequest {
    question: Option<String>,
    #[serde(default = "default_mode")]
    mode: String,
    #[serde(default)]
    rag_context: String,
}

fn default_mode() -> String {
    "readonly".to_string()
}

pub async fn plan_exec_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<PlanExecRequest>,
) -> axum::response::Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    let Some(question) = body.question.filter(|q| !q.is_empty()) else {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": "Missing 'question'"}))).into_response();
    };

    let snapshot = match pgagent_registry::get_registry(&state.registry_path, &state.discoverable_names) {
        Ok(s) => s,
        Err(e) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({"error": e.to_string()}))).into_response()
        }
    };

    if snapshot.has_conflicts {
        tracing::warn!("version ambiguity detected for: {:?}", snapshot.conflicted_names());
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": "VERSION_CONFLICT",
                "message": "Multiple specialized versions detected for the same tool.",
                "details": snapshot.conflicts,
                "instruction": "Specify the version or full path explicitly in your question.",
            })),
        )
            .into_response();
    }

    let mut tools_help: BTreeMap<String, String> = BTreeMap::new();
    for tool in &snapshot.tools {
        let help_cmd = pgagent_registry::help_invocation(&tool.name, None);
        let result = state.executor.run(&help_cmd, &snapshot.binaries).await;
        let excerpt: String = if result.exit_code == 0 {
            result.stdout.chars().take(800).collect()
        } else {
            format!("{} ({})", tool.version_string, tool.description)
        };
        tools_help.insert(tool.name.clone(), excerpt);
    }

    let plan = pgagent_planner::plan(
        state.llm.as_ref(),
        state.llm_model.as_deref(),
        &question,
        &body.mode,
        "unknown",
        &snapshot.binaries,
        &tools_help,
        &body.rag_context,
        &state.allowlist,
    )
    .await;

    let exec_state =
        pgagent_orchestrator::run_plan(&plan, &snapshot.binaries, &state.allowlist, &state.executor).await;

    Json(serde_json::json!({
        "question": question,
        "plan": plan,
        "state": exec_state,
    }))
    .into_response()
}
