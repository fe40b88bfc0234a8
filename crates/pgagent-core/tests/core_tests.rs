//! Tests for pgagent-core: mode/on_error clamping, plan defaults, config parsing.

use pgagent_core::*;

#[test]
fn mode_clamp_accepts_known_values() {
    assert_eq!(Mode::clamp("readonly"), Mode::Readonly);
    assert_eq!(Mode::clamp("maintenance"), Mode::Maintenance);
    assert_eq!(Mode::clamp("change"), Mode::Change);
    assert_eq!(Mode::clamp("CHANGE"), Mode::Change);
}

#[test]
fn mode_clamp_rejects_unknown_to_readonly() {
    assert_eq!(Mode::clamp("drop-everything"), Mode::Readonly);
    assert_eq!(Mode::clamp(""), Mode::Readonly);
}

#[test]
fn on_error_defaults_to_abort() {
    assert_eq!(OnError::parse_or_default(None), OnError::Abort);
    assert_eq!(OnError::parse_or_default(Some("bogus")), OnError::Abort);
    assert_eq!(OnError::parse_or_default(Some("continue")), OnError::Continue);
}

#[test]
fn plan_error_has_zero_steps() {
    let plan = Plan::error("boom");
    assert_eq!(plan.goal, "Error: boom");
    assert_eq!(plan.max_steps, 0);
    assert!(plan.steps.is_empty());
}

#[test]
fn plan_deserializes_with_defaults() {
    let plan: Plan = serde_json::from_str(r#"{"goal": "check readiness", "steps": []}"#).unwrap();
    assert_eq!(plan.mode, Mode::Readonly);
    assert_eq!(plan.max_steps, 5);
}

#[test]
fn step_deserializes_missing_on_error_as_abort() {
    let step: Step = serde_json::from_str(
        r#"{"id": "s1", "tool": "pg_isready", "args": []}"#,
    )
    .unwrap();
    assert_eq!(step.on_error, OnError::Abort);
}

#[test]
fn app_config_default_has_mock_provider() {
    let cfg = AppConfig::default();
    assert_eq!(cfg.llm.provider, LlmProviderKind::Mock);
    assert_eq!(cfg.port, 5050);
    assert!(cfg.sandbox.enabled);
}

#[test]
fn app_config_load_falls_back_on_missing_file() {
    let cfg = AppConfig::load("/nonexistent/path/config.json");
    assert_eq!(cfg.port, 5050);
}

#[test]
fn registry_snapshot_conflicted_names() {
    let snapshot: RegistrySnapshot = serde_json::from_str(
        r#"{
            "scanned_at": "2026-01-01T00:00:00Z",
            "binaries": {},
            "tools": [],
            "has_conflicts": true,
            "conflicts": {"psql": ["/a/psql", "/b/psql"]}
        }"#,
    )
    .unwrap();
    assert_eq!(snapshot.conflicted_names(), vec!["psql".to_string()]);
}
