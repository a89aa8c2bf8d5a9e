use super::{load_runner_config, validate_runner_config, RunnerConfig, RunnerConfigError};
use crate::cli::OutputFormat;
use rplan_core::ResourceKind;
use rplan_engine::PlanOrder;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

#[test]
fn load_runner_config_parses_yaml_planner_and_output() {
    let path = write_temp_file(
        "runner-config-ok",
        "yaml",
        r#"
schema: rplan-runner/0.0.1
planner:
  order: dfs
  shrink: true
  validate: true
output:
  format: json
  buckets: true
"#,
    );

    let config = load_runner_config(path.as_path()).expect("config must load");
    assert_eq!(config.planner.order, PlanOrder::Dfs);
    assert!(config.planner.shrink);
    assert_eq!(config.output.format, Some(OutputFormat::Json));
    assert!(config.output.buckets);
}

#[test]
fn load_runner_config_accepts_json_and_defaults_missing_sections() {
    let path = write_temp_file(
        "runner-config-json",
        "json",
        r#"{"schema":"rplan-runner/0.0.1","planner":{"skip_kinds":["vma"],"validate":false}}"#,
    );

    let config = load_runner_config(path.as_path()).expect("json config must load");
    assert_eq!(config.planner.order, PlanOrder::Depth);
    assert!(config.planner.skip_kinds.contains(&ResourceKind::Vma));
    assert!(!config.planner.validate);
    assert_eq!(config.output.format, None);
}

#[test]
fn load_runner_config_expands_env_placeholders() {
    std::env::set_var("RPLAN_RUNNER_TEST_ORDER", "dfs");
    let path = write_temp_file(
        "runner-config-env",
        "yaml",
        "schema: rplan-runner/0.0.1\nplanner:\n  order: ${RPLAN_RUNNER_TEST_ORDER}\n",
    );

    let config = load_runner_config(path.as_path()).expect("config must load");
    assert_eq!(config.planner.order, PlanOrder::Dfs);
}

#[test]
fn load_runner_config_reports_missing_env_var() {
    let path = write_temp_file(
        "runner-config-env-missing",
        "yaml",
        "schema: ${RPLAN_RUNNER_TEST_UNSET_VARIABLE}\n",
    );

    let error = load_runner_config(path.as_path()).expect_err("missing env must fail");
    match error {
        RunnerConfigError::Parse(message) => {
            assert!(message.contains("RPLAN_RUNNER_TEST_UNSET_VARIABLE"))
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn load_runner_config_uses_placeholder_fallback() {
    let path = write_temp_file(
        "runner-config-env-fallback",
        "yaml",
        "schema: rplan-runner/0.0.1\nplanner:\n  order: ${RPLAN_RUNNER_TEST_UNSET_ORDER:-dfs}\n",
    );

    let config = load_runner_config(path.as_path()).expect("config must load");
    assert_eq!(config.planner.order, PlanOrder::Dfs);
}

#[test]
fn load_runner_config_rejects_malformed_placeholders() {
    for (prefix, content) in [
        ("runner-config-env-open", "schema: ${RPLAN_RUNNER_TEST_ORDER\n"),
        ("runner-config-env-empty", "schema: ${}\n"),
        ("runner-config-env-nameless", "schema: ${:-rplan-runner/0.0.1}\n"),
    ] {
        let path = write_temp_file(prefix, "yaml", content);
        assert!(
            matches!(load_runner_config(path.as_path()), Err(RunnerConfigError::Parse(_))),
            "{content:?} must not load"
        );
    }
}

#[test]
fn load_runner_config_rejects_wrong_schema_with_issue() {
    let path = write_temp_file("runner-config-schema", "yaml", "schema: rplan-runner/9.9.9\n");

    let error = load_runner_config(path.as_path()).expect_err("schema must be rejected");
    match error {
        RunnerConfigError::Validation(issues) => {
            assert_eq!(issues.len(), 1);
            assert_eq!(issues[0].reference.as_deref(), Some("runner.config.schema"));
            assert_eq!(issues[0].field_path.to_string(), "$.schema");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn load_runner_config_rejects_unknown_fields() {
    let path = write_temp_file(
        "runner-config-unknown",
        "yaml",
        "schema: rplan-runner/0.0.1\nchains: {}\n",
    );

    assert!(matches!(
        load_runner_config(path.as_path()),
        Err(RunnerConfigError::Parse(_))
    ));
}

#[test]
fn load_runner_config_rejects_unknown_planner_options() {
    let path = write_temp_file(
        "runner-config-unknown-planner",
        "yaml",
        "schema: rplan-runner/0.0.1\nplanner:\n  shrnk: false\n",
    );

    match load_runner_config(path.as_path()) {
        Err(RunnerConfigError::Parse(message)) => assert!(message.contains("shrnk")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn validate_flags_validation_without_shrinking() {
    let mut config = RunnerConfig::default();
    config.planner.shrink = false;

    let issues = validate_runner_config(&config);
    assert_eq!(issues.len(), 1);
    assert_eq!(
        issues[0].reference.as_deref(),
        Some("runner.config.planner.validate_requires_shrink")
    );

    config.planner.skip_kinds.insert(ResourceKind::Pipe);
    assert!(validate_runner_config(&config).is_empty());
}

#[test]
fn missing_file_is_read_error() {
    let error = load_runner_config(std::path::Path::new("/nonexistent/rplan-runner.yaml"))
        .expect_err("missing file");
    assert!(matches!(error, RunnerConfigError::ReadFile { .. }));
}

fn write_temp_file(prefix: &str, extension: &str, content: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time must be monotonic")
        .as_nanos();
    path.push(format!(
        "rplan-runner-{prefix}-{}-{nanos}.{extension}",
        std::process::id()
    ));
    fs::write(&path, content).expect("must write temp file");
    path
}
