use crate::cli::{OutputFormat, PlanCommand, TreeCommand, VerifyCommand};
use crate::{execute_plan, execute_tree, execute_verify, RunnerError};
use rplan_core::ResourceKind;
use rplan_engine::{decode_plan_json, load_plan_from_path, InterpreterError, PlanValidationError};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

const PIPE_SNAPSHOT: &str = r#"
processes:
  - pid: 1
    ppid: 0
    pgid: 1
    sid: 1
    fds:
      0: { type: regular_file, file_id: 1 }
  - pid: 2
    ppid: 1
    pgid: 1
    sid: 1
    fds:
      0: { type: regular_file, file_id: 1 }
      3: { type: pipe_read, pipe_id: 7 }
  - pid: 3
    ppid: 1
    pgid: 3
    sid: 1
    fds:
      4: { type: pipe_write, pipe_id: 7 }
regular_files:
  - id: 1
    path: /dev/null
pipes:
  - id: 7
"#;

// Each member of a group whose leader is in the other's group.
const SWAPPED_GROUPS_SNAPSHOT: &str = r#"
processes:
  - { pid: 1, ppid: 0, pgid: 1, sid: 1 }
  - { pid: 2, ppid: 1, pgid: 3, sid: 1 }
  - { pid: 3, ppid: 1, pgid: 2, sid: 1 }
"#;

fn plan_command(snapshot: PathBuf) -> PlanCommand {
    PlanCommand {
        snapshot,
        config: None,
        format: None,
        order: None,
        buckets: false,
        skip: Vec::new(),
        no_shrink: false,
        no_validate: false,
        output: None,
    }
}

#[test]
fn plan_text_lists_numbered_actions() {
    let snapshot = write_temp_file("plan-text", "yaml", PIPE_SNAPSHOT);
    let output = execute_plan(&plan_command(snapshot)).expect("plan must succeed");

    assert!(output.starts_with("plan: "));
    assert!(output.contains("   1. fork 0 -> 1"));
    assert!(output.contains("create Pipe(7) in 2"));
    assert!(output.contains("RegFile(1, 'null')"));
}

#[test]
fn plan_json_is_a_plan_document_with_matching_fingerprint() {
    let snapshot = write_temp_file("plan-json", "yaml", PIPE_SNAPSHOT);
    let mut command = plan_command(snapshot);
    command.format = Some(OutputFormat::Json);

    let output = execute_plan(&command).expect("plan must succeed");
    let document = decode_plan_json(output.as_str()).expect("plan document");
    assert_eq!(document.schema, "rplan-plan/0.0.1");
    assert!(document.fingerprint_matches().expect("fingerprint"));
    assert!(document.buckets.is_none());
    assert!(document
        .resources
        .iter()
        .any(|entry| entry.kind == ResourceKind::Pipe));
}

#[test]
fn plan_buckets_group_actions_by_depth() {
    let snapshot = write_temp_file("plan-buckets", "yaml", PIPE_SNAPSHOT);
    let mut command = plan_command(snapshot);
    command.buckets = true;

    let output = execute_plan(&command).expect("plan must succeed");
    assert!(output.contains("depth 0:\n  fork 0 -> 1"));
    assert!(output.contains("depth 1:"));
}

#[test]
fn plan_config_file_supplies_format_and_flags_override_it() {
    let snapshot = write_temp_file("plan-config-snapshot", "yaml", PIPE_SNAPSHOT);
    let config = write_temp_file(
        "plan-config",
        "yaml",
        "schema: rplan-runner/0.0.1\noutput:\n  format: json\n",
    );
    let mut command = plan_command(snapshot);
    command.config = Some(config);
    let output = execute_plan(&command).expect("plan must succeed");
    assert!(serde_json::from_str::<Value>(output.as_str()).is_ok());

    command.format = Some(OutputFormat::Text);
    let output = execute_plan(&command).expect("plan must succeed");
    assert!(output.starts_with("plan: "));
}

#[test]
fn plan_skip_kind_drops_its_actions() {
    let snapshot = write_temp_file("plan-skip", "yaml", PIPE_SNAPSHOT);
    let mut command = plan_command(snapshot);
    command.skip = vec![ResourceKind::Pipe];

    let output = execute_plan(&command).expect("plan must succeed");
    assert!(!output.contains("Pipe(7)"));
    assert!(output.contains("RegFile(1, 'null')"));
}

#[test]
fn plan_output_file_verifies_against_snapshot() {
    let snapshot = write_temp_file("verify-snapshot", "yaml", PIPE_SNAPSHOT);
    let plan_path = temp_path("verify-plan", "json");
    let mut command = plan_command(snapshot.clone());
    command.output = Some(plan_path.clone());
    execute_plan(&command).expect("plan must succeed");

    let stored = load_plan_from_path(&plan_path).expect("stored plan");
    assert!(stored.fingerprint_matches().expect("fingerprint"));

    let output = execute_verify(&VerifyCommand {
        snapshot,
        plan: plan_path,
        format: OutputFormat::Text,
    })
    .expect("verify must succeed");
    assert!(output.starts_with("plan ok: "));
    assert!(output.contains("4 processes"));
}

#[test]
fn verify_rejects_truncated_plan() {
    let (snapshot, mut raw) = planned_document("verify-truncated");
    let actions = raw["actions"].as_array_mut().expect("actions");
    actions.pop();
    let plan = write_temp_file("verify-truncated-plan", "json", raw.to_string().as_str());

    let error = execute_verify(&VerifyCommand {
        snapshot,
        plan,
        format: OutputFormat::Text,
    })
    .expect_err("truncated plan must fail");
    assert!(matches!(error, RunnerError::Verify(_)));
}

#[test]
fn verify_reports_unknown_action_kind() {
    let (snapshot, mut raw) = planned_document("verify-unknown");
    let actions = raw["actions"].as_array_mut().expect("actions");
    actions.insert(0, json!({ "type": "exec", "process": 1 }));
    let plan = write_temp_file("verify-unknown-plan", "json", raw.to_string().as_str());

    let error = execute_verify(&VerifyCommand {
        snapshot,
        plan,
        format: OutputFormat::Json,
    })
    .expect_err("unknown action must fail");
    match error {
        RunnerError::Verify(PlanValidationError::Replay { index, source }) => {
            assert_eq!(index, 0);
            assert_eq!(source, InterpreterError::UnknownActionKind("exec".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn verify_detects_stale_fingerprint() {
    let (snapshot, mut raw) = planned_document("verify-fingerprint");
    raw["fingerprint"] = json!("00");
    let plan = write_temp_file("verify-fingerprint-plan", "json", raw.to_string().as_str());

    let error = execute_verify(&VerifyCommand {
        snapshot,
        plan,
        format: OutputFormat::Text,
    })
    .expect_err("stale fingerprint must fail");
    assert!(matches!(error, RunnerError::FingerprintMismatch { .. }));
}

#[test]
fn verify_rejects_plan_for_another_snapshot() {
    let (_, raw) = planned_document("verify-other");
    let other = write_temp_file(
        "verify-other-snapshot",
        "yaml",
        "processes:\n  - { pid: 1, ppid: 0, pgid: 1, sid: 1 }\n",
    );
    let plan = write_temp_file("verify-other-plan", "json", raw.to_string().as_str());

    let error = execute_verify(&VerifyCommand {
        snapshot: other,
        plan,
        format: OutputFormat::Text,
    })
    .expect_err("foreign plan must fail");
    assert!(matches!(error, RunnerError::PlanMismatch { .. }));
}

#[test]
fn swapped_groups_report_the_cycle() {
    let snapshot = write_temp_file("plan-cycle", "yaml", SWAPPED_GROUPS_SNAPSHOT);
    let error = execute_plan(&plan_command(snapshot)).expect_err("cycle must fail");

    let message = error.to_string();
    assert!(matches!(error, RunnerError::Cycle(_)));
    assert!(message.starts_with("precedence graph has a cycle:"));
    assert!(message.contains("Group("));
    assert!(message.ends_with("(again)"));
}

#[test]
fn tree_text_marks_temporary_holds() {
    let snapshot = write_temp_file("tree-text", "yaml", PIPE_SNAPSHOT);
    let output = execute_tree(&TreeCommand {
        snapshot,
        format: OutputFormat::Text,
    })
    .expect("tree must succeed");

    assert!(output.starts_with("closure added "));
    assert!(output.contains("pid 2 (parent 1)"));
    assert!(output.contains("tmp   "));
    assert!(output.contains("final "));
}

#[test]
fn tree_json_lists_every_process() {
    let snapshot = write_temp_file("tree-json", "yaml", PIPE_SNAPSHOT);
    let output = execute_tree(&TreeCommand {
        snapshot,
        format: OutputFormat::Json,
    })
    .expect("tree must succeed");

    let parsed: Value = serde_json::from_str(output.as_str()).expect("json");
    let processes = parsed["processes"].as_array().expect("processes");
    assert_eq!(processes.len(), 4);
    let pipe_creator = processes
        .iter()
        .find(|process| process["pid"] == json!(2))
        .expect("pid 2");
    assert_eq!(pipe_creator["temporary"].as_array().map(Vec::len), Some(1));
    assert!(parsed["closure"]["sharable"].as_u64().is_some());
}

#[test]
fn missing_snapshot_is_reported() {
    let error = execute_plan(&plan_command(PathBuf::from("/nonexistent/snapshot.yaml")))
        .expect_err("missing snapshot");
    assert!(matches!(error, RunnerError::Snapshot(_)));
}

fn planned_document(prefix: &str) -> (PathBuf, Value) {
    let snapshot = write_temp_file(prefix, "yaml", PIPE_SNAPSHOT);
    let mut command = plan_command(snapshot.clone());
    command.format = Some(OutputFormat::Json);
    let output = execute_plan(&command).expect("plan must succeed");
    let raw = serde_json::from_str::<Value>(output.as_str()).expect("json");
    (snapshot, raw)
}

fn temp_path(prefix: &str, extension: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time must be monotonic")
        .as_nanos();
    path.push(format!(
        "rplan-runner-{prefix}-{}-{nanos}.{extension}",
        std::process::id()
    ));
    path
}

fn write_temp_file(prefix: &str, extension: &str, content: &str) -> PathBuf {
    let path = temp_path(prefix, extension);
    fs::write(&path, content).expect("must write temp file");
    path
}
