use super::{load_snapshot, load_snapshot_tree, SnapshotLoadError};
use rplan_core::ResourceKind;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

const SNAPSHOT_YAML: &str = r#"
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
regular_files:
  - id: 1
    path: /dev/null
"#;

#[test]
fn loads_yaml_snapshot_by_extension() {
    let path = write_temp_file("snapshot-yaml", "yaml", SNAPSHOT_YAML);
    let snapshot = load_snapshot(path.as_path()).expect("snapshot must load");
    assert_eq!(snapshot.processes.len(), 2);
    assert_eq!(snapshot.regular_files[0].path, "/dev/null");
}

#[test]
fn unknown_extension_falls_back_to_json() {
    let path = write_temp_file(
        "snapshot-fallback",
        "snap",
        r#"{"processes":[{"pid":1,"ppid":0,"pgid":1,"sid":1}]}"#,
    );
    let tree = load_snapshot_tree(path.as_path()).expect("tree must build");
    assert!(tree.process(1).is_ok());
}

#[test]
fn builds_tree_with_shared_file() {
    let path = write_temp_file("snapshot-tree", "yml", SNAPSHOT_YAML);
    let tree = load_snapshot_tree(path.as_path()).expect("tree must build");
    let file = tree
        .resources()
        .iter()
        .find(|resource| resource.kind() == ResourceKind::RegularFile)
        .expect("file resource");
    assert_eq!(tree.holders(file.id), vec![1, 2]);
}

#[test]
fn json_decode_error_names_the_file() {
    let path = write_temp_file("snapshot-broken", "json", "{\"processes\": [");
    let error = load_snapshot(path.as_path()).expect_err("broken json");
    match error {
        SnapshotLoadError::Parse { path: reported, reason } => {
            assert_eq!(reported, path.display().to_string());
            assert!(reason.starts_with("json decode error"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_snapshot_reports_issues() {
    let path = write_temp_file(
        "snapshot-invalid",
        "yaml",
        r#"
processes:
  - pid: 1
    ppid: 0
    pgid: 1
    sid: 1
    fds:
      3: { type: pipe_read, pipe_id: 9 }
"#,
    );
    let error = load_snapshot_tree(path.as_path()).expect_err("dangling fd target");
    match &error {
        SnapshotLoadError::Invalid { issues, .. } => {
            assert!(issues
                .iter()
                .any(|issue| issue.reference.as_deref() == Some("snapshot.fd.target_exists")));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(error.to_string().contains("is invalid"));
}

#[test]
fn missing_file_is_read_error() {
    let error = load_snapshot(std::path::Path::new("/nonexistent/snapshot.yaml"))
        .expect_err("missing file");
    assert!(matches!(error, SnapshotLoadError::ReadFile { .. }));
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
