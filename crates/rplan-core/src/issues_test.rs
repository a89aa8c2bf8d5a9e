use super::{IssueSeverity, StructuredIssue};
use crate::FieldPath;

#[test]
fn issues_are_sorted_by_severity_then_kind() {
    let mut issues = vec![
        StructuredIssue {
            kind: "snapshot_reference".to_string(),
            severity: IssueSeverity::Warning,
            pid: None,
            field_path: FieldPath::root().key("pipes"),
            message: "second".to_string(),
            reference: None,
        },
        StructuredIssue::error(
            "snapshot_structure",
            FieldPath::root().key("processes").index(0),
            "first",
            "snapshot.process.duplicate_pid",
        )
        .with_pid(7),
    ];

    StructuredIssue::sort_stable(&mut issues);

    assert_eq!(issues[0].severity, IssueSeverity::Error);
    assert_eq!(issues[0].pid, Some(7));
    assert_eq!(issues[1].severity, IssueSeverity::Warning);
}

#[test]
fn display_includes_path_and_kind() {
    let issue = StructuredIssue::error(
        "snapshot_structure",
        FieldPath::root().key("processes"),
        "snapshot has no processes",
        "snapshot.processes.non_empty",
    );
    assert_eq!(
        issue.to_string(),
        "$.processes: snapshot has no processes (snapshot_structure)"
    );
}
