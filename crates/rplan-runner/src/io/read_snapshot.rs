use rplan_core::{build_process_tree, ProcessTree, Snapshot, SnapshotError, StructuredIssue, TreeError};
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotLoadError {
    #[error("read snapshot failed `{path}`: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot parse failed `{path}`: {reason}")]
    Parse { path: String, reason: String },
    #[error("snapshot `{path}` is invalid: {}", render_issues(.issues))]
    Invalid {
        path: String,
        issues: Vec<StructuredIssue>,
    },
    #[error("snapshot `{path}` does not form a process tree: {source}")]
    Tree {
        path: String,
        #[source]
        source: TreeError,
    },
}

/// Reads a snapshot file. `.json` and `.yaml`/`.yml` pick the decoder,
/// anything else tries YAML then JSON.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, SnapshotLoadError> {
    let text = fs::read_to_string(path).map_err(|source| SnapshotLoadError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    let parse_error = |reason: String| SnapshotLoadError::Parse {
        path: path.display().to_string(),
        reason,
    };
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(text.as_str())
            .map_err(|error| parse_error(format!("json decode error: {error}"))),
        Some("yaml") | Some("yml") => serde_yaml::from_str(text.as_str())
            .map_err(|error| parse_error(format!("yaml decode error: {error}"))),
        _ => serde_yaml::from_str(text.as_str())
            .or_else(|_| serde_json::from_str(text.as_str()))
            .map_err(|error| parse_error(error.to_string())),
    }
}

pub fn load_snapshot_tree(path: &Path) -> Result<ProcessTree, SnapshotLoadError> {
    let snapshot = load_snapshot(path)?;
    build_process_tree(&snapshot).map_err(|error| {
        let path = path.display().to_string();
        match error {
            SnapshotError::Invalid(issues) => SnapshotLoadError::Invalid { path, issues },
            SnapshotError::Tree(source) => SnapshotLoadError::Tree { path, source },
        }
    })
}

fn render_issues(issues: &[StructuredIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
#[path = "read_snapshot_test.rs"]
mod tests;
