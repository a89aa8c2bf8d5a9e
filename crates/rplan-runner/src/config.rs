use crate::cli::OutputFormat;
use rplan_core::{FieldPath, StructuredIssue};
use rplan_engine::PlannerOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const RUNNER_CONFIG_SCHEMA_0_0_1: &str = "rplan-runner/0.0.1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    #[serde(default = "default_runner_schema")]
    pub schema: String,
    #[serde(default)]
    pub planner: PlannerOptions,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            schema: default_runner_schema(),
            planner: PlannerOptions::default(),
            output: OutputConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: Option<OutputFormat>,
    #[serde(default)]
    pub buckets: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerConfigError {
    #[error("read runner config failed `{path}`: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("runner config parse failed: {0}")]
    Parse(String),
    #[error("runner config validation failed: {}", render_issues(.0))]
    Validation(Vec<StructuredIssue>),
}

pub fn load_runner_config(path: &Path) -> Result<RunnerConfig, RunnerConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| RunnerConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    let expanded = expand_env_placeholders(raw.as_str()).map_err(RunnerConfigError::Parse)?;
    let config: RunnerConfig = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(expanded.as_str()).map_err(|error| {
            RunnerConfigError::Parse(format!("json decode error: {error}"))
        })?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(expanded.as_str()).map_err(|error| {
            RunnerConfigError::Parse(format!("yaml decode error: {error}"))
        })?,
        _ => serde_yaml::from_str(expanded.as_str())
            .or_else(|_| serde_json::from_str(expanded.as_str()))
            .map_err(|error| RunnerConfigError::Parse(error.to_string()))?,
    };

    let mut issues = validate_runner_config(&config);
    StructuredIssue::sort_stable(&mut issues);
    if !issues.is_empty() {
        return Err(RunnerConfigError::Validation(issues));
    }
    Ok(config)
}

pub fn validate_runner_config(config: &RunnerConfig) -> Vec<StructuredIssue> {
    let mut issues = Vec::<StructuredIssue>::new();
    if config.schema != RUNNER_CONFIG_SCHEMA_0_0_1 {
        issues.push(config_issue(
            "runner.config.schema",
            FieldPath::root().key("schema"),
            format!(
                "unsupported runner config schema `{}` (expected `{}`)",
                config.schema, RUNNER_CONFIG_SCHEMA_0_0_1
            ),
        ));
    }
    let planner = &config.planner;
    if planner.validate && !planner.shrink && planner.skip_kinds.is_empty() {
        issues.push(config_issue(
            "runner.config.planner.validate_requires_shrink",
            FieldPath::root().key("planner").key("validate"),
            "an unshrunk plan repeats inherited pairs and cannot be validated; set `shrink: true` or `validate: false`",
        ));
    }
    issues
}

fn config_issue(reference: &str, path: FieldPath, message: impl Into<String>) -> StructuredIssue {
    StructuredIssue::error("runner_config_error", path, message, reference)
}

fn render_issues(issues: &[StructuredIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn default_runner_schema() -> String {
    RUNNER_CONFIG_SCHEMA_0_0_1.to_string()
}

/// Substitutes `${NAME}` with the environment value of `NAME`, or with
/// `fallback` for `${NAME:-fallback}` when `NAME` is unset.
fn expand_env_placeholders(input: &str) -> Result<String, String> {
    let mut expanded = String::with_capacity(input.len());
    let mut rest = input;
    while let Some((literal, tail)) = rest.split_once("${") {
        expanded.push_str(literal);
        let Some((body, after)) = tail.split_once('}') else {
            return Err("placeholder `${` is never closed".to_string());
        };
        let (name, fallback) = match body.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (body, None),
        };
        if name.is_empty() {
            return Err(format!("placeholder `${{{body}}}` names no variable"));
        }
        match (std::env::var(name), fallback) {
            (Ok(value), _) => expanded.push_str(&value),
            (Err(_), Some(fallback)) => expanded.push_str(fallback),
            (Err(error), None) => return Err(format!("placeholder `{name}`: {error}")),
        }
        rest = after;
    }
    expanded.push_str(rest);
    Ok(expanded)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
