use crate::cli::{OutputFormat, PlanCommand, TreeCommand, VerifyCommand};
use crate::config::{load_runner_config, RunnerConfig, RunnerConfigError};
use crate::io::{load_snapshot_tree, SnapshotLoadError};
use rplan_core::{Handle, Process, ProcessTree, ResourceId, ResourceTable};
use rplan_engine::{
    close_process_tree, create_plan_document, decode_plan_json, encode_plan_json, plan_tree,
    save_plan_to_path, validate_plan_values, Action, PlanError, PlanStoreError,
    PlanValidationError, PlannerOptions, RestorePlan, PLAN_SCHEMA_0_0_1,
};
use serde_json::{json, Value};
use std::fmt::Write;
use std::fs;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("read file failed `{path}`: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] RunnerConfigError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotLoadError),
    #[error("planning failed: {0}")]
    Plan(PlanError),
    #[error("precedence graph has a cycle:\n{0}")]
    Cycle(String),
    #[error("plan parse failed `{path}`: {reason}")]
    PlanParse { path: String, reason: String },
    #[error("plan `{path}` has unsupported schema `{schema}` (expected `{expected}`)")]
    PlanSchema {
        path: String,
        schema: String,
        expected: &'static str,
    },
    #[error("plan `{path}` does not match this snapshot: {reason}")]
    PlanMismatch { path: String, reason: String },
    #[error("plan `{path}` fingerprint does not match its actions")]
    FingerprintMismatch { path: String },
    #[error("plan failed verification: {0}")]
    Verify(#[from] PlanValidationError),
    #[error("write plan failed `{path}`: {source}")]
    WritePlan {
        path: String,
        #[source]
        source: PlanStoreError,
    },
    #[error("json encode failed: {0}")]
    JsonEncode(#[from] serde_json::Error),
}

pub fn execute_plan(command: &PlanCommand) -> Result<String, RunnerError> {
    let config = match &command.config {
        Some(path) => load_runner_config(path)?,
        None => RunnerConfig::default(),
    };
    let options = planner_options(command, &config);
    let format = command
        .format
        .or(config.output.format)
        .unwrap_or(OutputFormat::Text);
    let include_buckets = command.buckets || config.output.buckets;
    debug!(?options, ?format, include_buckets, "planning snapshot");

    let mut tree = load_snapshot_tree(command.snapshot.as_path())?;
    let plan = plan_tree(&mut tree, &options).map_err(|error| match error {
        PlanError::NotAcyclic { cycle } => RunnerError::Cycle(render_cycle(tree.resources(), &cycle)),
        other => RunnerError::Plan(other),
    })?;

    if let Some(path) = &command.output {
        let document = create_plan_document(tree.resources(), &plan, include_buckets)?;
        save_plan_to_path(path, &document).map_err(|source| RunnerError::WritePlan {
            path: path.display().to_string(),
            source,
        })?;
    }

    match format {
        OutputFormat::Text => Ok(render_plan_text(tree.resources(), &plan, include_buckets)),
        OutputFormat::Json => {
            let document = create_plan_document(tree.resources(), &plan, include_buckets)?;
            Ok(encode_plan_json(&document)?)
        }
    }
}

pub fn execute_verify(command: &VerifyCommand) -> Result<String, RunnerError> {
    let tree = load_snapshot_tree(command.snapshot.as_path())?;
    let plan_path = command.plan.display().to_string();
    let text = fs::read_to_string(&command.plan).map_err(|source| RunnerError::ReadFile {
        path: plan_path.clone(),
        source,
    })?;
    let raw: Value = serde_json::from_str(text.as_str()).map_err(|error| RunnerError::PlanParse {
        path: plan_path.clone(),
        reason: error.to_string(),
    })?;
    let schema = raw.get("schema").and_then(Value::as_str).unwrap_or_default();
    if schema != PLAN_SCHEMA_0_0_1 {
        return Err(RunnerError::PlanSchema {
            path: plan_path,
            schema: schema.to_string(),
            expected: PLAN_SCHEMA_0_0_1,
        });
    }
    let Some(records) = raw.get("actions").and_then(Value::as_array) else {
        return Err(RunnerError::PlanParse {
            path: plan_path,
            reason: "`actions` must be an array".to_string(),
        });
    };
    check_plan_resources(&plan_path, &raw, tree.resources())?;

    // Raw records first, so an unknown action type surfaces as a replay error.
    let actions = validate_plan_values(&tree, records)?;
    let document = decode_plan_json(text.as_str()).map_err(|error| RunnerError::PlanParse {
        path: plan_path.clone(),
        reason: error.to_string(),
    })?;
    if !document.fingerprint_matches()? {
        return Err(RunnerError::FingerprintMismatch { path: plan_path });
    }

    match command.format {
        OutputFormat::Text => Ok(format!(
            "plan ok: {} actions replayed, {} processes reach their final holdings",
            actions.len(),
            tree.len()
        )),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
            "ok": true,
            "actions": actions.len(),
            "processes": tree.len(),
            "fingerprint": document.fingerprint,
        }))?),
    }
}

pub fn execute_tree(command: &TreeCommand) -> Result<String, RunnerError> {
    let mut tree = load_snapshot_tree(command.snapshot.as_path())?;
    let report = close_process_tree(&mut tree).map_err(RunnerError::Plan)?;
    match command.format {
        OutputFormat::Text => {
            let mut out = format!(
                "closure added {} temporary hold(s) (dependency {}, inheritance {}, multi-handle {}, sharable {})\n",
                report.total(),
                report.dependency,
                report.inheritance,
                report.multi_handle,
                report.sharable
            );
            for process in tree.processes() {
                render_process_text(&mut out, &tree, process);
            }
            Ok(out.trim_end().to_string())
        }
        OutputFormat::Json => {
            let processes = tree
                .processes()
                .map(|process| render_process_json(&tree, process))
                .collect::<Vec<_>>();
            Ok(serde_json::to_string_pretty(&json!({
                "closure": report,
                "processes": processes,
            }))?)
        }
    }
}

fn planner_options(command: &PlanCommand, config: &RunnerConfig) -> PlannerOptions {
    let mut options = config.planner.clone();
    if let Some(order) = command.order {
        options.order = order.into();
    }
    if command.no_shrink {
        options.shrink = false;
        options.validate = false;
    }
    if command.no_validate {
        options.validate = false;
    }
    options.skip_kinds.extend(command.skip.iter().copied());
    options
}

fn check_plan_resources(path: &str, raw: &Value, resources: &ResourceTable) -> Result<(), RunnerError> {
    let Some(entries) = raw.get("resources").and_then(Value::as_array) else {
        return Ok(());
    };
    if entries.len() != resources.len() {
        return Err(RunnerError::PlanMismatch {
            path: path.to_string(),
            reason: format!(
                "plan lists {} resources, snapshot yields {}",
                entries.len(),
                resources.len()
            ),
        });
    }
    for (entry, resource) in entries.iter().zip(resources.iter()) {
        let label = entry.get("label").and_then(Value::as_str);
        if label != Some(resource.label().as_str()) {
            return Err(RunnerError::PlanMismatch {
                path: path.to_string(),
                reason: format!("resource {} is `{}` in the snapshot", resource.id, resource.label()),
            });
        }
    }
    Ok(())
}

fn render_plan_text(resources: &ResourceTable, plan: &RestorePlan, include_buckets: bool) -> String {
    let mut out = format!(
        "plan: {} actions, {} buckets, {} temporary holds, {} shares dropped, {} removes synthesized\n",
        plan.actions.len(),
        plan.stats.buckets,
        plan.stats.temporary_holds,
        plan.stats.dropped_shares,
        plan.stats.synthesized_removes
    );
    if include_buckets {
        for (depth, bucket) in plan.buckets.iter().enumerate() {
            let _ = writeln!(out, "depth {depth}:");
            for action in bucket {
                let _ = writeln!(out, "  {}", action.describe(resources));
            }
        }
    } else {
        for (index, action) in plan.actions.iter().enumerate() {
            let _ = writeln!(out, "{:>4}. {}", index + 1, action.describe(resources));
        }
    }
    out.trim_end().to_string()
}

fn render_cycle(resources: &ResourceTable, cycle: &[Action]) -> String {
    let mut out = String::new();
    for action in cycle {
        let _ = writeln!(out, "  -> {}", action.describe(resources));
    }
    if let Some(first) = cycle.first() {
        let _ = write!(out, "  -> {} (again)", first.describe(resources));
    }
    out
}

fn render_process_text(out: &mut String, tree: &ProcessTree, process: &Process) {
    let parent = process
        .parent()
        .map(|pid| pid.to_string())
        .unwrap_or_else(|| "-".to_string());
    let _ = writeln!(out, "pid {} (parent {parent})", process.pid());
    for (resource, handle) in process.pairs() {
        let marker = if process.is_tmp(resource, handle) { "tmp  " } else { "final" };
        let label = tree
            .resource(resource)
            .map(|entry| entry.label())
            .unwrap_or_else(|_| resource.to_string());
        let _ = writeln!(out, "  {marker} {resource} {handle} {label}");
    }
}

fn render_process_json(tree: &ProcessTree, process: &Process) -> Value {
    let pairs = |pairs: Vec<(ResourceId, Handle)>| {
        pairs
            .into_iter()
            .map(|(resource, handle)| {
                json!({
                    "resource": resource,
                    "handle": handle,
                    "label": tree.resource(resource).map(|entry| entry.label()).ok(),
                })
            })
            .collect::<Vec<_>>()
    };
    json!({
        "pid": process.pid(),
        "parent": process.parent(),
        "final": pairs(process.final_pairs()),
        "temporary": pairs(process.tmp_pairs()),
    })
}

#[cfg(test)]
#[path = "run_test.rs"]
mod tests;
