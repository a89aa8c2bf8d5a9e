use super::model::{InterpreterError, ModelInterpreter};
use crate::actions::Action;
use rplan_core::{Handle, Pid, ProcessTree, ResourceId};
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanValidationError {
    #[error("action {index} failed to replay: {source}")]
    Replay {
        index: usize,
        source: InterpreterError,
    },
    #[error("process {pid} ends with wrong holdings (missing {missing:?}, unexpected {unexpected:?})")]
    HoldingsMismatch {
        pid: Pid,
        missing: Vec<(ResourceId, Handle)>,
        unexpected: Vec<(ResourceId, Handle)>,
    },
    #[error("process {0} is never forked")]
    MissingProcess(Pid),
    #[error("process {0} is not part of the planned tree")]
    UnexpectedProcess(Pid),
}

/// Replays `actions` from scratch and checks that every process ends up
/// holding exactly its final pairs.
pub fn validate_plan(tree: &ProcessTree, actions: &[Action]) -> Result<(), PlanValidationError> {
    let mut model = ModelInterpreter::new(tree.resources());
    for (index, action) in actions.iter().enumerate() {
        model
            .execute(action)
            .map_err(|source| PlanValidationError::Replay { index, source })?;
    }
    check_final_holdings(tree, &model)
}

/// Same as `validate_plan` for untyped action records read from a plan file.
pub fn validate_plan_values(tree: &ProcessTree, records: &[Value]) -> Result<Vec<Action>, PlanValidationError> {
    let mut model = ModelInterpreter::new(tree.resources());
    let mut actions = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let action = model
            .execute_value(record)
            .map_err(|source| PlanValidationError::Replay { index, source })?;
        actions.push(action);
    }
    check_final_holdings(tree, &model)?;
    Ok(actions)
}

fn check_final_holdings(tree: &ProcessTree, model: &ModelInterpreter<'_>) -> Result<(), PlanValidationError> {
    for process in tree.processes() {
        let Some(held) = model.holdings(process.pid()) else {
            return Err(PlanValidationError::MissingProcess(process.pid()));
        };
        let expected = process.final_pairs().into_iter().collect::<BTreeSet<_>>();
        if *held != expected {
            return Err(PlanValidationError::HoldingsMismatch {
                pid: process.pid(),
                missing: expected.difference(held).copied().collect(),
                unexpected: held.difference(&expected).copied().collect(),
            });
        }
    }
    if let Some(pid) = model
        .processes()
        .keys()
        .find(|pid| tree.process(**pid).is_err())
    {
        return Err(PlanValidationError::UnexpectedProcess(*pid));
    }
    Ok(())
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
