use super::model::{InterpreterError, ModelInterpreter};
use crate::actions::Action;
use rplan_core::ProcessTree;
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShrinkOutcome {
    pub actions: Vec<Action>,
    pub dropped_shares: usize,
    pub synthesized_removes: usize,
}

/// Replays `order` and adapts it to fork inheritance: shares the child
/// already inherited are dropped, and pairs a child inherited but does not
/// hold in `tree` are removed right after its fork.
pub fn shrink_with_inheritance(tree: &ProcessTree, order: &[Action]) -> Result<ShrinkOutcome, InterpreterError> {
    let mut model = ModelInterpreter::new(tree.resources());
    let mut outcome = ShrinkOutcome {
        actions: Vec::with_capacity(order.len()),
        dropped_shares: 0,
        synthesized_removes: 0,
    };

    for action in order {
        match model.execute(action) {
            Ok(()) => outcome.actions.push(action.clone()),
            Err(InterpreterError::ResourceAlreadyExistsOnShare { .. })
                if matches!(action, Action::Share { .. }) =>
            {
                debug!(%action, "dropping share already delivered by fork");
                outcome.dropped_shares += 1;
                continue;
            }
            Err(error) => return Err(error),
        }

        let Action::Fork { child, .. } = action else {
            continue;
        };
        let planned = tree
            .process(*child)
            .map(|process| process.pairs().into_iter().collect::<BTreeSet<_>>())
            .unwrap_or_default();
        let unwanted = model
            .holdings(*child)
            .map(|held| held.difference(&planned).copied().collect::<Vec<_>>())
            .unwrap_or_default();
        for (resource, handle) in unwanted {
            let remove = Action::Remove {
                process: *child,
                resource,
                handle,
            };
            debug!(action = %remove, "removing pair inherited against plan");
            model.execute(&remove)?;
            outcome.actions.push(remove);
            outcome.synthesized_removes += 1;
        }
    }

    debug!(
        dropped_shares = outcome.dropped_shares,
        synthesized_removes = outcome.synthesized_removes,
        "plan shrunk"
    );
    Ok(outcome)
}

#[cfg(test)]
#[path = "shrink_test.rs"]
mod tests;
