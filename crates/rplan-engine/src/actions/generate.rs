use super::types::Action;
use crate::creators::{creator_handles, get_creator};
use crate::error::PlanError;
use rplan_core::ProcessTree;
use tracing::debug;

/// Emits every vertex of the precedence graph for a closed tree: forks, one
/// create per resource, shares for sharable resources and one remove per
/// temporary hold.
pub fn generate_actions(tree: &ProcessTree) -> Result<Vec<Action>, PlanError> {
    let mut actions = Vec::new();

    for process in tree.processes() {
        if let Some(parent) = process.parent() {
            actions.push(Action::Fork {
                parent,
                child: process.pid(),
            });
        }
    }
    let forks = actions.len();

    for resource in tree.resources().iter() {
        let creator = get_creator(tree, resource.id)?;
        let handles = creator_handles(tree, resource.id, creator)?;
        actions.push(Action::Create {
            process: creator,
            resource: resource.id,
            handles: handles.clone(),
        });

        if !resource.is_sharable() {
            continue;
        }
        for holder in tree.holders(resource.id) {
            for handle in tree.process(holder)?.handles(resource.id) {
                if holder == creator && handles.contains(&handle) {
                    continue;
                }
                let Some(handle_from) = handles
                    .iter()
                    .find(|candidate| candidate.kind() == handle.kind())
                    .copied()
                else {
                    return Err(PlanError::InsufficientHandlesForCreate {
                        process: creator,
                        resource: resource.id,
                        missing: handle.kind(),
                    });
                };
                actions.push(Action::Share {
                    process_from: creator,
                    process_to: holder,
                    resource: resource.id,
                    handle_from,
                    handle_to: handle,
                });
            }
        }
    }
    let creates_and_shares = actions.len() - forks;

    for process in tree.processes() {
        for (resource, handle) in process.tmp_pairs() {
            actions.push(Action::Remove {
                process: process.pid(),
                resource,
                handle,
            });
        }
    }

    debug!(
        forks,
        creates_and_shares,
        removes = actions.len() - forks - creates_and_shares,
        "generated actions"
    );
    Ok(actions)
}

#[cfg(test)]
#[path = "generate_test.rs"]
mod tests;
