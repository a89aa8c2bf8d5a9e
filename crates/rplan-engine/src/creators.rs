use crate::error::PlanError;
use rplan_core::{Handle, Pid, ProcessTree, ResourceId};

/// Picks the single process that creates `resource` in the current tree.
pub fn get_creator(tree: &ProcessTree, resource: ResourceId) -> Result<Pid, PlanError> {
    let entry = tree.resource(resource)?;
    let holders = tree.holders(resource);
    if holders.is_empty() {
        return Err(PlanError::OrphanResource { resource });
    }
    let candidates = entry.possible_creators(tree.pids());
    if candidates.is_empty() {
        return Err(PlanError::ImpossibleToCreate { resource });
    }

    if entry.is_sharable() {
        let creator = holders
            .iter()
            .filter(|pid| candidates.contains(pid))
            .min()
            .or_else(|| candidates.iter().min())
            .copied()
            .ok_or(PlanError::ImpossibleToCreate { resource })?;
        return Ok(creator);
    }

    if entry.is_inherited() {
        if entry.handle_kinds().len() > 1 {
            return Err(PlanError::MultiHandleInheritanceUnsupported { resource });
        }
        let roots = tree.forest_roots(&holders);
        let Some((first, rest)) = roots.split_first() else {
            return Err(PlanError::OrphanResource { resource });
        };
        let mut lca = *first;
        for root in rest {
            lca = tree.lca(lca, *root)?;
        }
        let mut current = Some(lca);
        while let Some(pid) = current {
            if entry.is_possible_creator(pid) {
                return Ok(pid);
            }
            current = tree.parent(pid);
        }
        return Err(PlanError::ImpossibleToCreate { resource });
    }

    match holders.as_slice() {
        [only] => Ok(*only),
        _ => Err(PlanError::PrivateResourceHolders { resource, holders }),
    }
}

/// The creator's first handle of each kind the resource needs, in the
/// resource's handle-kind order.
pub fn creator_handles(
    tree: &ProcessTree,
    resource: ResourceId,
    creator: Pid,
) -> Result<Vec<Handle>, PlanError> {
    let entry = tree.resource(resource)?;
    let process = tree.process(creator)?;
    entry
        .handle_kinds()
        .iter()
        .map(|kind| {
            process
                .handles_of_kind(resource, *kind)
                .first()
                .copied()
                .ok_or(PlanError::InsufficientHandlesForCreate {
                    process: creator,
                    resource,
                    missing: *kind,
                })
        })
        .collect()
}

#[cfg(test)]
#[path = "creators_test.rs"]
mod tests;
