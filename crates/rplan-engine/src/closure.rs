use crate::creators::get_creator;
use crate::error::PlanError;
use rplan_core::{ProcessTree, ResourceId};
use serde::Serialize;
use tracing::{debug, instrument};

/// Temporary holds added by each closure pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClosureReport {
    pub dependency: usize,
    pub inheritance: usize,
    pub multi_handle: usize,
    pub sharable: usize,
}

impl ClosureReport {
    pub fn total(&self) -> usize {
        self.dependency + self.inheritance + self.multi_handle + self.sharable
    }
}

/// Adds the temporary holds that give every resource a realizable creation
/// path. Running it on a closed tree adds nothing.
#[instrument(skip_all, fields(processes = tree.len(), resources = tree.resources().len()))]
pub fn close_process_tree(tree: &mut ProcessTree) -> Result<ClosureReport, PlanError> {
    let report = ClosureReport {
        dependency: close_dependencies(tree)?,
        inheritance: close_inheritance(tree)?,
        multi_handle: close_multi_handle(tree)?,
        sharable: close_sharable_creators(tree)?,
    };
    debug!(
        dependency = report.dependency,
        inheritance = report.inheritance,
        multi_handle = report.multi_handle,
        sharable = report.sharable,
        "closure complete"
    );
    Ok(report)
}

fn close_dependencies(tree: &mut ProcessTree) -> Result<usize, PlanError> {
    let dependents = tree
        .resources()
        .iter()
        .filter(|resource| !resource.dependencies.is_empty())
        .map(|resource| (resource.id, resource.dependencies.clone()))
        .collect::<Vec<_>>();

    let mut total = 0;
    loop {
        let mut added = 0;
        for (resource, dependencies) in &dependents {
            let creator = get_creator(tree, *resource)?;
            for (dependency, kind) in dependencies {
                if tree.process(creator)?.has_handle_kind(*dependency, *kind) {
                    continue;
                }
                tree.add_tmp_hold_fresh(creator, *dependency, *kind)?;
                added += 1;
            }
        }
        debug!(added, "dependency closure round");
        total += added;
        if added == 0 {
            return Ok(total);
        }
    }
}

fn close_inheritance(tree: &mut ProcessTree) -> Result<usize, PlanError> {
    let pairs = tree
        .indexer()
        .resource_handles()
        .filter(|(resource, _)| {
            tree.resource(*resource)
                .is_ok_and(|entry| entry.is_inherited() && !entry.is_sharable())
        })
        .collect::<Vec<_>>();

    let mut added = 0;
    for (resource, handle) in pairs {
        let creator = get_creator(tree, resource)?;
        if tree.add_tmp_hold(creator, resource, handle)? {
            added += 1;
        }
        let holders = tree.handle_holders(resource, handle);
        for root in tree.forest_roots(&holders) {
            if root == creator {
                continue;
            }
            let mut current = tree.parent(root);
            while let Some(pid) = current {
                if tree.process(pid)?.has_handle(resource, handle) {
                    break;
                }
                tree.add_tmp_hold(pid, resource, handle)?;
                added += 1;
                current = tree.parent(pid);
            }
        }
    }
    Ok(added)
}

fn close_multi_handle(tree: &mut ProcessTree) -> Result<usize, PlanError> {
    let resources = tree
        .resources()
        .iter()
        .filter(|resource| resource.handle_kinds().len() > 1)
        .map(|resource| resource.id)
        .collect::<Vec<_>>();
    complete_creator_handles(tree, &resources)
}

fn close_sharable_creators(tree: &mut ProcessTree) -> Result<usize, PlanError> {
    let resources = tree
        .resources()
        .iter()
        .filter(|resource| resource.is_sharable())
        .map(|resource| resource.id)
        .collect::<Vec<_>>();
    complete_creator_handles(tree, &resources)
}

fn complete_creator_handles(tree: &mut ProcessTree, resources: &[ResourceId]) -> Result<usize, PlanError> {
    let mut added = 0;
    for resource in resources {
        let creator = get_creator(tree, *resource)?;
        let kinds = tree.resource(*resource)?.handle_kinds();
        for kind in kinds {
            if tree.process(creator)?.has_handle_kind(*resource, *kind) {
                continue;
            }
            tree.add_tmp_hold_fresh(creator, *resource, *kind)?;
            added += 1;
        }
    }
    Ok(added)
}

#[cfg(test)]
#[path = "closure_test.rs"]
mod tests;
