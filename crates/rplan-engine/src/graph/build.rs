use super::consistency::can_exist_together;
use super::types::ActionGraph;
use crate::actions::{Action, ActionId, ActionsIndex};
use crate::error::PlanError;
use rplan_core::{Handle, Pid, ProcessTree, ResourceId};
use tracing::{debug, instrument};

type Edges = Vec<(ActionId, ActionId)>;

const PRIORITY_FINAL: u8 = 100;

/// Builds the precedence graph over `actions`, which must come from
/// `generate_actions` on the same closed tree.
#[instrument(skip_all, fields(actions = actions.len()))]
pub fn build_action_graph(tree: &ProcessTree, actions: Vec<Action>) -> Result<ActionGraph, PlanError> {
    let index = ActionsIndex::new(&actions)?;
    let mut graph = ActionGraph::new(actions);

    let rules: [(&str, Edges); 6] = [
        ("fork_before_use", fork_before_use(&graph, &index)),
        ("obtain_before_use", obtain_before_use(tree, &graph, &index)?),
        ("use_before_remove", use_before_remove(tree, &index)),
        ("inheritance_before_fork", inheritance_before_fork(tree, &graph, &index)?),
        ("dependency_order", dependency_order(tree, &graph, &index)?),
        ("conflict_order", conflict_order(tree, &graph, &index)?),
    ];
    for (rule, edges) in rules {
        let added = edges
            .into_iter()
            .filter(|(from, to)| graph.add_edge(*from, *to))
            .count();
        debug!(rule, added, "precedence rule applied");
    }
    Ok(graph)
}

fn fork_before_use(graph: &ActionGraph, index: &ActionsIndex) -> Edges {
    let mut edges = Edges::new();
    for fork in index.forks() {
        let Some(Action::Fork { child, .. }) = graph.action(*fork) else {
            continue;
        };
        for user in index.involving(*child) {
            edges.push((*fork, *user));
        }
    }
    edges
}

fn obtain_before_use(tree: &ProcessTree, graph: &ActionGraph, index: &ActionsIndex) -> Result<Edges, PlanError> {
    let mut edges = Edges::new();
    for process in tree.processes() {
        for (resource, handle) in process.pairs() {
            let obtain = index.obtain(tree, graph.actions(), process.pid(), resource, handle)?;
            for user in index.uses(process.pid(), resource, handle) {
                edges.push((obtain, *user));
            }
        }
    }
    Ok(edges)
}

fn use_before_remove(tree: &ProcessTree, index: &ActionsIndex) -> Edges {
    let mut edges = Edges::new();
    for process in tree.processes() {
        for (resource, handle) in process.tmp_pairs() {
            let Some(remove) = index.remove_of(process.pid(), resource, handle) else {
                continue;
            };
            for user in index.uses(process.pid(), resource, handle) {
                if *user != remove {
                    edges.push((*user, remove));
                }
            }
        }
    }
    edges
}

/// Fork-only resources reach a child only if the parent holds them when it
/// forks: the creator's create precedes forks of holding children, and any
/// remove of such a pair follows them.
fn inheritance_before_fork(tree: &ProcessTree, graph: &ActionGraph, index: &ActionsIndex) -> Result<Edges, PlanError> {
    let mut edges = Edges::new();
    for (resource, create) in index.creates() {
        if !is_fork_only(tree, resource)? {
            continue;
        }
        let Some(Action::Create {
            process, handles, ..
        }) = graph.action(create)
        else {
            continue;
        };
        for handle in handles {
            for fork in holding_child_forks(tree, index, *process, resource, *handle)? {
                edges.push((create, fork));
            }
        }
    }
    for ((pid, resource, handle), remove) in index.removes() {
        if !is_fork_only(tree, resource)? {
            continue;
        }
        for fork in holding_child_forks(tree, index, pid, resource, handle)? {
            edges.push((fork, remove));
        }
    }
    Ok(edges)
}

fn dependency_order(tree: &ProcessTree, graph: &ActionGraph, index: &ActionsIndex) -> Result<Edges, PlanError> {
    let mut edges = Edges::new();
    for (resource, create) in index.creates() {
        let dependencies = &tree.resource(resource)?.dependencies;
        if dependencies.is_empty() {
            continue;
        }
        let Some(Action::Create { process, .. }) = graph.action(create) else {
            continue;
        };
        let holder = tree.process(*process)?;
        for (dependency, kind) in dependencies {
            let Some(handle) = holder.handles_of_kind(*dependency, *kind).first().copied() else {
                return Err(PlanError::InsufficientHandlesForCreate {
                    process: *process,
                    resource: *dependency,
                    missing: *kind,
                });
            };
            let obtain = index.obtain(tree, graph.actions(), *process, *dependency, handle)?;
            edges.push((obtain, create));
            if holder.is_tmp(*dependency, handle) {
                if let Some(remove) = index.remove_of(*process, *dependency, handle) {
                    edges.push((create, remove));
                }
            }
        }
    }
    Ok(edges)
}

/// Within one process, a temporary pair is removed before any later-ranked
/// pair it cannot coexist with is obtained.
fn conflict_order(tree: &ProcessTree, graph: &ActionGraph, index: &ActionsIndex) -> Result<Edges, PlanError> {
    let mut edges = Edges::new();
    for process in tree.processes() {
        let mut ranked = Vec::new();
        for (resource, handle) in process.pairs() {
            let entry = tree.resource(resource)?;
            let priority = if !process.is_tmp(resource, handle) {
                PRIORITY_FINAL
            } else if entry.is_inherited() && !entry.is_sharable() {
                0
            } else if entry.is_sharable() {
                1
            } else {
                2
            };
            ranked.push((priority, resource, handle));
        }
        ranked.sort();

        for (position, (priority, resource, handle)) in ranked.iter().enumerate() {
            if *priority == PRIORITY_FINAL {
                continue;
            }
            let Some(remove) = index.remove_of(process.pid(), *resource, *handle) else {
                continue;
            };
            let left = tree.resource(*resource)?;
            for (_, other, other_handle) in &ranked[position + 1..] {
                let right = tree.resource(*other)?;
                if can_exist_together(left, *handle, right, *other_handle) {
                    continue;
                }
                let obtain = index.obtain(tree, graph.actions(), process.pid(), *other, *other_handle)?;
                edges.push((remove, obtain));
            }
        }
    }
    Ok(edges)
}

fn is_fork_only(tree: &ProcessTree, resource: ResourceId) -> Result<bool, PlanError> {
    let entry = tree.resource(resource)?;
    Ok(entry.is_inherited() && !entry.is_sharable())
}

fn holding_child_forks(
    tree: &ProcessTree,
    index: &ActionsIndex,
    parent: Pid,
    resource: ResourceId,
    handle: Handle,
) -> Result<Vec<ActionId>, PlanError> {
    let mut forks = Vec::new();
    for child in tree.children(parent) {
        if !tree.process(*child)?.has_handle(resource, handle) {
            continue;
        }
        if let Some(fork) = index.fork_of(*child) {
            forks.push(fork);
        }
    }
    Ok(forks)
}

#[cfg(test)]
#[path = "build_test.rs"]
mod tests;
