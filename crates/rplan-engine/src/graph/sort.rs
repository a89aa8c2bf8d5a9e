use super::types::ActionGraph;
use crate::actions::{Action, ActionId};
use rplan_core::Pid;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphSortError {
    #[error("graph is not acyclic, cycle through {} actions", .cycle.len())]
    NotAcyclic { cycle: Vec<ActionId> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Entered,
    Exited,
}

/// Reversed DFS post-order. A back edge aborts with the cycle it closes,
/// listed from the repeated vertex to the vertex that reached it again.
pub fn topological_order(graph: &ActionGraph) -> Result<Vec<ActionId>, GraphSortError> {
    let mut marks = vec![Mark::Unvisited; graph.len()];
    let mut post_order = Vec::with_capacity(graph.len());

    for start in graph.ids() {
        if marks[start.0] != Mark::Unvisited {
            continue;
        }
        marks[start.0] = Mark::Entered;
        let mut stack = vec![(start, pending_successors(graph, start))];

        loop {
            let Some(frame) = stack.last_mut() else {
                break;
            };
            let vertex = frame.0;
            let Some(next) = frame.1.pop() else {
                marks[vertex.0] = Mark::Exited;
                post_order.push(vertex);
                stack.pop();
                continue;
            };
            match marks[next.0] {
                Mark::Unvisited => {
                    marks[next.0] = Mark::Entered;
                    stack.push((next, pending_successors(graph, next)));
                }
                Mark::Entered => {
                    let from = stack
                        .iter()
                        .position(|(id, _)| *id == next)
                        .unwrap_or(0);
                    let cycle = stack[from..].iter().map(|(id, _)| *id).collect();
                    return Err(GraphSortError::NotAcyclic { cycle });
                }
                Mark::Exited => {}
            }
        }
    }

    post_order.reverse();
    Ok(post_order)
}

fn pending_successors(graph: &ActionGraph, id: ActionId) -> Vec<ActionId> {
    let mut successors = graph.successors(id).collect::<Vec<_>>();
    successors.reverse();
    successors
}

/// Groups vertices by longest-path depth. `order` must be topological.
pub fn depth_buckets(graph: &ActionGraph, order: &[ActionId]) -> Vec<Vec<ActionId>> {
    let mut depth = vec![0usize; graph.len()];
    let mut buckets: Vec<Vec<ActionId>> = Vec::new();
    for id in order {
        let level = graph
            .predecessors(*id)
            .map(|predecessor| depth[predecessor.0] + 1)
            .max()
            .unwrap_or(0);
        depth[id.0] = level;
        if buckets.len() <= level {
            buckets.resize_with(level + 1, Vec::new);
        }
        buckets[level].push(*id);
    }
    buckets
}

/// Layers a replayable linear order. Actions that touch a common process
/// keep their relative order across buckets, so actions sharing a bucket
/// touch disjoint processes and running a bucket in any order reaches the
/// same state as replaying `actions` in sequence.
pub fn sequential_buckets(actions: &[Action]) -> Vec<Vec<Action>> {
    let mut last_level: BTreeMap<Pid, usize> = BTreeMap::new();
    let mut buckets: Vec<Vec<Action>> = Vec::new();
    for action in actions {
        let touched = touched_processes(action);
        let level = touched
            .iter()
            .filter_map(|pid| last_level.get(pid))
            .map(|level| level + 1)
            .max()
            .unwrap_or(0);
        for pid in touched {
            last_level.insert(pid, level);
        }
        if buckets.len() <= level {
            buckets.resize_with(level + 1, Vec::new);
        }
        buckets[level].push(action.clone());
    }
    buckets
}

fn touched_processes(action: &Action) -> Vec<Pid> {
    match action {
        Action::Fork { parent, child } => vec![*parent, *child],
        Action::Share {
            process_from,
            process_to,
            ..
        } => vec![*process_from, *process_to],
        Action::Create { process, .. } | Action::Remove { process, .. } => vec![*process],
    }
}

#[cfg(test)]
#[path = "sort_test.rs"]
mod tests;
