use crate::actions::{generate_actions, Action, ActionId};
use crate::closure::close_process_tree;
use crate::error::PlanError;
use crate::graph::{
    build_action_graph, depth_buckets, sequential_buckets, topological_order, GraphSortError,
};
use crate::interpreter::{shrink_with_inheritance, validate_plan};
use rplan_core::{ProcessTree, ResourceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanOrder {
    /// Buckets flattened in increasing depth.
    #[default]
    Depth,
    /// Reversed DFS post-order.
    Dfs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerOptions {
    pub order: PlanOrder,
    pub shrink: bool,
    pub validate: bool,
    pub skip_kinds: BTreeSet<ResourceKind>,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            order: PlanOrder::Depth,
            shrink: true,
            validate: true,
            skip_kinds: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStats {
    pub processes: usize,
    pub resources: usize,
    pub temporary_holds: usize,
    pub vertices: usize,
    pub edges: usize,
    pub buckets: usize,
    pub dropped_shares: usize,
    pub synthesized_removes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorePlan {
    /// Linear order, shrunk and validated when the options ask for it.
    pub actions: Vec<Action>,
    /// Parallel layers of `actions`. Without shrinking these are the depth
    /// layers of the precedence graph; after shrinking they are recomputed
    /// from the shrunk order so that replaying them flattened stays valid.
    pub buckets: Vec<Vec<Action>>,
    pub stats: PlanStats,
}

/// Runs the full pipeline on a tree built from a snapshot. The tree is
/// closed in place, so callers can inspect temporary holds afterwards.
#[instrument(skip_all, fields(processes = tree.len()))]
pub fn plan_tree(tree: &mut ProcessTree, options: &PlannerOptions) -> Result<RestorePlan, PlanError> {
    close_process_tree(tree)?;
    let actions = generate_actions(tree)?;
    let mut graph = build_action_graph(tree, actions)?;

    let replayable = options.skip_kinds.is_empty();
    if !replayable {
        graph = graph.filtered(|action| {
            action
                .resource()
                .and_then(|resource| tree.resource(resource).ok())
                .is_some_and(|entry| options.skip_kinds.contains(&entry.kind()))
        });
    }

    let order = match topological_order(&graph) {
        Ok(order) => order,
        Err(GraphSortError::NotAcyclic { cycle }) => {
            warn!(length = cycle.len(), "precedence graph has a cycle");
            let cycle = cycle
                .iter()
                .filter_map(|id| graph.action(*id).cloned())
                .collect();
            return Err(PlanError::NotAcyclic { cycle });
        }
    };
    let layers = depth_buckets(&graph, &order);
    let resolve = |ids: &[ActionId]| {
        ids.iter()
            .filter_map(|id| graph.action(*id).cloned())
            .collect::<Vec<_>>()
    };
    let mut buckets = layers.iter().map(|layer| resolve(layer)).collect::<Vec<_>>();
    let mut linear = match options.order {
        PlanOrder::Depth => buckets.iter().flatten().cloned().collect(),
        PlanOrder::Dfs => resolve(&order),
    };

    let mut stats = PlanStats {
        processes: tree.len(),
        resources: tree.resources().len(),
        temporary_holds: tree.tmp_hold_count(),
        vertices: graph.len(),
        edges: graph.edge_count(),
        buckets: buckets.len(),
        ..PlanStats::default()
    };

    if options.shrink && replayable {
        let outcome = shrink_with_inheritance(tree, &linear)?;
        stats.dropped_shares = outcome.dropped_shares;
        stats.synthesized_removes = outcome.synthesized_removes;
        linear = outcome.actions;
        buckets = sequential_buckets(&linear);
        stats.buckets = buckets.len();
    }
    if options.validate && replayable {
        validate_plan(tree, &linear)?;
    }

    info!(
        vertices = stats.vertices,
        edges = stats.edges,
        buckets = stats.buckets,
        actions = linear.len(),
        "restore plan ready"
    );
    Ok(RestorePlan {
        actions: linear,
        buckets,
        stats,
    })
}

#[cfg(test)]
#[path = "planner_test.rs"]
mod tests;
