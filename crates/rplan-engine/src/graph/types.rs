use crate::actions::{Action, ActionId};
use std::collections::BTreeSet;

/// Precedence graph over an arena of actions. An edge `u -> v` means `u`
/// must run before `v`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionGraph {
    actions: Vec<Action>,
    successors: Vec<BTreeSet<usize>>,
    predecessors: Vec<BTreeSet<usize>>,
}

impl ActionGraph {
    pub fn new(actions: Vec<Action>) -> Self {
        let size = actions.len();
        Self {
            actions,
            successors: vec![BTreeSet::new(); size],
            predecessors: vec![BTreeSet::new(); size],
        }
    }

    /// Returns true when the edge is new. Self edges are ignored.
    pub fn add_edge(&mut self, from: ActionId, to: ActionId) -> bool {
        if from == to || from.0 >= self.actions.len() || to.0 >= self.actions.len() {
            return false;
        }
        let added = self.successors[from.0].insert(to.0);
        self.predecessors[to.0].insert(from.0);
        added
    }

    pub fn action(&self, id: ActionId) -> Option<&Action> {
        self.actions.get(id.0)
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn ids(&self) -> impl Iterator<Item = ActionId> {
        (0..self.actions.len()).map(ActionId)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.successors.iter().map(BTreeSet::len).sum()
    }

    pub fn has_edge(&self, from: ActionId, to: ActionId) -> bool {
        self.successors
            .get(from.0)
            .is_some_and(|targets| targets.contains(&to.0))
    }

    pub fn successors(&self, id: ActionId) -> impl Iterator<Item = ActionId> + '_ {
        self.successors
            .get(id.0)
            .into_iter()
            .flatten()
            .map(|index| ActionId(*index))
    }

    pub fn predecessors(&self, id: ActionId) -> impl Iterator<Item = ActionId> + '_ {
        self.predecessors
            .get(id.0)
            .into_iter()
            .flatten()
            .map(|index| ActionId(*index))
    }

    pub fn edges(&self) -> impl Iterator<Item = (ActionId, ActionId)> + '_ {
        self.successors.iter().enumerate().flat_map(|(from, targets)| {
            targets
                .iter()
                .map(move |to| (ActionId(from), ActionId(*to)))
        })
    }

    /// A copy without the vertices matching `drop` and their incident edges.
    /// Ids are renumbered densely, keeping their relative order.
    pub fn filtered(&self, drop: impl Fn(&Action) -> bool) -> Self {
        let mut remap = vec![None; self.actions.len()];
        let mut kept = Vec::new();
        for (index, action) in self.actions.iter().enumerate() {
            if !drop(action) {
                remap[index] = Some(ActionId(kept.len()));
                kept.push(action.clone());
            }
        }
        let mut graph = Self::new(kept);
        for (from, to) in self.edges() {
            if let (Some(from), Some(to)) = (remap[from.0], remap[to.0]) {
                graph.add_edge(from, to);
            }
        }
        graph
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
