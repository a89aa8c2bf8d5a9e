use super::types::{Action, ActionId};
use crate::error::PlanError;
use rplan_core::{Handle, Pid, ProcessTree, ResourceId};
use std::collections::BTreeMap;

type PairKey = (Pid, ResourceId, Handle);

/// Lookup tables over a generated action list, keyed by `ActionId`
/// (position in the list).
#[derive(Debug, Clone, Default)]
pub struct ActionsIndex {
    by_executor: BTreeMap<Pid, Vec<ActionId>>,
    involving: BTreeMap<Pid, Vec<ActionId>>,
    forks: Vec<ActionId>,
    fork_of: BTreeMap<Pid, ActionId>,
    creates: BTreeMap<ResourceId, ActionId>,
    shares_to: BTreeMap<PairKey, ActionId>,
    removes: BTreeMap<PairKey, ActionId>,
    uses: BTreeMap<PairKey, Vec<ActionId>>,
}

impl ActionsIndex {
    pub fn new(actions: &[Action]) -> Result<Self, PlanError> {
        let mut index = Self::default();
        for (position, action) in actions.iter().enumerate() {
            let id = ActionId(position);
            index
                .by_executor
                .entry(action.executor())
                .or_default()
                .push(id);
            for pid in action.involved() {
                index.involving.entry(pid).or_default().push(id);
            }
            match action {
                Action::Fork { child, .. } => {
                    index.forks.push(id);
                    index.fork_of.insert(*child, id);
                }
                Action::Create { resource, .. } => {
                    if index.creates.insert(*resource, id).is_some() {
                        return Err(PlanError::DuplicateCreateForResource {
                            resource: *resource,
                        });
                    }
                }
                Action::Share {
                    process_from,
                    process_to,
                    resource,
                    handle_from,
                    handle_to,
                } => {
                    index
                        .shares_to
                        .insert((*process_to, *resource, *handle_to), id);
                    index
                        .uses
                        .entry((*process_from, *resource, *handle_from))
                        .or_default()
                        .push(id);
                }
                Action::Remove {
                    process,
                    resource,
                    handle,
                } => {
                    let key = (*process, *resource, *handle);
                    index.removes.insert(key, id);
                    index.uses.entry(key).or_default().push(id);
                }
            }
        }
        Ok(index)
    }

    pub fn by_executor(&self, pid: Pid) -> &[ActionId] {
        self.by_executor.get(&pid).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn involving(&self, pid: Pid) -> &[ActionId] {
        self.involving.get(&pid).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn forks(&self) -> &[ActionId] {
        &self.forks
    }

    pub fn fork_of(&self, child: Pid) -> Option<ActionId> {
        self.fork_of.get(&child).copied()
    }

    pub fn create_of(&self, resource: ResourceId) -> Option<ActionId> {
        self.creates.get(&resource).copied()
    }

    pub fn creates(&self) -> impl Iterator<Item = (ResourceId, ActionId)> + '_ {
        self.creates.iter().map(|(resource, id)| (*resource, *id))
    }

    pub fn remove_of(&self, pid: Pid, resource: ResourceId, handle: Handle) -> Option<ActionId> {
        self.removes.get(&(pid, resource, handle)).copied()
    }

    pub fn removes(&self) -> impl Iterator<Item = (PairKey, ActionId)> + '_ {
        self.removes.iter().map(|(key, id)| (*key, *id))
    }

    /// Actions in `pid` that read the pair: shares handing it out and its
    /// remove.
    pub fn uses(&self, pid: Pid, resource: ResourceId, handle: Handle) -> &[ActionId] {
        self.uses
            .get(&(pid, resource, handle))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The action that makes `pid` hold the pair: its create, the share that
    /// delivers it, or the fork of `pid` for fork-only resources.
    pub fn obtain(
        &self,
        tree: &ProcessTree,
        actions: &[Action],
        pid: Pid,
        resource: ResourceId,
        handle: Handle,
    ) -> Result<ActionId, PlanError> {
        if let Some(id) = self.create_of(resource) {
            if let Some(Action::Create {
                process, handles, ..
            }) = actions.get(id.0)
            {
                if *process == pid && handles.contains(&handle) {
                    return Ok(id);
                }
            }
        }
        if let Some(id) = self.shares_to.get(&(pid, resource, handle)) {
            return Ok(*id);
        }
        let entry = tree.resource(resource)?;
        if entry.is_inherited() && !entry.is_sharable() {
            if let Some(id) = self.fork_of(pid) {
                return Ok(id);
            }
        }
        Err(PlanError::NoProperObtainAction {
            process: pid,
            resource,
            handle,
        })
    }
}

#[cfg(test)]
#[path = "index_test.rs"]
mod tests;
