use crate::handle::Handle;
use crate::resource::ResourceId;
use crate::tree::Pid;
use std::collections::{BTreeMap, BTreeSet};

/// Reverse index from resources and (resource, handle) pairs to holder pids.
/// Updated by `ProcessTree` on every hold it records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceIndexer {
    holders: BTreeMap<ResourceId, BTreeSet<Pid>>,
    handle_holders: BTreeMap<(ResourceId, Handle), BTreeSet<Pid>>,
}

impl ResourceIndexer {
    pub(crate) fn record(&mut self, pid: Pid, resource: ResourceId, handle: Handle) {
        self.holders.entry(resource).or_default().insert(pid);
        self.handle_holders
            .entry((resource, handle))
            .or_default()
            .insert(pid);
    }

    pub fn resources(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.holders.keys().copied()
    }

    pub fn resource_handles(&self) -> impl Iterator<Item = (ResourceId, Handle)> + '_ {
        self.handle_holders.keys().copied()
    }

    pub fn holders(&self, resource: ResourceId) -> Vec<Pid> {
        self.holders
            .get(&resource)
            .map(|pids| pids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn handle_holders(&self, resource: ResourceId, handle: Handle) -> Vec<Pid> {
        self.handle_holders
            .get(&(resource, handle))
            .map(|pids| pids.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "indexer_test.rs"]
mod tests;
