use crate::handle::{Handle, HandleAllocator, HandleError, HandleKind};
use crate::resource::ResourceId;
use crate::tree::Pid;
use std::collections::{BTreeMap, BTreeSet};

/// One process of the planned tree. Final holds must exist once restoration
/// completes; temporary holds are scaffolding removed before the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pid: Pid,
    parent: Option<Pid>,
    final_holds: BTreeMap<ResourceId, BTreeSet<Handle>>,
    tmp_holds: BTreeMap<ResourceId, BTreeSet<Handle>>,
    allocator: HandleAllocator,
}

impl Process {
    pub fn new(pid: Pid, parent: Option<Pid>) -> Self {
        Self {
            pid,
            parent,
            final_holds: BTreeMap::new(),
            tmp_holds: BTreeMap::new(),
            allocator: HandleAllocator::default(),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn parent(&self) -> Option<Pid> {
        self.parent
    }

    /// Returns true when the pair was not already final. A temporary hold of
    /// the same pair is promoted.
    pub(crate) fn add_final(&mut self, resource: ResourceId, handle: Handle) -> Result<bool, HandleError> {
        self.allocator.claim(handle)?;
        remove_pair(&mut self.tmp_holds, resource, handle);
        Ok(self.final_holds.entry(resource).or_default().insert(handle))
    }

    /// Returns true when the pair was not held at all before.
    pub(crate) fn add_tmp(&mut self, resource: ResourceId, handle: Handle) -> Result<bool, HandleError> {
        if self.has_handle(resource, handle) {
            return Ok(false);
        }
        self.allocator.claim(handle)?;
        Ok(self.tmp_holds.entry(resource).or_default().insert(handle))
    }

    pub fn next_handle(&self, kind: HandleKind) -> Result<Handle, HandleError> {
        self.allocator.next(kind)
    }

    pub fn has_resource(&self, resource: ResourceId) -> bool {
        self.final_holds.contains_key(&resource) || self.tmp_holds.contains_key(&resource)
    }

    pub fn has_handle(&self, resource: ResourceId, handle: Handle) -> bool {
        holds_pair(&self.final_holds, resource, handle) || holds_pair(&self.tmp_holds, resource, handle)
    }

    pub fn has_handle_kind(&self, resource: ResourceId, kind: HandleKind) -> bool {
        self.handles(resource).iter().any(|handle| handle.kind() == kind)
    }

    pub fn is_tmp(&self, resource: ResourceId, handle: Handle) -> bool {
        holds_pair(&self.tmp_holds, resource, handle)
    }

    pub fn handles(&self, resource: ResourceId) -> BTreeSet<Handle> {
        let mut handles = self.final_handles(resource);
        handles.extend(self.tmp_handles(resource));
        handles
    }

    pub fn handles_of_kind(&self, resource: ResourceId, kind: HandleKind) -> Vec<Handle> {
        self.handles(resource)
            .into_iter()
            .filter(|handle| handle.kind() == kind)
            .collect()
    }

    pub fn final_handles(&self, resource: ResourceId) -> BTreeSet<Handle> {
        self.final_holds.get(&resource).cloned().unwrap_or_default()
    }

    pub fn tmp_handles(&self, resource: ResourceId) -> BTreeSet<Handle> {
        self.tmp_holds.get(&resource).cloned().unwrap_or_default()
    }

    pub fn resources(&self) -> BTreeSet<ResourceId> {
        self.final_holds
            .keys()
            .chain(self.tmp_holds.keys())
            .copied()
            .collect()
    }

    pub fn pairs(&self) -> Vec<(ResourceId, Handle)> {
        let mut pairs = self.final_pairs();
        pairs.extend(self.tmp_pairs());
        pairs.sort();
        pairs
    }

    pub fn final_pairs(&self) -> Vec<(ResourceId, Handle)> {
        flatten(&self.final_holds)
    }

    pub fn tmp_pairs(&self) -> Vec<(ResourceId, Handle)> {
        flatten(&self.tmp_holds)
    }
}

fn holds_pair(holds: &BTreeMap<ResourceId, BTreeSet<Handle>>, resource: ResourceId, handle: Handle) -> bool {
    holds
        .get(&resource)
        .is_some_and(|handles| handles.contains(&handle))
}

fn remove_pair(holds: &mut BTreeMap<ResourceId, BTreeSet<Handle>>, resource: ResourceId, handle: Handle) {
    let Some(handles) = holds.get_mut(&resource) else {
        return;
    };
    handles.remove(&handle);
    if handles.is_empty() {
        holds.remove(&resource);
    }
}

fn flatten(holds: &BTreeMap<ResourceId, BTreeSet<Handle>>) -> Vec<(ResourceId, Handle)> {
    holds
        .iter()
        .flat_map(|(resource, handles)| handles.iter().map(move |handle| (*resource, *handle)))
        .collect()
}

#[cfg(test)]
#[path = "process_test.rs"]
mod tests;
