use crate::handle::{Handle, HandleError, HandleKind};
use crate::indexer::ResourceIndexer;
use crate::process::Process;
use crate::resource::{Resource, ResourceId, ResourcePayload, ResourceTable};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

pub type Pid = u32;

/// Synthetic ancestor of the snapshot's real root.
pub const ROOT_PID: Pid = 0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("unknown process {0}")]
    UnknownProcess(Pid),
    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),
    #[error("duplicate process {0}")]
    DuplicateProcess(Pid),
    #[error("pid 0 is reserved for the synthetic root")]
    ReservedPid,
    #[error("expected exactly one root process, found {0:?}")]
    RootCount(Vec<Pid>),
    #[error("processes not reachable from the root: {0:?}")]
    Detached(Vec<Pid>),
    #[error("process {pid}: handle space exhausted (limit {limit})")]
    HandleSpaceExhausted { pid: Pid, limit: i32 },
    #[error("process {pid}: negative descriptor {fd}")]
    NegativeDescriptor { pid: Pid, fd: i32 },
}

fn handle_error(pid: Pid, error: HandleError) -> TreeError {
    match error {
        HandleError::SpaceExhausted { limit } => TreeError::HandleSpaceExhausted { pid, limit },
        HandleError::NegativeDescriptor(fd) => TreeError::NegativeDescriptor { pid, fd },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessTree {
    resources: ResourceTable,
    processes: BTreeMap<Pid, Process>,
    children: BTreeMap<Pid, Vec<Pid>>,
    depth: BTreeMap<Pid, usize>,
    indexer: ResourceIndexer,
}

impl ProcessTree {
    /// Builds the tree from `(pid, ppid)` links. The single process whose
    /// parent is not listed is attached under the synthetic root.
    pub fn new(links: &[(Pid, Pid)]) -> Result<Self, TreeError> {
        let mut parents = BTreeMap::new();
        for (pid, ppid) in links {
            if *pid == ROOT_PID {
                return Err(TreeError::ReservedPid);
            }
            if parents.insert(*pid, *ppid).is_some() {
                return Err(TreeError::DuplicateProcess(*pid));
            }
        }

        let roots = parents
            .iter()
            .filter(|(_, ppid)| !parents.contains_key(*ppid))
            .map(|(pid, _)| *pid)
            .collect::<Vec<_>>();
        if roots.len() != 1 {
            return Err(TreeError::RootCount(roots));
        }
        let real_root = roots[0];

        let mut processes = BTreeMap::new();
        let mut children: BTreeMap<Pid, Vec<Pid>> = BTreeMap::new();
        processes.insert(ROOT_PID, Process::new(ROOT_PID, None));
        children.insert(ROOT_PID, Vec::new());
        for (pid, ppid) in &parents {
            let parent = if *pid == real_root { ROOT_PID } else { *ppid };
            processes.insert(*pid, Process::new(*pid, Some(parent)));
            children.entry(*pid).or_default();
            children.entry(parent).or_default().push(*pid);
        }

        let mut depth = BTreeMap::new();
        let mut queue = VecDeque::from([(ROOT_PID, 0usize)]);
        while let Some((pid, level)) = queue.pop_front() {
            depth.insert(pid, level);
            for child in children.get(&pid).into_iter().flatten() {
                queue.push_back((*child, level + 1));
            }
        }
        let detached = processes
            .keys()
            .filter(|pid| !depth.contains_key(*pid))
            .copied()
            .collect::<Vec<_>>();
        if !detached.is_empty() {
            return Err(TreeError::Detached(detached));
        }

        Ok(Self {
            resources: ResourceTable::default(),
            processes,
            children,
            depth,
            indexer: ResourceIndexer::default(),
        })
    }

    pub fn root(&self) -> Pid {
        ROOT_PID
    }

    pub fn process(&self, pid: Pid) -> Result<&Process, TreeError> {
        self.processes.get(&pid).ok_or(TreeError::UnknownProcess(pid))
    }

    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.processes.values()
    }

    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.processes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn parent(&self, pid: Pid) -> Option<Pid> {
        self.processes.get(&pid).and_then(Process::parent)
    }

    pub fn children(&self, pid: Pid) -> &[Pid] {
        self.children.get(&pid).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn depth(&self, pid: Pid) -> Result<usize, TreeError> {
        self.depth
            .get(&pid)
            .copied()
            .ok_or(TreeError::UnknownProcess(pid))
    }

    pub fn lca(&self, left: Pid, right: Pid) -> Result<Pid, TreeError> {
        let (mut left, mut right) = (left, right);
        let (mut left_depth, mut right_depth) = (self.depth(left)?, self.depth(right)?);
        while left_depth > right_depth {
            left = self.parent(left).ok_or(TreeError::UnknownProcess(left))?;
            left_depth -= 1;
        }
        while right_depth > left_depth {
            right = self.parent(right).ok_or(TreeError::UnknownProcess(right))?;
            right_depth -= 1;
        }
        while left != right {
            left = self.parent(left).ok_or(TreeError::UnknownProcess(left))?;
            right = self.parent(right).ok_or(TreeError::UnknownProcess(right))?;
        }
        Ok(left)
    }

    /// Members of `pids` whose parent is not a member: the roots of the
    /// forest the set induces on the tree.
    pub fn forest_roots(&self, pids: &[Pid]) -> Vec<Pid> {
        let members = pids.iter().copied().collect::<BTreeSet<_>>();
        members
            .iter()
            .filter(|pid| {
                !self
                    .parent(**pid)
                    .is_some_and(|parent| members.contains(&parent))
            })
            .copied()
            .collect()
    }

    pub fn insert_resource(&mut self, payload: ResourcePayload) -> ResourceId {
        self.resources.insert(payload)
    }

    pub fn add_dependency(
        &mut self,
        resource: ResourceId,
        dependency: ResourceId,
        kind: HandleKind,
    ) -> Result<(), TreeError> {
        if self.resources.get(resource).is_none() {
            return Err(TreeError::UnknownResource(resource));
        }
        if !self.resources.add_dependency(resource, dependency, kind) {
            return Err(TreeError::UnknownResource(dependency));
        }
        Ok(())
    }

    pub fn resource(&self, id: ResourceId) -> Result<&Resource, TreeError> {
        self.resources.get(id).ok_or(TreeError::UnknownResource(id))
    }

    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    pub fn indexer(&self) -> &ResourceIndexer {
        &self.indexer
    }

    pub fn holders(&self, resource: ResourceId) -> Vec<Pid> {
        self.indexer.holders(resource)
    }

    pub fn handle_holders(&self, resource: ResourceId, handle: Handle) -> Vec<Pid> {
        self.indexer.handle_holders(resource, handle)
    }

    pub fn add_final_hold(&mut self, pid: Pid, resource: ResourceId, handle: Handle) -> Result<bool, TreeError> {
        self.resource(resource)?;
        let process = self
            .processes
            .get_mut(&pid)
            .ok_or(TreeError::UnknownProcess(pid))?;
        let added = process
            .add_final(resource, handle)
            .map_err(|error| handle_error(pid, error))?;
        self.indexer.record(pid, resource, handle);
        Ok(added)
    }

    pub fn add_tmp_hold(&mut self, pid: Pid, resource: ResourceId, handle: Handle) -> Result<bool, TreeError> {
        self.resource(resource)?;
        let process = self
            .processes
            .get_mut(&pid)
            .ok_or(TreeError::UnknownProcess(pid))?;
        let added = process
            .add_tmp(resource, handle)
            .map_err(|error| handle_error(pid, error))?;
        if added {
            self.indexer.record(pid, resource, handle);
        }
        Ok(added)
    }

    /// Adds a temporary hold at a freshly allocated handle of `kind`.
    pub fn add_tmp_hold_fresh(&mut self, pid: Pid, resource: ResourceId, kind: HandleKind) -> Result<Handle, TreeError> {
        let handle = self
            .process(pid)?
            .next_handle(kind)
            .map_err(|error| handle_error(pid, error))?;
        self.add_tmp_hold(pid, resource, handle)?;
        Ok(handle)
    }

    pub fn tmp_hold_count(&self) -> usize {
        self.processes
            .values()
            .map(|process| process.tmp_pairs().len())
            .sum()
    }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tests;
