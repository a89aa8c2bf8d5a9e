use crate::handle::HandleKind;
use crate::snapshot::{PipeRecord, RegularFileRecord, SharedAnonMemRecord, VmAreaRecord};
use crate::tree::Pid;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u32);

impl Display for ResourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    RegularFile,
    SharedAnonMem,
    Pipe,
    ProcessGroup,
    ProcessSession,
    Vma,
    ProcessInternals,
}

const FD_ONLY: &[HandleKind] = &[HandleKind::FileDescriptor];
const PIPE_ENDS: &[HandleKind] = &[HandleKind::PipeRead, HandleKind::PipeWrite];
const NO_HANDLE: &[HandleKind] = &[HandleKind::NoHandle];

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        Self::RegularFile,
        Self::SharedAnonMem,
        Self::Pipe,
        Self::ProcessGroup,
        Self::ProcessSession,
        Self::Vma,
        Self::ProcessInternals,
    ];

    /// Can be handed to an existing process after creation.
    pub fn is_sharable(self) -> bool {
        matches!(
            self,
            Self::RegularFile | Self::SharedAnonMem | Self::Pipe | Self::ProcessGroup
        )
    }

    /// Propagates from parent to child across fork.
    pub fn is_inherited(self) -> bool {
        !matches!(self, Self::ProcessInternals)
    }

    pub fn handle_kinds(self) -> &'static [HandleKind] {
        match self {
            Self::RegularFile | Self::SharedAnonMem => FD_ONLY,
            Self::Pipe => PIPE_ENDS,
            Self::ProcessGroup | Self::ProcessSession | Self::Vma | Self::ProcessInternals => {
                NO_HANDLE
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RegularFile => "regular_file",
            Self::SharedAnonMem => "shared_anon_mem",
            Self::Pipe => "pipe",
            Self::ProcessGroup => "process_group",
            Self::ProcessSession => "process_session",
            Self::Vma => "vma",
            Self::ProcessInternals => "process_internals",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource kind `{0}`")]
pub struct ResourceKindParseError(pub String);

impl FromStr for ResourceKind {
    type Err = ResourceKindParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ResourceKindParseError(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmaPayload {
    pub owner: Pid,
    pub area: VmAreaRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourcePayload {
    RegularFile(RegularFileRecord),
    SharedAnonMem(SharedAnonMemRecord),
    Pipe(PipeRecord),
    ProcessGroup { pgid: Pid },
    ProcessSession { sid: Pid },
    Vma(VmaPayload),
    ProcessInternals { owner: Pid, name: String, data: Value },
}

impl ResourcePayload {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::RegularFile(_) => ResourceKind::RegularFile,
            Self::SharedAnonMem(_) => ResourceKind::SharedAnonMem,
            Self::Pipe(_) => ResourceKind::Pipe,
            Self::ProcessGroup { .. } => ResourceKind::ProcessGroup,
            Self::ProcessSession { .. } => ResourceKind::ProcessSession,
            Self::Vma(_) => ResourceKind::Vma,
            Self::ProcessInternals { .. } => ResourceKind::ProcessInternals,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub payload: ResourcePayload,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<(ResourceId, HandleKind)>,
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        self.payload.kind()
    }

    pub fn is_sharable(&self) -> bool {
        self.kind().is_sharable()
    }

    pub fn is_inherited(&self) -> bool {
        self.kind().is_inherited()
    }

    pub fn handle_kinds(&self) -> &'static [HandleKind] {
        self.kind().handle_kinds()
    }

    pub fn is_possible_creator(&self, pid: Pid) -> bool {
        match &self.payload {
            ResourcePayload::ProcessGroup { pgid } => pid == *pgid,
            ResourcePayload::ProcessSession { sid } => pid == *sid,
            _ => true,
        }
    }

    pub fn possible_creators(&self, pids: impl IntoIterator<Item = Pid>) -> Vec<Pid> {
        pids.into_iter()
            .filter(|pid| self.is_possible_creator(*pid))
            .collect()
    }

    /// Address range of a VMA resource.
    pub fn vma_range(&self) -> Option<(u64, u64)> {
        match &self.payload {
            ResourcePayload::Vma(vma) => Some((vma.area.start, vma.area.end)),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match &self.payload {
            ResourcePayload::RegularFile(file) => {
                let name = file.path.rsplit('/').next().unwrap_or(&file.path);
                format!("RegFile({}, '{name}')", file.id)
            }
            ResourcePayload::SharedAnonMem(shmem) => format!("ShMem({})", shmem.id),
            ResourcePayload::Pipe(pipe) => format!("Pipe({})", pipe.id),
            ResourcePayload::ProcessGroup { pgid } => format!("Group({pgid})"),
            ResourcePayload::ProcessSession { sid } => format!("Session({sid})"),
            ResourcePayload::Vma(vma) => format!("VMA({:#x}-{:#x})", vma.area.start, vma.area.end),
            ResourcePayload::ProcessInternals { owner, name, .. } => {
                format!("Internals({owner}, {name})")
            }
        }
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Arena of resources addressed by `ResourceId`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceTable {
    resources: Vec<Resource>,
}

impl ResourceTable {
    pub fn insert(&mut self, payload: ResourcePayload) -> ResourceId {
        let id = ResourceId(self.resources.len() as u32);
        self.resources.push(Resource {
            id,
            payload,
            dependencies: Vec::new(),
        });
        id
    }

    pub fn add_dependency(
        &mut self,
        resource: ResourceId,
        dependency: ResourceId,
        kind: HandleKind,
    ) -> bool {
        if self.get(dependency).is_none() {
            return false;
        }
        let Some(entry) = self.resources.get_mut(resource.0 as usize) else {
            return false;
        };
        if !entry.dependencies.contains(&(dependency, kind)) {
            entry.dependencies.push((dependency, kind));
        }
        true
    }

    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.resources.iter().map(|resource| resource.id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
#[path = "resource_test.rs"]
mod tests;
