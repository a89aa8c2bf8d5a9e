use crate::field_path::FieldPath;
use crate::handle::{Handle, HandleKind};
use crate::issues::{IssueSeverity, StructuredIssue};
use crate::resource::{ResourceId, ResourcePayload, VmaPayload};
use crate::tree::{Pid, ProcessTree, TreeError, ROOT_PID};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

pub const SNAPSHOT_SCHEMA_0_0_1: &str = "rplan-snapshot/0.0.1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_snapshot_schema")]
    pub schema: String,
    pub processes: Vec<SnapshotProcess>,
    #[serde(default)]
    pub regular_files: Vec<RegularFileRecord>,
    #[serde(default)]
    pub pipes: Vec<PipeRecord>,
    #[serde(default)]
    pub shared_anon_mem: Vec<SharedAnonMemRecord>,
}

fn default_snapshot_schema() -> String {
    SNAPSHOT_SCHEMA_0_0_1.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotProcess {
    pub pid: Pid,
    pub ppid: Pid,
    pub pgid: Pid,
    pub sid: Pid,
    #[serde(default)]
    pub fds: BTreeMap<i32, FdTarget>,
    #[serde(default)]
    pub vmas: Vec<VmAreaRecord>,
    #[serde(default)]
    pub internals: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FdTarget {
    RegularFile { file_id: u32 },
    SharedAnonMem { shmem_id: u32 },
    PipeRead { pipe_id: u32 },
    PipeWrite { pipe_id: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VmaBacking {
    #[default]
    Anonymous,
    File { file_id: u32 },
    SharedMem { shmem_id: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmAreaRecord {
    pub start: u64,
    pub end: u64,
    #[serde(default)]
    pub pgoff: u64,
    #[serde(default)]
    pub prot: u32,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub backing: VmaBacking,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularFileRecord {
    pub id: u32,
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub pos: u64,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub mode: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipeRecord {
    pub id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedAnonMemRecord {
    pub id: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot is invalid ({} issue(s))", .0.len())]
    Invalid(Vec<StructuredIssue>),
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),
}

pub fn validate_snapshot(snapshot: &Snapshot) -> Vec<StructuredIssue> {
    let mut issues = Vec::new();
    let processes_path = FieldPath::root().key("processes");

    if snapshot.processes.is_empty() {
        issues.push(StructuredIssue::error(
            "snapshot_structure",
            processes_path.clone(),
            "snapshot has no processes",
            "snapshot.processes.non_empty",
        ));
    }

    let file_ids = collect_ids(
        snapshot.regular_files.iter().map(|file| file.id),
        FieldPath::root().key("regular_files"),
        &mut issues,
    );
    let pipe_ids = collect_ids(
        snapshot.pipes.iter().map(|pipe| pipe.id),
        FieldPath::root().key("pipes"),
        &mut issues,
    );
    let shmem_ids = collect_ids(
        snapshot.shared_anon_mem.iter().map(|shmem| shmem.id),
        FieldPath::root().key("shared_anon_mem"),
        &mut issues,
    );

    let mut pids = BTreeSet::new();
    for (index, process) in snapshot.processes.iter().enumerate() {
        let path = processes_path.clone().index(index);
        if process.pid == ROOT_PID {
            issues.push(StructuredIssue::error(
                "snapshot_structure",
                path.clone().key("pid"),
                "pid 0 is reserved for the synthetic root",
                "snapshot.process.reserved_pid",
            ));
        } else if !pids.insert(process.pid) {
            issues.push(
                StructuredIssue::error(
                    "snapshot_structure",
                    path.clone().key("pid"),
                    format!("duplicate pid {}", process.pid),
                    "snapshot.process.duplicate_pid",
                )
                .with_pid(process.pid),
            );
        }

        for (fd, target) in &process.fds {
            let fd_path = path.clone().key("fds").key(fd.to_string());
            if *fd < 0 {
                issues.push(
                    StructuredIssue::error(
                        "snapshot_structure",
                        fd_path.clone(),
                        format!("negative file descriptor {fd}"),
                        "snapshot.fd.non_negative",
                    )
                    .with_pid(process.pid),
                );
            }
            let dangling = match target {
                FdTarget::RegularFile { file_id } => (!file_ids.contains(file_id))
                    .then(|| format!("unknown regular file {file_id}")),
                FdTarget::SharedAnonMem { shmem_id } => (!shmem_ids.contains(shmem_id))
                    .then(|| format!("unknown shared memory {shmem_id}")),
                FdTarget::PipeRead { pipe_id } | FdTarget::PipeWrite { pipe_id } => {
                    (!pipe_ids.contains(pipe_id)).then(|| format!("unknown pipe {pipe_id}"))
                }
            };
            if let Some(message) = dangling {
                issues.push(
                    StructuredIssue::error(
                        "snapshot_reference",
                        fd_path,
                        message,
                        "snapshot.fd.target_exists",
                    )
                    .with_pid(process.pid),
                );
            }
        }

        for (vma_index, vma) in process.vmas.iter().enumerate() {
            let vma_path = path.clone().key("vmas").index(vma_index);
            if vma.start >= vma.end {
                issues.push(
                    StructuredIssue::error(
                        "snapshot_structure",
                        vma_path.clone(),
                        format!("vma start {:#x} is not below end {:#x}", vma.start, vma.end),
                        "snapshot.vma.range",
                    )
                    .with_pid(process.pid),
                );
            }
            let dangling = match vma.backing {
                VmaBacking::Anonymous => None,
                VmaBacking::File { file_id } => (!file_ids.contains(&file_id))
                    .then(|| format!("unknown regular file {file_id}")),
                VmaBacking::SharedMem { shmem_id } => (!shmem_ids.contains(&shmem_id))
                    .then(|| format!("unknown shared memory {shmem_id}")),
            };
            if let Some(message) = dangling {
                issues.push(
                    StructuredIssue::error(
                        "snapshot_reference",
                        vma_path.key("backing"),
                        message,
                        "snapshot.vma.backing_exists",
                    )
                    .with_pid(process.pid),
                );
            }
        }
    }

    if !snapshot.processes.is_empty() {
        let roots = snapshot
            .processes
            .iter()
            .filter(|process| process.pid != ROOT_PID && !pids.contains(&process.ppid))
            .map(|process| process.pid)
            .collect::<BTreeSet<_>>();
        if roots.len() != 1 {
            issues.push(StructuredIssue::error(
                "snapshot_structure",
                processes_path,
                format!("expected exactly one root process, found {roots:?}"),
                "snapshot.processes.single_root",
            ));
        }
    }

    StructuredIssue::sort_stable(&mut issues);
    issues
}

fn collect_ids(
    ids: impl Iterator<Item = u32>,
    path: FieldPath,
    issues: &mut Vec<StructuredIssue>,
) -> BTreeSet<u32> {
    let mut seen = BTreeSet::new();
    for (index, id) in ids.enumerate() {
        if !seen.insert(id) {
            issues.push(StructuredIssue::error(
                "snapshot_structure",
                path.clone().index(index).key("id"),
                format!("duplicate id {id}"),
                "snapshot.record.duplicate_id",
            ));
        }
    }
    seen
}

/// Builds the unclosed planning tree: every snapshot hold becomes a final
/// hold. Temporary holds are left to the closure pass.
pub fn build_process_tree(snapshot: &Snapshot) -> Result<ProcessTree, SnapshotError> {
    let issues = validate_snapshot(snapshot);
    if issues
        .iter()
        .any(|issue| issue.severity == IssueSeverity::Error)
    {
        return Err(SnapshotError::Invalid(issues));
    }

    let links = snapshot
        .processes
        .iter()
        .map(|process| (process.pid, process.ppid))
        .collect::<Vec<_>>();
    let mut tree = ProcessTree::new(&links)?;

    let mut used_files = BTreeSet::new();
    let mut used_shmem = BTreeSet::new();
    let mut used_pipes = BTreeSet::new();
    for process in &snapshot.processes {
        for target in process.fds.values() {
            match target {
                FdTarget::RegularFile { file_id } => used_files.insert(*file_id),
                FdTarget::SharedAnonMem { shmem_id } => used_shmem.insert(*shmem_id),
                FdTarget::PipeRead { pipe_id } | FdTarget::PipeWrite { pipe_id } => {
                    used_pipes.insert(*pipe_id)
                }
            };
        }
        for vma in &process.vmas {
            match vma.backing {
                VmaBacking::Anonymous => {}
                VmaBacking::File { file_id } => {
                    used_files.insert(file_id);
                }
                VmaBacking::SharedMem { shmem_id } => {
                    used_shmem.insert(shmem_id);
                }
            }
        }
    }

    let mut files = BTreeMap::new();
    for file in &snapshot.regular_files {
        if used_files.contains(&file.id) {
            let id = tree.insert_resource(ResourcePayload::RegularFile(file.clone()));
            files.insert(file.id, id);
        }
    }
    let mut shmems = BTreeMap::new();
    for shmem in &snapshot.shared_anon_mem {
        if used_shmem.contains(&shmem.id) {
            let id = tree.insert_resource(ResourcePayload::SharedAnonMem(*shmem));
            shmems.insert(shmem.id, id);
        }
    }
    let mut pipes = BTreeMap::new();
    for pipe in &snapshot.pipes {
        if used_pipes.contains(&pipe.id) {
            let id = tree.insert_resource(ResourcePayload::Pipe(*pipe));
            pipes.insert(pipe.id, id);
        }
    }

    let mut ordered = snapshot.processes.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|process| process.pid);

    let mut groups: BTreeMap<Pid, ResourceId> = BTreeMap::new();
    let mut sessions: BTreeMap<Pid, ResourceId> = BTreeMap::new();
    for process in ordered {
        let pid = process.pid;

        for (fd, target) in &process.fds {
            let (resource, handle) = match target {
                FdTarget::RegularFile { file_id } => {
                    (lookup(&files, *file_id)?, Handle::FileDescriptor(*fd))
                }
                FdTarget::SharedAnonMem { shmem_id } => {
                    (lookup(&shmems, *shmem_id)?, Handle::FileDescriptor(*fd))
                }
                FdTarget::PipeRead { pipe_id } => (lookup(&pipes, *pipe_id)?, Handle::PipeRead(*fd)),
                FdTarget::PipeWrite { pipe_id } => {
                    (lookup(&pipes, *pipe_id)?, Handle::PipeWrite(*fd))
                }
            };
            tree.add_final_hold(pid, resource, handle)?;
        }

        let group = *groups
            .entry(process.pgid)
            .or_insert_with(|| tree.insert_resource(ResourcePayload::ProcessGroup { pgid: process.pgid }));
        tree.add_final_hold(pid, group, Handle::NoHandle)?;
        let session = *sessions
            .entry(process.sid)
            .or_insert_with(|| tree.insert_resource(ResourcePayload::ProcessSession { sid: process.sid }));
        tree.add_final_hold(pid, session, Handle::NoHandle)?;

        for area in &process.vmas {
            let vma = tree.insert_resource(ResourcePayload::Vma(VmaPayload {
                owner: pid,
                area: area.clone(),
            }));
            tree.add_final_hold(pid, vma, Handle::NoHandle)?;
            let backing = match area.backing {
                VmaBacking::Anonymous => None,
                VmaBacking::File { file_id } => Some(lookup(&files, file_id)?),
                VmaBacking::SharedMem { shmem_id } => Some(lookup(&shmems, shmem_id)?),
            };
            if let Some(backing) = backing {
                tree.add_dependency(vma, backing, HandleKind::FileDescriptor)?;
            }
        }

        for (name, data) in &process.internals {
            let internals = tree.insert_resource(ResourcePayload::ProcessInternals {
                owner: pid,
                name: name.clone(),
                data: data.clone(),
            });
            tree.add_final_hold(pid, internals, Handle::NoHandle)?;
        }
    }

    Ok(tree)
}

fn lookup(ids: &BTreeMap<u32, ResourceId>, id: u32) -> Result<ResourceId, SnapshotError> {
    ids.get(&id)
        .copied()
        .ok_or(SnapshotError::Tree(TreeError::UnknownResource(ResourceId(id))))
}

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod tests;
