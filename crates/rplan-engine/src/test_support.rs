use rplan_core::{
    Handle, Pid, PipeRecord, ProcessTree, RegularFileRecord, ResourceId, ResourcePayload,
    SharedAnonMemRecord, VmAreaRecord, VmaBacking, VmaPayload,
};

pub(crate) fn tree(links: &[(Pid, Pid)]) -> ProcessTree {
    ProcessTree::new(links).expect("test tree")
}

pub(crate) fn file(tree: &mut ProcessTree, id: u32) -> ResourceId {
    tree.insert_resource(ResourcePayload::RegularFile(RegularFileRecord {
        id,
        path: format!("/tmp/file-{id}"),
        size: 0,
        pos: 0,
        flags: 0,
        mode: 0o644,
    }))
}

pub(crate) fn shmem(tree: &mut ProcessTree, id: u32) -> ResourceId {
    tree.insert_resource(ResourcePayload::SharedAnonMem(SharedAnonMemRecord { id }))
}

pub(crate) fn pipe(tree: &mut ProcessTree, id: u32) -> ResourceId {
    tree.insert_resource(ResourcePayload::Pipe(PipeRecord { id }))
}

pub(crate) fn session(tree: &mut ProcessTree, sid: Pid) -> ResourceId {
    tree.insert_resource(ResourcePayload::ProcessSession { sid })
}

pub(crate) fn group(tree: &mut ProcessTree, pgid: Pid) -> ResourceId {
    tree.insert_resource(ResourcePayload::ProcessGroup { pgid })
}

pub(crate) fn vma(tree: &mut ProcessTree, owner: Pid, start: u64, end: u64) -> ResourceId {
    tree.insert_resource(ResourcePayload::Vma(VmaPayload {
        owner,
        area: VmAreaRecord {
            start,
            end,
            pgoff: 0,
            prot: 0,
            flags: 0,
            backing: VmaBacking::Anonymous,
        },
    }))
}

pub(crate) fn internals(tree: &mut ProcessTree, owner: Pid, name: &str) -> ResourceId {
    tree.insert_resource(ResourcePayload::ProcessInternals {
        owner,
        name: name.to_string(),
        data: serde_json::Value::Null,
    })
}

pub(crate) fn hold(tree: &mut ProcessTree, pid: Pid, resource: ResourceId, handle: Handle) {
    tree.add_final_hold(pid, resource, handle).expect("final hold");
}
