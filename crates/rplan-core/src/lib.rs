pub mod field_path;
pub mod fingerprint;
pub mod handle;
pub mod indexer;
pub mod issues;
pub mod process;
pub mod resource;
pub mod snapshot;
pub mod tree;

pub use field_path::{FieldPath, FieldPathSegment};
pub use fingerprint::{fingerprint_hex, stable_json_bytes};
pub use handle::{Handle, HandleAllocator, HandleError, HandleKind};
pub use indexer::ResourceIndexer;
pub use issues::{IssueSeverity, StructuredIssue};
pub use process::Process;
pub use resource::{
    Resource, ResourceId, ResourceKind, ResourceKindParseError, ResourcePayload, ResourceTable,
    VmaPayload,
};
pub use snapshot::{
    build_process_tree, validate_snapshot, FdTarget, PipeRecord, RegularFileRecord,
    SharedAnonMemRecord, Snapshot, SnapshotError, SnapshotProcess, VmAreaRecord, VmaBacking,
    SNAPSHOT_SCHEMA_0_0_1,
};
pub use tree::{Pid, ProcessTree, TreeError, ROOT_PID};
