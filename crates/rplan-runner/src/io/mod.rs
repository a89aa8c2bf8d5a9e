mod read_snapshot;

pub use read_snapshot::{load_snapshot, load_snapshot_tree, SnapshotLoadError};
