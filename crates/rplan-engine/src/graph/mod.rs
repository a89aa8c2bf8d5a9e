mod build;
mod consistency;
mod sort;
mod types;

pub use build::build_action_graph;
pub use consistency::can_exist_together;
pub use sort::{depth_buckets, sequential_buckets, topological_order, GraphSortError};
pub use types::ActionGraph;
