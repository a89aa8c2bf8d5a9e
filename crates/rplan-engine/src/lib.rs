pub mod actions;
pub mod closure;
pub mod creators;
pub mod document;
pub mod error;
pub mod graph;
pub mod interpreter;
pub mod planner;

pub use actions::{generate_actions, Action, ActionId, ActionKind, ActionsIndex};
pub use closure::{close_process_tree, ClosureReport};
pub use creators::{creator_handles, get_creator};
pub use document::{
    create_plan_document, decode_action_jsonl_line, decode_plan_json, encode_action_jsonl_line,
    encode_plan_json, load_plan_from_path, save_plan_to_path, PlanDocument, PlanResourceEntry,
    PlanStoreError, PLAN_SCHEMA_0_0_1,
};
pub use error::PlanError;
pub use graph::{
    build_action_graph, can_exist_together, depth_buckets, sequential_buckets, topological_order,
    ActionGraph, GraphSortError,
};
pub use interpreter::{
    shrink_with_inheritance, validate_plan, validate_plan_values, InterpreterError,
    ModelInterpreter, PlanValidationError, ShrinkOutcome,
};
pub use planner::{plan_tree, PlanOrder, PlanStats, PlannerOptions, RestorePlan};

#[cfg(test)]
mod test_support;
