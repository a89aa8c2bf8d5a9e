mod jsonl;
mod store;
mod types;

pub use jsonl::{decode_action_jsonl_line, encode_action_jsonl_line};
pub use store::{load_plan_from_path, save_plan_to_path, PlanStoreError};
pub use types::{
    create_plan_document, decode_plan_json, encode_plan_json, PlanDocument, PlanResourceEntry,
    PLAN_SCHEMA_0_0_1,
};
