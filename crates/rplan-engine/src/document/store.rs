use super::{decode_plan_json, encode_plan_json, PlanDocument};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum PlanStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn save_plan_to_path(path: impl AsRef<Path>, document: &PlanDocument) -> Result<(), PlanStoreError> {
    let encoded = encode_plan_json(document)?;
    std::fs::write(path, encoded)?;
    Ok(())
}

pub fn load_plan_from_path(path: impl AsRef<Path>) -> Result<PlanDocument, PlanStoreError> {
    let content = std::fs::read_to_string(path)?;
    Ok(decode_plan_json(&content)?)
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
