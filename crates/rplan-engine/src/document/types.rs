use crate::actions::Action;
use crate::planner::RestorePlan;
use rplan_core::{fingerprint_hex, ResourceId, ResourceKind, ResourcePayload, ResourceTable};
use serde::{Deserialize, Serialize};

pub const PLAN_SCHEMA_0_0_1: &str = "rplan-plan/0.0.1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanResourceEntry {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub label: String,
    pub payload: ResourcePayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanDocument {
    pub schema: String,
    pub fingerprint: String,
    pub resources: Vec<PlanResourceEntry>,
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<Vec<Action>>>,
}

impl PlanDocument {
    pub fn fingerprint_matches(&self) -> serde_json::Result<bool> {
        Ok(fingerprint_hex(&self.actions)? == self.fingerprint)
    }
}

pub fn create_plan_document(
    resources: &ResourceTable,
    plan: &RestorePlan,
    include_buckets: bool,
) -> serde_json::Result<PlanDocument> {
    let resources = resources
        .iter()
        .map(|resource| PlanResourceEntry {
            id: resource.id,
            kind: resource.kind(),
            label: resource.label(),
            payload: resource.payload.clone(),
        })
        .collect();
    Ok(PlanDocument {
        schema: PLAN_SCHEMA_0_0_1.to_string(),
        fingerprint: fingerprint_hex(&plan.actions)?,
        resources,
        actions: plan.actions.clone(),
        buckets: include_buckets.then(|| plan.buckets.clone()),
    })
}

pub fn encode_plan_json(document: &PlanDocument) -> serde_json::Result<String> {
    serde_json::to_string_pretty(document)
}

pub fn decode_plan_json(input: &str) -> serde_json::Result<PlanDocument> {
    serde_json::from_str::<PlanDocument>(input)
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
