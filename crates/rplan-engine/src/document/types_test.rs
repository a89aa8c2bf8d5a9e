use super::{create_plan_document, decode_plan_json, encode_plan_json, PLAN_SCHEMA_0_0_1};
use crate::actions::Action;
use crate::planner::{PlanStats, RestorePlan};
use crate::test_support::{session, tree};
use rplan_core::{Handle, ResourceKind};

fn sample_plan(session: rplan_core::ResourceId) -> RestorePlan {
    let actions = vec![
        Action::Fork { parent: 0, child: 1 },
        Action::Create {
            process: 1,
            resource: session,
            handles: vec![Handle::NoHandle],
        },
    ];
    RestorePlan {
        buckets: actions.iter().map(|action| vec![action.clone()]).collect(),
        actions,
        stats: PlanStats::default(),
    }
}

#[test]
fn document_describes_resources_and_fingerprints_actions() {
    let mut tree = tree(&[(1, 0)]);
    let sid = session(&mut tree, 1);
    let plan = sample_plan(sid);

    let document = create_plan_document(tree.resources(), &plan, false).expect("document");
    assert_eq!(document.schema, PLAN_SCHEMA_0_0_1);
    assert_eq!(document.resources.len(), 1);
    assert_eq!(document.resources[0].kind, ResourceKind::ProcessSession);
    assert_eq!(document.resources[0].label, "Session(1)");
    assert_eq!(document.fingerprint.len(), 64);
    assert!(document.buckets.is_none());
    assert!(document.fingerprint_matches().expect("fingerprint"));

    let with_buckets = create_plan_document(tree.resources(), &plan, true).expect("document");
    assert_eq!(with_buckets.buckets.as_ref().map(Vec::len), Some(2));
    assert_eq!(with_buckets.fingerprint, document.fingerprint);
}

#[test]
fn document_json_roundtrip_and_tamper_detection() {
    let mut tree = tree(&[(1, 0)]);
    let sid = session(&mut tree, 1);
    let document = create_plan_document(tree.resources(), &sample_plan(sid), true).expect("document");

    let encoded = encode_plan_json(&document).expect("encode");
    let mut decoded = decode_plan_json(&encoded).expect("decode");
    assert_eq!(decoded, document);

    decoded.actions.pop();
    assert!(!decoded.fingerprint_matches().expect("fingerprint"));
}

#[test]
fn unknown_fields_are_rejected() {
    let input = r#"{"schema":"rplan-plan/0.0.1","fingerprint":"x","resources":[],"actions":[],"extra":1}"#;
    assert!(decode_plan_json(input).is_err());
}
