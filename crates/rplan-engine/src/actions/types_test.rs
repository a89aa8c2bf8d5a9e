use super::{Action, ActionKind};
use rplan_core::{Handle, ResourceId, ResourcePayload, ResourceTable};
use serde_json::json;

#[test]
fn fork_involves_only_parent() {
    let fork = Action::Fork { parent: 1, child: 2 };
    assert_eq!(fork.executor(), 1);
    assert_eq!(fork.involved(), vec![1]);
    assert_eq!(fork.resource(), None);
    assert_eq!(fork.kind(), ActionKind::Fork);
}

#[test]
fn share_involves_both_ends_once() {
    let share = Action::Share {
        process_from: 1,
        process_to: 2,
        resource: ResourceId(0),
        handle_from: Handle::FileDescriptor(3),
        handle_to: Handle::FileDescriptor(4),
    };
    assert_eq!(share.involved(), vec![1, 2]);

    let self_share = Action::Share {
        process_from: 1,
        process_to: 1,
        resource: ResourceId(0),
        handle_from: Handle::FileDescriptor(3),
        handle_to: Handle::FileDescriptor(4),
    };
    assert_eq!(self_share.involved(), vec![1]);
}

#[test]
fn actions_serialize_with_type_tag() {
    let remove = Action::Remove {
        process: 6,
        resource: ResourceId(2),
        handle: Handle::NoHandle,
    };
    let value = serde_json::to_value(&remove).expect("serialize");
    assert_eq!(
        value,
        json!({"type": "remove", "process": 6, "resource": 2, "handle": {"kind": "no_handle"}})
    );
    let back: Action = serde_json::from_value(value).expect("deserialize");
    assert_eq!(back, remove);
}

#[test]
fn describe_uses_resource_labels() {
    let mut resources = ResourceTable::default();
    let session = resources.insert(ResourcePayload::ProcessSession { sid: 5 });
    let create = Action::Create {
        process: 5,
        resource: session,
        handles: vec![Handle::NoHandle],
    };
    assert_eq!(create.describe(&resources), "create Session(5) in 5 [-]");
    assert_eq!(create.to_string(), "create r0 in 5 [-]");
    assert_eq!(
        Action::Fork { parent: 0, child: 1 }.to_string(),
        "fork 0 -> 1"
    );
}
