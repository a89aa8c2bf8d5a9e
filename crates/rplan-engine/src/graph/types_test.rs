use super::ActionGraph;
use crate::actions::{Action, ActionId};
use rplan_core::{Handle, ResourceId};

fn sample() -> ActionGraph {
    let mut graph = ActionGraph::new(vec![
        Action::Fork { parent: 0, child: 1 },
        Action::Create {
            process: 1,
            resource: ResourceId(0),
            handles: vec![Handle::NoHandle],
        },
        Action::Remove {
            process: 1,
            resource: ResourceId(0),
            handle: Handle::NoHandle,
        },
    ]);
    graph.add_edge(ActionId(0), ActionId(1));
    graph.add_edge(ActionId(1), ActionId(2));
    graph.add_edge(ActionId(0), ActionId(2));
    graph
}

#[test]
fn edges_are_deduplicated_and_self_edges_ignored() {
    let mut graph = sample();
    assert!(!graph.add_edge(ActionId(0), ActionId(1)));
    assert!(!graph.add_edge(ActionId(2), ActionId(2)));
    assert!(!graph.add_edge(ActionId(0), ActionId(9)));
    assert_eq!(graph.edge_count(), 3);
    assert_eq!(
        graph.predecessors(ActionId(2)).collect::<Vec<_>>(),
        vec![ActionId(0), ActionId(1)]
    );
}

#[test]
fn filtering_drops_vertices_and_incident_edges() {
    let graph = sample();
    let filtered = graph.filtered(|action| matches!(action, Action::Create { .. }));

    assert_eq!(filtered.len(), 2);
    assert_eq!(
        filtered.edges().collect::<Vec<_>>(),
        vec![(ActionId(0), ActionId(1))]
    );
    assert!(matches!(
        filtered.action(ActionId(1)),
        Some(Action::Remove { .. })
    ));
}
