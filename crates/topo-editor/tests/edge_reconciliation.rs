//! Integration tests: canvas edge/node deltas → queued edge constraints.

mod common;

use common::{el, loaded_store, rid};
use pretty_assertions::assert_eq;
use topo_core::{Constraint, EdgeConstraint, EdgeOperator, GraphEdge, GraphElements, GraphNode, Position};
use topo_editor::{EdgeChange, EditorError, NodeChange};

fn edge_constraint(c: &Constraint) -> &EdgeConstraint {
    match c {
        Constraint::Edge(e) => e,
        other => panic!("expected an edge constraint, got {other}"),
    }
}

#[tokio::test]
async fn edge_add_queues_exactly_one_must_exist() {
    let (store, _, _) = loaded_store().await;
    let edge = GraphEdge::new("role-to-jobs", "aws:iam_role:api-role", "aws:sqs_queue:jobs");

    store
        .on_edges_change(&[EdgeChange::Add { edge: edge.clone() }])
        .await
        .unwrap();

    let queued = store.unapplied_constraints();
    assert_eq!(queued.len(), 1);
    let c = edge_constraint(&queued[0]);
    assert_eq!(c.operator(), EdgeOperator::MustExist);
    assert_eq!(c.source(), &rid("aws:iam_role:api-role"));
    assert_eq!(c.target(), &rid("aws:sqs_queue:jobs"));
    assert!(store.edges().iter().any(|e| e.id == edge.id));
}

#[tokio::test]
async fn edge_remove_resolves_after_its_node_was_deleted() {
    let (store, _, _) = loaded_store().await;
    let edge_id = el("aws:lambda_function:api->aws:s3_bucket:assets");

    store.on_nodes_change(&[NodeChange::Remove {
        id: el("aws:s3_bucket:assets"),
    }]);
    // Removing the node detaches its edge without queueing anything.
    assert!(store.unapplied_constraints().is_empty());
    assert!(!store.edges().iter().any(|e| e.id == edge_id));
    for edge in store.edges() {
        assert!(store.nodes().iter().any(|n| n.id == edge.source));
        assert!(store.nodes().iter().any(|n| n.id == edge.target));
    }

    store
        .on_edges_change(&[EdgeChange::Remove { id: edge_id }])
        .await
        .unwrap();

    let queued = store.unapplied_constraints();
    assert_eq!(queued.len(), 1);
    let c = edge_constraint(&queued[0]);
    assert_eq!(c.operator(), EdgeOperator::MustNotExist);
    assert_eq!(c.source(), &rid("aws:lambda_function:api"));
    assert_eq!(c.target(), &rid("aws:s3_bucket:assets"));
    assert_eq!(c.data().unwrap().path[0], rid("aws:iam_role:api-role"));
}

#[tokio::test]
async fn edge_remove_names_original_resource_after_id_reuse() {
    let (store, _, _) = loaded_store().await;
    let assets = el("aws:s3_bucket:assets");

    store.on_nodes_change(&[NodeChange::Remove { id: assets }]);
    // The canvas hands the freed element id to an unrelated resource.
    let reused = GraphElements {
        nodes: vec![GraphNode::resource(assets, rid("aws:dynamodb_table:other"))],
        edges: Vec::new(),
    };
    store.add_graph_elements(reused, false).await.unwrap();

    store
        .on_edges_change(&[EdgeChange::Remove {
            id: el("aws:lambda_function:api->aws:s3_bucket:assets"),
        }])
        .await
        .unwrap();

    let queued = store.unapplied_constraints();
    assert_eq!(queued.len(), 1);
    let c = edge_constraint(&queued[0]);
    assert_eq!(c.operator(), EdgeOperator::MustNotExist);
    assert_eq!(c.target(), &rid("aws:s3_bucket:assets"));
}

#[tokio::test]
async fn node_only_removal_leaves_no_tombstones() {
    let (store, _, _) = loaded_store().await;

    // The role only appears on an edge path, never as an endpoint.
    store.on_nodes_change(&[NodeChange::Remove {
        id: el("aws:iam_role:api-role"),
    }]);
    assert!(store.select(|s| s.tombstones().is_empty()));

    store.on_nodes_change(&[NodeChange::Remove {
        id: el("aws:sqs_queue:jobs"),
    }]);
    assert_eq!(store.select(|s| s.tombstones().len()), 1);

    // Any edge batch consumes what the node removal detached.
    store
        .on_edges_change(&[EdgeChange::Add {
            edge: GraphEdge::new("api-assets-2", "aws:s3_bucket:assets", "aws:lambda_function:api"),
        }])
        .await
        .unwrap();
    assert!(store.select(|s| s.tombstones().is_empty()));
}

#[tokio::test]
async fn edge_remove_of_live_edge_mirrors_add() {
    let (store, _, _) = loaded_store().await;
    store
        .on_edges_change(&[EdgeChange::Remove {
            id: el("aws:lambda_function:api->aws:sqs_queue:jobs"),
        }])
        .await
        .unwrap();

    let queued = store.unapplied_constraints();
    assert_eq!(queued.len(), 1);
    let c = edge_constraint(&queued[0]);
    assert_eq!(c.operator(), EdgeOperator::MustNotExist);
    assert_eq!(c.target(), &rid("aws:sqs_queue:jobs"));
    assert_eq!(store.edges().len(), 1);
}

#[tokio::test]
async fn dangling_edge_batch_leaves_store_unchanged() {
    let (store, _, _) = loaded_store().await;
    let before = store.snapshot();

    let err = store
        .on_edges_change(&[
            EdgeChange::Add {
                edge: GraphEdge::new("ok", "aws:iam_role:api-role", "aws:sqs_queue:jobs"),
            },
            EdgeChange::Add {
                edge: GraphEdge::new("bad", "aws:iam_role:api-role", "nowhere"),
            },
        ])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EditorError::DanglingEdgeReference { endpoint, .. } if endpoint == el("nowhere")
    ));
    let after = store.snapshot();
    assert_eq!(after.edges, before.edges);
    assert_eq!(after.nodes, before.nodes);
    assert!(after.unapplied_constraints.is_empty());
}

#[tokio::test]
async fn node_moves_never_queue_constraints() {
    let (store, _, _) = loaded_store().await;
    store.on_nodes_change(&[NodeChange::Position {
        id: el("aws:sqs_queue:jobs"),
        position: Position::new(-40.0, 999.0),
    }]);

    assert!(store.unapplied_constraints().is_empty());
    let jobs = store
        .nodes()
        .into_iter()
        .find(|n| n.id == el("aws:sqs_queue:jobs"))
        .unwrap();
    assert_eq!(jobs.position, Position::new(-40.0, 999.0));
}

#[tokio::test]
async fn removing_selected_node_clears_selection() {
    let (store, _, _) = loaded_store().await;
    assert!(store.select_node(el("aws:sqs_queue:jobs")));

    store.on_nodes_change(&[NodeChange::Remove {
        id: el("aws:sqs_queue:jobs"),
    }]);

    assert_eq!(store.selected_node(), None);
    assert!(store.nodes().iter().all(|n| !n.data.is_selected));
}
