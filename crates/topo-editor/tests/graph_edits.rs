//! Integration tests: selection, programmatic edits, views and subscriptions.

mod common;

use common::{el, fixture, loaded_store, rid, store_with};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::{Arc, Mutex};
use topo_core::{
    ApplicationConstraint, Constraint, EdgeConstraint, GraphEdge, GraphElements, GraphNode,
    NodeKind, ResourceConstraint,
};
use topo_editor::{ChangeSet, EditorConfig, EditorError};

fn selected(store: &common::Store) -> Vec<String> {
    store
        .nodes()
        .iter()
        .filter(|n| n.data.is_selected)
        .map(|n| n.id.to_string())
        .collect()
}

// ─── Selection ───────────────────────────────────────────────────────────

#[tokio::test]
async fn selection_is_exclusive() {
    let (store, _, _) = loaded_store().await;

    assert!(store.select_node(el("aws:s3_bucket:assets")));
    assert!(store.select_node(el("aws:sqs_queue:jobs")));
    assert_eq!(selected(&store), vec!["aws:sqs_queue:jobs".to_owned()]);
    assert_eq!(store.selected_node(), Some(el("aws:sqs_queue:jobs")));

    assert!(!store.select_node(el("not-on-canvas")));
    assert_eq!(store.selected_node(), Some(el("aws:sqs_queue:jobs")));

    assert!(store.deselect_node(el("aws:sqs_queue:jobs")));
    assert!(selected(&store).is_empty());
    assert_eq!(store.selected_node(), None);
    assert!(!store.deselect_node(el("aws:sqs_queue:jobs")));
}

// ─── add_graph_elements ──────────────────────────────────────────────────

fn cache_elements() -> GraphElements {
    GraphElements {
        nodes: vec![GraphNode::resource("cache", rid("aws:elasticache_cluster:cache"))],
        edges: vec![GraphEdge::new(
            "api-cache",
            "aws:lambda_function:api",
            "cache",
        )],
    }
}

#[tokio::test]
async fn added_elements_queue_adds_then_edges() {
    let (store, _, _) = loaded_store().await;
    store.add_graph_elements(cache_elements(), true).await.unwrap();

    assert_eq!(
        store.unapplied_constraints(),
        vec![
            Constraint::from(ApplicationConstraint::add(rid("aws:elasticache_cluster:cache"))),
            Constraint::from(EdgeConstraint::must_exist(
                rid("aws:lambda_function:api"),
                rid("aws:elasticache_cluster:cache"),
                None,
            )),
        ]
    );
    assert_eq!(store.nodes().len(), 5);
    assert_eq!(store.edges().len(), 3);
}

#[tokio::test]
async fn suppressed_constraints_still_merge() {
    let (store, _, _) = loaded_store().await;
    store.add_graph_elements(cache_elements(), false).await.unwrap();

    assert!(store.unapplied_constraints().is_empty());
    assert_eq!(store.nodes().len(), 5);
}

#[tokio::test]
async fn duplicate_or_dangling_elements_are_rejected() {
    let (store, _, _) = loaded_store().await;
    let before = store.snapshot();

    let duplicate = GraphElements {
        nodes: vec![GraphNode::resource("aws:sqs_queue:jobs", rid("aws:sqs_queue:jobs"))],
        edges: Vec::new(),
    };
    assert!(matches!(
        store.add_graph_elements(duplicate, true).await,
        Err(EditorError::DuplicateElement(_))
    ));

    let dangling = GraphElements {
        nodes: Vec::new(),
        edges: vec![GraphEdge::new("x", "aws:sqs_queue:jobs", "ghost")],
    };
    assert!(matches!(
        store.add_graph_elements(dangling, true).await,
        Err(EditorError::DanglingEdgeReference { .. })
    ));

    let after = store.snapshot();
    assert_eq!(after.nodes, before.nodes);
    assert_eq!(after.edges, before.edges);
    assert!(after.unapplied_constraints.is_empty());
}

// ─── delete / replace / configure ────────────────────────────────────────

#[tokio::test]
async fn delete_elements_queues_removals_and_drops_incident_edges() {
    let (store, _, _) = loaded_store().await;
    store.select_node(el("aws:s3_bucket:assets"));

    store
        .delete_elements(
            &[el("aws:s3_bucket:assets")],
            &[el("aws:lambda_function:api->aws:sqs_queue:jobs")],
            true,
        )
        .await
        .unwrap();

    let queued = store.unapplied_constraints();
    assert_eq!(queued.len(), 2);
    assert_eq!(
        queued[0],
        Constraint::from(ApplicationConstraint::remove(rid("aws:s3_bucket:assets")))
    );
    assert_eq!(
        queued[1],
        Constraint::from(EdgeConstraint::must_not_exist(
            rid("aws:lambda_function:api"),
            rid("aws:sqs_queue:jobs"),
            None,
        ))
    );
    assert!(store.edges().is_empty());
    assert_eq!(store.nodes().len(), 3);
    assert_eq!(store.selected_node(), None);

    assert!(matches!(
        store.delete_elements(&[el("aws:s3_bucket:assets")], &[], true).await,
        Err(EditorError::UnknownElement(_))
    ));
}

#[tokio::test]
async fn replace_resource_relabels_and_queues_replace() {
    let (store, _, _) = loaded_store().await;
    let node = el("aws:sqs_queue:jobs");

    store
        .replace_resource(node, rid("aws:sqs_queue:jobs-v2"))
        .unwrap();
    // Same id again is a no-op.
    store
        .replace_resource(node, rid("aws:sqs_queue:jobs-v2"))
        .unwrap();

    assert_eq!(
        store.unapplied_constraints(),
        vec![Constraint::from(ApplicationConstraint::replace(
            rid("aws:sqs_queue:jobs"),
            rid("aws:sqs_queue:jobs-v2"),
        ))]
    );
    let renamed = store.nodes().into_iter().find(|n| n.id == node).unwrap();
    assert_eq!(renamed.data.label, "jobs-v2");
    assert!(matches!(
        store.replace_resource(el("ghost"), rid("aws:sqs_queue:x")),
        Err(EditorError::UnknownElement(_))
    ));
}

#[tokio::test]
async fn configure_resource_queues_equals() {
    let (store, _, _) = loaded_store().await;
    store.configure_resource(rid("aws:sqs_queue:jobs"), "FifoQueue", json!(false));

    assert_eq!(
        store.unapplied_constraints(),
        vec![Constraint::from(ResourceConstraint::equals(
            rid("aws:sqs_queue:jobs"),
            "FifoQueue",
            json!(false),
        ))]
    );
}

// ─── Views ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn views_need_an_architecture_and_a_known_name() {
    let (store, _, _) = store_with(EditorConfig::default());
    assert!(matches!(
        store.load_view(None).await,
        Err(EditorError::MissingArchitecture)
    ));

    store.load_architecture("arch-1", None).await.unwrap();
    assert!(matches!(
        store.load_view(Some("security")).await,
        Err(EditorError::UnknownView(name)) if name == "security"
    ));

    store.load_view(Some("network")).await.unwrap();
    let nodes = store.nodes();
    assert_eq!(nodes.len(), 1);
    assert_eq!(
        nodes[0].data.kind,
        NodeKind::Group {
            width: 400.0,
            height: 300.0
        }
    );
}

#[tokio::test]
async fn load_architecture_replaces_cache_without_touching_graph() {
    let (store, api, _) = loaded_store().await;
    let nodes = store.nodes();
    let mut next = fixture();
    next.version = 12;
    next.views.clear();
    *api.architecture.lock().unwrap() = next;

    store.load_architecture("arch-1", None).await.unwrap();

    assert_eq!(store.architecture().unwrap().version, 12);
    assert_eq!(store.nodes(), nodes);
    assert!(matches!(
        store.load_architecture("arch-404", None).await,
        Err(EditorError::Fetch(_))
    ));
}

// ─── Subscriptions ───────────────────────────────────────────────────────

#[tokio::test]
async fn subscribers_see_changes_until_unsubscribed() {
    let (store, _, _) = loaded_store().await;
    let seen: Arc<Mutex<Vec<(ChangeSet, Option<String>)>>> = Arc::default();

    let sink = Arc::clone(&seen);
    let id = store.subscribe(move |state, changes| {
        let selected = state.selected_node.map(|id| id.to_string());
        sink.lock().unwrap().push((changes, selected));
    });

    store.select_node(el("aws:s3_bucket:assets"));
    {
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.contains(ChangeSet::SELECTION));
        assert_eq!(seen[0].1.as_deref(), Some("aws:s3_bucket:assets"));
    }

    assert!(store.unsubscribe(id));
    assert!(!store.unsubscribe(id));
    store.deselect_node(el("aws:s3_bucket:assets"));
    assert_eq!(seen.lock().unwrap().len(), 1);
}
