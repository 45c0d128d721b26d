//! Turning diagram edits into backend constraints.
//!
//! Derivation runs against the graph as it was *before* the edit is folded
//! in, and validates the whole batch before producing anything: a batch that
//! references a node nobody knows about yields an error and no constraints.

use crate::changes::EdgeChange;
use crate::error::EditorError;
use std::collections::VecDeque;
use topo_core::{
    ApplicationConstraint, Constraint, EdgeConstraint, ElementId, GraphEdge, GraphElements,
    GraphNode, NodeId,
};

/// Detached edges held before the cap drops the oldest.
const MAX_DETACHED_EDGES: usize = 256;

/// An edge taken off the canvas with one of its nodes, along with the
/// resources it connected at that moment.
#[derive(Debug, Clone)]
pub struct DetachedEdge {
    pub edge: GraphEdge,
    pub source: NodeId,
    pub target: NodeId,
}

/// Edges that went away with a removed node, waiting for the canvas to
/// report their own removal.
///
/// A canvas typically reports a node removal before the removals of its
/// incident edges. By then the element ids may already point elsewhere, so
/// the endpoints are resolved when the edge is detached, not when its removal
/// arrives. The store clears this after every edge batch.
#[derive(Debug, Clone, Default)]
pub struct Tombstones {
    edges: VecDeque<DetachedEdge>,
}

impl Tombstones {
    pub fn detach(&mut self, edge: GraphEdge, source: NodeId, target: NodeId) {
        if self.edges.len() == MAX_DETACHED_EDGES {
            if let Some(oldest) = self.edges.pop_front() {
                log::debug!("detached edge {} dropped unreported", oldest.edge.id);
            }
        }
        self.edges.push_back(DetachedEdge {
            edge,
            source,
            target,
        });
    }

    pub fn edge(&self, id: ElementId) -> Option<&DetachedEdge> {
        self.edges.iter().find(|d| d.edge.id == id)
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

fn live_resource(nodes: &[GraphNode], edge: &GraphEdge, id: ElementId) -> Result<NodeId, EditorError> {
    nodes
        .iter()
        .find(|n| n.id == id)
        .map(|n| n.resource_id().clone())
        .ok_or(EditorError::DanglingEdgeReference {
            edge: edge.id,
            endpoint: id,
        })
}

/// One `MustExist` per added edge and one `MustNotExist` per removed edge,
/// in delta order.
///
/// New edges must join live nodes. A removed edge that was detached along
/// with a node names the resources captured in `tombstones`, even if its
/// element ids have since been reused. Removing an edge the store has never
/// seen derives nothing.
pub fn derive_edge_constraints(
    changes: &[EdgeChange],
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    tombstones: &Tombstones,
) -> Result<Vec<Constraint>, EditorError> {
    let mut added: Vec<&GraphEdge> = Vec::new();
    let mut out = Vec::with_capacity(changes.len());

    for change in changes {
        match change {
            EdgeChange::Add { edge } => {
                if edges.iter().chain(added.iter().copied()).any(|e| e.id == edge.id) {
                    return Err(EditorError::DuplicateElement(edge.id));
                }
                let source = live_resource(nodes, edge, edge.source)?;
                let target = live_resource(nodes, edge, edge.target)?;
                out.push(EdgeConstraint::must_exist(source, target, edge.data.clone()).into());
                added.push(edge);
            }
            EdgeChange::Remove { id } => {
                let live = edges
                    .iter()
                    .chain(added.iter().copied())
                    .find(|e| e.id == *id);
                let constraint = match (live, tombstones.edge(*id)) {
                    (Some(edge), _) => {
                        let source = live_resource(nodes, edge, edge.source)?;
                        let target = live_resource(nodes, edge, edge.target)?;
                        EdgeConstraint::must_not_exist(source, target, edge.data.clone())
                    }
                    (None, Some(detached)) => EdgeConstraint::must_not_exist(
                        detached.source.clone(),
                        detached.target.clone(),
                        detached.edge.data.clone(),
                    ),
                    (None, None) => {
                        log::debug!("edge removal for unknown edge {id} ignored");
                        continue;
                    }
                };
                out.push(constraint.into());
            }
        }
    }

    Ok(out)
}

/// `Add` for every new node, then `MustExist` for every new edge.
///
/// `merged` is the node list with the new nodes already appended, so new
/// edges may join new and existing nodes alike.
pub fn derive_element_constraints(
    elements: &GraphElements,
    merged: &[GraphNode],
) -> Result<Vec<Constraint>, EditorError> {
    let mut out: Vec<Constraint> = elements
        .nodes
        .iter()
        .map(|n| ApplicationConstraint::add(n.resource_id().clone()).into())
        .collect();

    for edge in &elements.edges {
        let source = live_resource(merged, edge, edge.source)?;
        let target = live_resource(merged, edge, edge.target)?;
        out.push(EdgeConstraint::must_exist(source, target, edge.data.clone()).into());
    }

    Ok(out)
}
