//! Canvas change events and the pure reducers that fold them into the graph.
//!
//! The canvas reports what the user did as small deltas (a node was dragged,
//! an edge was connected). The reducers here only reshape the node/edge
//! lists; deciding which deltas mean something to the backend is the job of
//! [`crate::derive`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use topo_core::{ElementId, GraphEdge, GraphNode, NodeKind, Position};

/// A delta reported by the canvas for a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeChange {
    /// Node was dragged or placed.
    Position { id: ElementId, position: Position },
    /// A container frame was resized. Ignored for plain resource cards.
    Dimensions {
        id: ElementId,
        width: f64,
        height: f64,
    },
    Remove { id: ElementId },
}

impl NodeChange {
    pub fn id(&self) -> ElementId {
        match self {
            NodeChange::Position { id, .. }
            | NodeChange::Dimensions { id, .. }
            | NodeChange::Remove { id } => *id,
        }
    }
}

/// A delta reported by the canvas for an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EdgeChange {
    Add { edge: GraphEdge },
    Remove { id: ElementId },
}

/// Fold node deltas into a new node list. Unknown ids are ignored.
pub fn apply_node_changes(changes: &[NodeChange], nodes: &[GraphNode]) -> Vec<GraphNode> {
    let removed: HashSet<ElementId> = changes
        .iter()
        .filter_map(|c| match c {
            NodeChange::Remove { id } => Some(*id),
            _ => None,
        })
        .collect();

    let mut next: Vec<GraphNode> = nodes
        .iter()
        .filter(|n| !removed.contains(&n.id))
        .cloned()
        .collect();

    for change in changes {
        let Some(node) = next.iter_mut().find(|n| n.id == change.id()) else {
            continue;
        };
        match change {
            NodeChange::Position { position, .. } => node.position = *position,
            NodeChange::Dimensions { width, height, .. } => {
                if let NodeKind::Group {
                    width: w,
                    height: h,
                } = &mut node.data.kind
                {
                    *w = *width;
                    *h = *height;
                }
            }
            NodeChange::Remove { .. } => {}
        }
    }

    next
}

/// Fold edge deltas into a new edge list, in order.
pub fn apply_edge_changes(changes: &[EdgeChange], edges: &[GraphEdge]) -> Vec<GraphEdge> {
    let mut next = edges.to_vec();
    for change in changes {
        match change {
            EdgeChange::Add { edge } => next.push(edge.clone()),
            EdgeChange::Remove { id } => next.retain(|e| e.id != *id),
        }
    }
    next
}
