//! Diagram-side data model: the nodes and edges the canvas renders.
//!
//! Every graph node carries the [`NodeId`] of the resource it stands for.
//! Positions belong to the layout collaborator; everything else is owned by
//! the editor store.

use crate::id::ElementId;
use crate::node_id::NodeId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ─── Geometry ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// What a node draws as. The discriminant travels with the payload so the
/// canvas can pick a renderer without inspecting the resource type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// A single resource card.
    #[default]
    Resource,
    /// A container resource (VPC, subnet, cluster) drawn as a sized frame.
    Group { width: f64, height: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    /// Backend identity. Only changed through an explicit resource replace.
    pub resource_id: NodeId,
    /// Display label; differs from the resource name only mid-rename.
    pub label: String,
    #[serde(default)]
    pub is_selected: bool,
    #[serde(default)]
    pub kind: NodeKind,
}

impl NodeData {
    pub fn new(resource_id: NodeId, kind: NodeKind) -> Self {
        let label = resource_id.display_name();
        Self {
            resource_id,
            label,
            is_selected: false,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: ElementId,
    #[serde(default)]
    pub position: Position,
    pub data: NodeData,
}

impl GraphNode {
    /// A resource card at the origin, labelled with the resource's display name.
    pub fn resource(id: impl Into<ElementId>, resource_id: NodeId) -> Self {
        Self {
            id: id.into(),
            position: Position::default(),
            data: NodeData::new(resource_id, NodeKind::Resource),
        }
    }

    /// A container frame of the given size.
    pub fn group(id: impl Into<ElementId>, resource_id: NodeId, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            position: Position::default(),
            data: NodeData::new(resource_id, NodeKind::Group { width, height }),
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    pub fn resource_id(&self) -> &NodeId {
        &self.data.resource_id
    }
}

// ─── Edges ───────────────────────────────────────────────────────────────

/// Visualization metadata attached to an edge.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeData {
    /// Intermediate resources the connection is routed through.
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub path: SmallVec<[NodeId; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl EdgeData {
    pub fn through(path: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            path: path.into_iter().collect(),
            label: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: ElementId,
    pub source: ElementId,
    pub target: ElementId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EdgeData>,
}

impl GraphEdge {
    pub fn new(
        id: impl Into<ElementId>,
        source: impl Into<ElementId>,
        target: impl Into<ElementId>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: EdgeData) -> Self {
        self.data = Some(data);
        self
    }

    /// Does this edge start or end at `node`?
    pub fn touches(&self, node: ElementId) -> bool {
        self.source == node || self.target == node
    }
}

// ─── Batches ─────────────────────────────────────────────────────────────

/// A partial set of nodes and edges, e.g. a drag-dropped resource and its
/// implied connections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphElements {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl GraphElements {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Look up a node by element id.
pub fn find_node(nodes: &[GraphNode], id: ElementId) -> Option<&GraphNode> {
    nodes.iter().find(|n| n.id == id)
}

/// Look up an edge by element id.
pub fn find_edge(edges: &[GraphEdge], id: ElementId) -> Option<&GraphEdge> {
    edges.iter().find(|e| e.id == id)
}
