//! The backend-owned architecture record, as cached by the editor.
//!
//! The editor never edits an `Architecture`; it only replaces its cached copy
//! wholesale after a fetch, and reads resource metadata and views out of it.

use crate::id::ElementId;
use crate::model::{EdgeData, GraphEdge, GraphElements, GraphNode, NodeData, NodeKind, Position};
use crate::node_id::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Free-form configuration of one resource, keyed by property name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceMetadata(pub BTreeMap<String, serde_json::Value>);

impl ResourceMetadata {
    pub fn get(&self, property: &str) -> Option<&serde_json::Value> {
        self.0.get(property)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewNode {
    pub resource_id: String,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewEdge {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
}

/// A named visualization of the architecture (e.g. `dataflow`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct View {
    #[serde(default)]
    pub nodes: Vec<ViewNode>,
    #[serde(default)]
    pub edges: Vec<ViewEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Architecture {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Latest version known to the editor; constraints are applied against it.
    pub version: u64,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceMetadata>,
    #[serde(default)]
    pub views: BTreeMap<String, View>,
}

impl Architecture {
    pub fn new(id: impl Into<String>, version: u64) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            version,
            resources: BTreeMap::new(),
            views: BTreeMap::new(),
        }
    }

    pub fn resource(&self, id: &NodeId) -> Option<&ResourceMetadata> {
        self.resources.get(&id.to_string())
    }

    /// Look up metadata by a raw key coming from the UI. A malformed key is
    /// "no resource selected", not an error.
    pub fn resource_by_key(&self, key: &str) -> Option<(NodeId, &ResourceMetadata)> {
        let id = NodeId::parse_or_log(key)?;
        let meta = self.resource(&id)?;
        Some((id, meta))
    }

    /// Build diagram elements for the named view.
    ///
    /// Entries with malformed resource ids, duplicate nodes, edges whose
    /// endpoints are not in the view, and repeated edges between the same
    /// pair are dropped with a warning. The result never contains a dangling
    /// edge or a reused element id; an edge is `source->target`, matching the
    /// backend's identity for a connection.
    pub fn view_elements(&self, view: &str) -> Option<GraphElements> {
        let view = self.views.get(view)?;
        let mut elements = GraphElements::default();
        let mut by_resource: HashMap<NodeId, ElementId> = HashMap::new();
        let mut connected: HashSet<(ElementId, ElementId)> = HashSet::new();

        for entry in &view.nodes {
            let Some(resource_id) = NodeId::parse_or_log(&entry.resource_id) else {
                log::warn!("view node dropped: malformed id {:?}", entry.resource_id);
                continue;
            };
            if by_resource.contains_key(&resource_id) {
                log::warn!("view node dropped: duplicate resource {resource_id}");
                continue;
            }
            let id = ElementId::intern(&resource_id.to_string());
            by_resource.insert(resource_id.clone(), id);
            elements.nodes.push(GraphNode {
                id,
                position: entry.position.unwrap_or_default(),
                data: NodeData::new(resource_id, entry.kind.clone()),
            });
        }

        for entry in &view.edges {
            let endpoints = NodeId::parse_or_log(&entry.source)
                .and_then(|s| by_resource.get(&s).copied())
                .zip(
                    NodeId::parse_or_log(&entry.target)
                        .and_then(|t| by_resource.get(&t).copied()),
                );
            let Some((source, target)) = endpoints else {
                log::warn!("view edge dropped: {} -> {} is dangling", entry.source, entry.target);
                continue;
            };
            if !connected.insert((source, target)) {
                log::warn!("view edge dropped: duplicate {} -> {}", entry.source, entry.target);
                continue;
            }
            let path: Vec<NodeId> = entry
                .path
                .iter()
                .filter_map(|hop| NodeId::parse_or_log(hop))
                .collect();
            let id = ElementId::intern(&format!("{source}->{target}"));
            let mut edge = GraphEdge::new(id, source, target);
            if !path.is_empty() {
                edge = edge.with_data(EdgeData::through(path));
            }
            elements.edges.push(edge);
        }

        Some(elements)
    }
}
