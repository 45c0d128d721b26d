//! Contract types for the layout collaborator.
//!
//! The layout algorithm itself lives outside this workspace; the editor only
//! hands it nodes, edges, and these options, and takes positions back.

use crate::model::{GraphEdge, GraphNode};
use serde::{Deserialize, Serialize};

/// Main flow direction of the layered layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutDirection {
    #[default]
    Right,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub direction: LayoutDirection,
    /// Gap between sibling nodes in the same layer. Default: **80**.
    pub node_spacing: f64,
    /// Gap between consecutive layers. Default: **120**.
    pub layer_spacing: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::Right,
            node_spacing: 80.0,
            layer_spacing: 120.0,
        }
    }
}

/// Re-positioned graph returned by the layout collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}
