//! Constraints: client-side instructions for reconciling the backend architecture.
//!
//! A constraint is created at the moment a structural diagram edit happens
//! and is never mutated afterwards. The serde mapping below *is* the wire
//! format handed to the apply endpoint, so it must stay deterministic:
//! the same constraint always serializes to the same bytes.

use crate::model::EdgeData;
use crate::node_id::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Operators ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationOperator {
    Add,
    Remove,
    /// Swap a resource for a new identity (rename).
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeOperator {
    MustExist,
    MustNotExist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceOperator {
    Equals,
}

// ─── Constraint kinds ────────────────────────────────────────────────────

/// "This resource should (not) exist."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConstraint {
    operator: ApplicationOperator,
    node: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    replacement_node: Option<NodeId>,
}

impl ApplicationConstraint {
    pub fn add(node: NodeId) -> Self {
        Self {
            operator: ApplicationOperator::Add,
            node,
            replacement_node: None,
        }
    }

    pub fn remove(node: NodeId) -> Self {
        Self {
            operator: ApplicationOperator::Remove,
            node,
            replacement_node: None,
        }
    }

    pub fn replace(node: NodeId, replacement: NodeId) -> Self {
        Self {
            operator: ApplicationOperator::Replace,
            node,
            replacement_node: Some(replacement),
        }
    }

    pub fn operator(&self) -> ApplicationOperator {
        self.operator
    }

    pub fn node(&self) -> &NodeId {
        &self.node
    }

    pub fn replacement_node(&self) -> Option<&NodeId> {
        self.replacement_node.as_ref()
    }
}

/// Directed endpoints of an edge constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeTarget {
    pub source: NodeId,
    pub target: NodeId,
}

/// "This connection should (not) exist."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeConstraint {
    operator: EdgeOperator,
    target: EdgeTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<EdgeData>,
}

impl EdgeConstraint {
    pub fn new(
        operator: EdgeOperator,
        source: NodeId,
        target: NodeId,
        data: Option<EdgeData>,
    ) -> Self {
        Self {
            operator,
            target: EdgeTarget { source, target },
            data,
        }
    }

    pub fn must_exist(source: NodeId, target: NodeId, data: Option<EdgeData>) -> Self {
        Self::new(EdgeOperator::MustExist, source, target, data)
    }

    pub fn must_not_exist(source: NodeId, target: NodeId, data: Option<EdgeData>) -> Self {
        Self::new(EdgeOperator::MustNotExist, source, target, data)
    }

    pub fn operator(&self) -> EdgeOperator {
        self.operator
    }

    pub fn source(&self) -> &NodeId {
        &self.target.source
    }

    pub fn target(&self) -> &NodeId {
        &self.target.target
    }

    pub fn data(&self) -> Option<&EdgeData> {
        self.data.as_ref()
    }
}

/// "This resource's `property` should equal `value`."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConstraint {
    operator: ResourceOperator,
    target: NodeId,
    property: String,
    value: serde_json::Value,
}

impl ResourceConstraint {
    pub fn equals(target: NodeId, property: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            operator: ResourceOperator::Equals,
            target,
            property: property.into(),
            value,
        }
    }

    pub fn operator(&self) -> ResourceOperator {
        self.operator
    }

    pub fn target(&self) -> &NodeId {
        &self.target
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn value(&self) -> &serde_json::Value {
        &self.value
    }
}

// ─── Union ───────────────────────────────────────────────────────────────

/// Any constraint, tagged on the wire by `scope`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Constraint {
    Application(ApplicationConstraint),
    Edge(EdgeConstraint),
    Resource(ResourceConstraint),
}

impl Constraint {
    /// Does this constraint mention `resource` anywhere?
    pub fn touches(&self, resource: &NodeId) -> bool {
        match self {
            Constraint::Application(c) => {
                c.node() == resource || c.replacement_node() == Some(resource)
            }
            Constraint::Edge(c) => c.source() == resource || c.target() == resource,
            Constraint::Resource(c) => c.target() == resource,
        }
    }
}

impl From<ApplicationConstraint> for Constraint {
    fn from(c: ApplicationConstraint) -> Self {
        Constraint::Application(c)
    }
}

impl From<EdgeConstraint> for Constraint {
    fn from(c: EdgeConstraint) -> Self {
        Constraint::Edge(c)
    }
}

impl From<ResourceConstraint> for Constraint {
    fn from(c: ResourceConstraint) -> Self {
        Constraint::Resource(c)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Application(c) => match c.replacement_node() {
                Some(new) => write!(f, "{:?} {} -> {new}", c.operator(), c.node()),
                None => write!(f, "{:?} {}", c.operator(), c.node()),
            },
            Constraint::Edge(c) => {
                write!(f, "{:?} {} -> {}", c.operator(), c.source(), c.target())
            }
            Constraint::Resource(c) => {
                write!(f, "Equals {}.{} = {}", c.target(), c.property(), c.value())
            }
        }
    }
}
