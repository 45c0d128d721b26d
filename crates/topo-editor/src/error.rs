use crate::collab::{ApiError, LayoutError};
use std::fmt;
use thiserror::Error;
use topo_core::ElementId;

/// The two store operations guarded against re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Apply,
    Layout,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Apply => f.write_str("apply"),
            Operation::Layout => f.write_str("layout"),
        }
    }
}

#[derive(Debug, Error)]
pub enum EditorError {
    /// The operation is already in flight; the call was coalesced into it.
    #[error("{0} already in flight")]
    Reentrant(Operation),

    #[error("no architecture loaded")]
    MissingArchitecture,

    #[error("edge {edge} references unknown node {endpoint}")]
    DanglingEdgeReference {
        edge: ElementId,
        endpoint: ElementId,
    },

    #[error("element {0} already exists")]
    DuplicateElement(ElementId),

    #[error("unknown element {0}")]
    UnknownElement(ElementId),

    #[error("architecture has no view named {0:?}")]
    UnknownView(String),

    #[error("failed to fetch architecture")]
    Fetch(#[source] ApiError),

    #[error("applying constraints failed")]
    RemoteApplyFailure(#[source] ApiError),

    #[error("layout failed")]
    Layout(#[source] LayoutError),
}

impl EditorError {
    /// Benign errors mean "someone else is already doing this" and are safe
    /// to drop on the floor.
    pub fn is_benign(&self) -> bool {
        matches!(self, EditorError::Reentrant(_))
    }
}
