//! Editor state store for architecture diagrams.
//!
//! Keeps a diagram of cloud resources in step with a remote architecture:
//! canvas edits become [`Constraint`](topo_core::Constraint)s queued for the
//! backend, layout is delegated to a [`LayoutEngine`], and
//! [`EditorStore::apply_constraints`] pushes the queue to an
//! [`ArchitectureApi`].

pub mod changes;
pub mod collab;
pub mod config;
pub mod derive;
pub mod error;
pub mod phase;
pub mod store;

pub use changes::{EdgeChange, NodeChange, apply_edge_changes, apply_node_changes};
pub use collab::{ApiError, ArchitectureApi, LayoutEngine, LayoutError};
pub use config::EditorConfig;
pub use derive::{DetachedEdge, Tombstones, derive_edge_constraints, derive_element_constraints};
pub use error::{EditorError, Operation};
pub use phase::{ApplyPhase, LayoutPhase};
pub use store::{ApplyOutcome, ChangeSet, EditorState, EditorStore, SubscriptionId};
