//! Collaborator seams: the remote architecture service and the layout engine.
//!
//! Both are injected into [`EditorStore`](crate::EditorStore) so that tests
//! can substitute fakes. Neither trait says anything about transport.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use topo_core::{Architecture, Constraint, GraphEdge, GraphNode, LayoutOptions, LayoutResult};

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rejected by backend ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

#[derive(Debug, Clone, Error)]
#[error("layout engine failed: {0}")]
pub struct LayoutError(pub String);

/// Remote store of architectures.
#[async_trait]
pub trait ArchitectureApi: Send + Sync {
    /// Fetch an architecture; `None` means the latest version.
    async fn get_architecture(
        &self,
        id: &str,
        version: Option<u64>,
    ) -> Result<Architecture, ApiError>;

    /// Submit an ordered batch of constraints against `version`.
    async fn apply_constraints(
        &self,
        id: &str,
        version: u64,
        constraints: &[Constraint],
    ) -> Result<(), ApiError>;
}

/// Assigns positions to diagram elements.
#[async_trait]
pub trait LayoutEngine: Send + Sync {
    async fn auto_layout(
        &self,
        nodes: &[GraphNode],
        edges: &[GraphEdge],
        options: &LayoutOptions,
    ) -> Result<LayoutResult, LayoutError>;
}

#[async_trait]
impl<T: ArchitectureApi + ?Sized> ArchitectureApi for Arc<T> {
    async fn get_architecture(
        &self,
        id: &str,
        version: Option<u64>,
    ) -> Result<Architecture, ApiError> {
        (**self).get_architecture(id, version).await
    }

    async fn apply_constraints(
        &self,
        id: &str,
        version: u64,
        constraints: &[Constraint],
    ) -> Result<(), ApiError> {
        (**self).apply_constraints(id, version, constraints).await
    }
}

#[async_trait]
impl<T: LayoutEngine + ?Sized> LayoutEngine for Arc<T> {
    async fn auto_layout(
        &self,
        nodes: &[GraphNode],
        edges: &[GraphEdge],
        options: &LayoutOptions,
    ) -> Result<LayoutResult, LayoutError> {
        (**self).auto_layout(nodes, edges, options).await
    }
}
