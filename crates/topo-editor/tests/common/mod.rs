//! Fakes for the store's collaborators, shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use topo_core::{
    Architecture, Constraint, ElementId, GraphEdge, GraphNode, LayoutOptions, LayoutResult,
    NodeId, Position,
};
use topo_editor::{ApiError, ArchitectureApi, EditorConfig, EditorStore, LayoutEngine, LayoutError};

pub type Store = EditorStore<Arc<FakeApi>, Arc<FakeLayout>>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn fixture() -> Architecture {
    serde_json::from_str(include_str!("../fixtures/architecture.json")).unwrap()
}

pub fn rid(s: &str) -> NodeId {
    NodeId::parse(s).unwrap()
}

/// Element id of a node loaded from a view: the canonical resource id.
pub fn el(s: &str) -> ElementId {
    ElementId::intern(s)
}

// ─── Gate ────────────────────────────────────────────────────────────────

/// Holds the next collaborator call open until released. One-shot: only the
/// first call after `arm` waits.
#[derive(Default)]
pub struct Gate {
    armed: AtomicBool,
    started: Notify,
    release: Notify,
}

impl Gate {
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Resolves once a held call has started waiting.
    pub async fn started(&self) {
        self.started.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.started.notify_one();
            self.release.notified().await;
        }
    }
}

// ─── Architecture API ────────────────────────────────────────────────────

pub struct FakeApi {
    pub architecture: Mutex<Architecture>,
    pub applied: Mutex<Vec<(String, u64, Vec<Constraint>)>>,
    pub fetches: AtomicUsize,
    pub fail_apply: AtomicBool,
    pub gate: Gate,
}

impl FakeApi {
    pub fn new(architecture: Architecture) -> Arc<Self> {
        Arc::new(Self {
            architecture: Mutex::new(architecture),
            applied: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
            fail_apply: AtomicBool::new(false),
            gate: Gate::default(),
        })
    }

    pub fn applied(&self) -> Vec<(String, u64, Vec<Constraint>)> {
        self.applied.lock().unwrap().clone()
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArchitectureApi for FakeApi {
    async fn get_architecture(
        &self,
        id: &str,
        _version: Option<u64>,
    ) -> Result<Architecture, ApiError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let architecture = self.architecture.lock().unwrap().clone();
        if architecture.id != id {
            return Err(ApiError::Rejected {
                status: 404,
                message: format!("no architecture {id}"),
            });
        }
        Ok(architecture)
    }

    async fn apply_constraints(
        &self,
        id: &str,
        version: u64,
        constraints: &[Constraint],
    ) -> Result<(), ApiError> {
        self.gate.pass().await;
        if self.fail_apply.load(Ordering::SeqCst) {
            return Err(ApiError::Network("connection reset".into()));
        }
        self.applied
            .lock()
            .unwrap()
            .push((id.to_owned(), version, constraints.to_vec()));
        self.architecture.lock().unwrap().version += 1;
        Ok(())
    }
}

// ─── Layout ──────────────────────────────────────────────────────────────

/// Lays nodes out left to right in input order.
#[derive(Default)]
pub struct FakeLayout {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    pub gate: Gate,
}

impl FakeLayout {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LayoutEngine for FakeLayout {
    async fn auto_layout(
        &self,
        nodes: &[GraphNode],
        edges: &[GraphEdge],
        options: &LayoutOptions,
    ) -> Result<LayoutResult, LayoutError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.pass().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(LayoutError("cycle in layer assignment".into()));
        }
        let nodes = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let mut n = n.clone();
                n.position = Position::new(i as f64 * options.layer_spacing, 0.0);
                n
            })
            .collect();
        Ok(LayoutResult {
            nodes,
            edges: edges.to_vec(),
        })
    }
}

// ─── Setup ───────────────────────────────────────────────────────────────

pub fn store_with(config: EditorConfig) -> (Store, Arc<FakeApi>, Arc<FakeLayout>) {
    init_logger();
    let api = FakeApi::new(fixture());
    let layout = FakeLayout::new();
    let store = EditorStore::new(Arc::clone(&api), Arc::clone(&layout), config);
    (store, api, layout)
}

/// A store with the fixture architecture loaded and its dataflow view laid out.
pub async fn loaded_store() -> (Store, Arc<FakeApi>, Arc<FakeLayout>) {
    let (store, api, layout) = store_with(EditorConfig::default());
    store.load_architecture("arch-1", None).await.unwrap();
    store.load_view(None).await.unwrap();
    (store, api, layout)
}
