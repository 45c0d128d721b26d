//! The editor state store.
//!
//! `EditorStore` owns the diagram (nodes, edges, selection), the cached
//! architecture and the queue of constraints not yet sent to the backend. UI
//! events mutate it through the operations below; the long-running ones
//! (`refresh_layout`, `apply_constraints`) await a collaborator and are
//! guarded so that at most one of each is in flight.
//!
//! State lives behind a plain mutex that is only ever held for synchronous
//! sections. Every await happens with the lock released, so a UI callback
//! can call back into the store while a collaborator is pending.

use crate::changes::{EdgeChange, NodeChange, apply_edge_changes, apply_node_changes};
use crate::collab::{ArchitectureApi, LayoutEngine};
use crate::config::EditorConfig;
use crate::derive::{Tombstones, derive_edge_constraints, derive_element_constraints};
use crate::error::{EditorError, Operation};
use crate::phase::{ApplyPhase, LayoutPhase};
use std::collections::{HashMap, HashSet};
use std::ops::{BitOr, BitOrAssign};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use topo_core::{
    ApplicationConstraint, Architecture, Constraint, EdgeConstraint, EdgeData, ElementId,
    GraphEdge, GraphElements, GraphNode, LayoutResult, NodeId, Position, ResourceConstraint,
    find_edge, find_node,
};

/// Layout passes one `refresh_layout` call may run when the graph keeps
/// changing underneath it.
const MAX_LAYOUT_PASSES: u32 = 3;

// ─── State ───────────────────────────────────────────────────────────────

/// Everything the store holds. Obtained as a snapshot; mutating a snapshot
/// does not affect the store.
#[derive(Debug, Clone, Default)]
pub struct EditorState {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub selected_node: Option<ElementId>,
    pub architecture: Option<Architecture>,
    /// Constraints derived from edits, in the order the edits happened.
    pub unapplied_constraints: Vec<Constraint>,
    pub apply_phase: ApplyPhase,
    pub layout_phase: LayoutPhase,
    tombstones: Tombstones,
}

impl EditorState {
    /// Edges detached by node removals whose own removal is still pending.
    pub fn tombstones(&self) -> &Tombstones {
        &self.tombstones
    }
}

/// Which parts of [`EditorState`] an operation touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSet(u8);

impl ChangeSet {
    pub const NODES: Self = Self(1);
    pub const EDGES: Self = Self(1 << 1);
    pub const SELECTION: Self = Self(1 << 2);
    pub const ARCHITECTURE: Self = Self(1 << 3);
    pub const CONSTRAINTS: Self = Self(1 << 4);
    pub const PHASE: Self = Self(1 << 5);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ChangeSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ChangeSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&EditorState, ChangeSet) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

/// Result of a successful [`EditorStore::apply_constraints`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The queue was empty; the backend was not called.
    NothingToApply,
    Applied { count: usize, reloaded: bool },
}

// ─── Phase guard ─────────────────────────────────────────────────────────

fn lock(state: &Mutex<EditorState>) -> MutexGuard<'_, EditorState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn finish_phase(state: &mut EditorState, op: Operation) {
    match op {
        Operation::Apply => state.apply_phase.finish(),
        Operation::Layout => state.layout_phase.finish(),
    }
}

/// Returns the phase of `op` to idle if the owning future is dropped before
/// it calls [`InFlight::complete`].
struct InFlight<'a> {
    state: &'a Mutex<EditorState>,
    op: Operation,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn new(state: &'a Mutex<EditorState>, op: Operation) -> Self {
        Self {
            state,
            op,
            armed: true,
        }
    }

    fn complete(&mut self, state: &mut EditorState) {
        finish_phase(state, self.op);
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            log::debug!("{} abandoned mid-flight, phase reset", self.op);
            finish_phase(&mut lock(self.state), self.op);
        }
    }
}

fn enqueue(state: &mut EditorState, constraints: impl IntoIterator<Item = Constraint>) {
    for constraint in constraints {
        log::trace!("queued {constraint}");
        state.unapplied_constraints.push(constraint);
    }
}

/// Take positions from a layout result for nodes that still exist. Nodes
/// added while the layout ran keep theirs.
fn merge_layout(state: &mut EditorState, layout: LayoutResult) {
    let positions: HashMap<ElementId, Position> = layout
        .nodes
        .into_iter()
        .map(|n| (n.id, n.position))
        .collect();
    for node in &mut state.nodes {
        if let Some(position) = positions.get(&node.id) {
            node.position = *position;
        }
    }

    let mut edge_data: HashMap<ElementId, Option<EdgeData>> = layout
        .edges
        .into_iter()
        .map(|e| (e.id, e.data))
        .collect();
    for edge in &mut state.edges {
        if let Some(data) = edge_data.remove(&edge.id) {
            edge.data = data;
        }
    }
}

fn resource_of(nodes: &[GraphNode], edge: &GraphEdge, id: ElementId) -> Result<NodeId, EditorError> {
    find_node(nodes, id)
        .map(|n| n.resource_id().clone())
        .ok_or(EditorError::DanglingEdgeReference {
            edge: edge.id,
            endpoint: id,
        })
}

// ─── Store ───────────────────────────────────────────────────────────────

pub struct EditorStore<A, L> {
    api: A,
    layout: L,
    config: EditorConfig,
    state: Mutex<EditorState>,
    subscribers: Mutex<Subscribers>,
}

impl<A: ArchitectureApi, L: LayoutEngine> EditorStore<A, L> {
    pub fn new(api: A, layout: L, config: EditorConfig) -> Self {
        Self {
            api,
            layout,
            config,
            state: Mutex::new(EditorState::default()),
            subscribers: Mutex::new(Subscribers::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EditorState> {
        lock(&self.state)
    }

    // ─── Observation ─────────────────────────────────────────────────────

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn snapshot(&self) -> EditorState {
        self.lock().clone()
    }

    /// Read a derived value under the lock without cloning the whole state.
    pub fn select<R>(&self, f: impl FnOnce(&EditorState) -> R) -> R {
        f(&self.lock())
    }

    pub fn nodes(&self) -> Vec<GraphNode> {
        self.select(|s| s.nodes.clone())
    }

    pub fn edges(&self) -> Vec<GraphEdge> {
        self.select(|s| s.edges.clone())
    }

    pub fn selected_node(&self) -> Option<ElementId> {
        self.select(|s| s.selected_node)
    }

    pub fn architecture(&self) -> Option<Architecture> {
        self.select(|s| s.architecture.clone())
    }

    pub fn unapplied_constraints(&self) -> Vec<Constraint> {
        self.select(|s| s.unapplied_constraints.clone())
    }

    pub fn apply_phase(&self) -> ApplyPhase {
        self.select(|s| s.apply_phase)
    }

    pub fn layout_phase(&self) -> LayoutPhase {
        self.select(|s| s.layout_phase)
    }

    /// Register a listener called after every operation that changes state.
    ///
    /// Listeners run on the caller's thread with no store lock held, so they
    /// may call back into the store.
    pub fn subscribe(
        &self,
        listener: impl Fn(&EditorState, ChangeSet) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut subs = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let id = SubscriptionId(subs.next);
        subs.next += 1;
        subs.listeners.push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subs.listeners.len();
        subs.listeners.retain(|(sid, _)| *sid != id);
        subs.listeners.len() != before
    }

    fn notify(&self, changes: ChangeSet) {
        if changes.is_empty() {
            return;
        }
        let listeners: Vec<Listener> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        if listeners.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for listener in listeners {
            listener(&snapshot, changes);
        }
    }

    // ─── Loading ─────────────────────────────────────────────────────────

    /// Fetch an architecture (latest when `version` is `None`) and replace
    /// the cached copy. The diagram is left alone.
    pub async fn load_architecture(&self, id: &str, version: Option<u64>) -> Result<(), EditorError> {
        let architecture = self
            .api
            .get_architecture(id, version)
            .await
            .map_err(EditorError::Fetch)?;
        log::info!("loaded architecture {} v{}", architecture.id, architecture.version);
        self.lock().architecture = Some(architecture);
        self.notify(ChangeSet::ARCHITECTURE);
        Ok(())
    }

    /// Replace the diagram with a view of the cached architecture, then lay
    /// it out.
    pub async fn load_view(&self, view: Option<&str>) -> Result<(), EditorError> {
        {
            let mut state = self.lock();
            let architecture = state
                .architecture
                .as_ref()
                .ok_or(EditorError::MissingArchitecture)?;
            let name = view.unwrap_or(self.config.default_view.as_str());
            let elements = architecture
                .view_elements(name)
                .ok_or_else(|| EditorError::UnknownView(name.to_owned()))?;
            state.nodes = elements.nodes;
            state.edges = elements.edges;
            state.selected_node = None;
            state.tombstones = Tombstones::default();
            state.layout_phase.mark_stale();
        }
        self.notify(ChangeSet::NODES | ChangeSet::EDGES | ChangeSet::SELECTION);
        self.relayout().await;
        Ok(())
    }

    // ─── Canvas events ───────────────────────────────────────────────────

    /// Fold node deltas into the diagram. Never derives constraints.
    ///
    /// Edges attached to a removed node leave the diagram with it, remembered
    /// with the resources they connected until the next edge batch.
    pub fn on_nodes_change(&self, changes: &[NodeChange]) {
        if changes.is_empty() {
            return;
        }
        let mut changed = ChangeSet::NODES;
        {
            let mut state = self.lock();
            let next = apply_node_changes(changes, &state.nodes);
            let live: HashSet<ElementId> = next.iter().map(|n| n.id).collect();

            let EditorState {
                nodes,
                edges,
                selected_node,
                layout_phase,
                tombstones,
                ..
            } = &mut *state;

            if nodes.iter().any(|n| !live.contains(&n.id)) {
                let resources: HashMap<ElementId, &NodeId> =
                    nodes.iter().map(|n| (n.id, n.resource_id())).collect();
                let (kept, detached): (Vec<_>, Vec<_>) = std::mem::take(edges)
                    .into_iter()
                    .partition(|e| live.contains(&e.source) && live.contains(&e.target));
                if !detached.is_empty() {
                    changed |= ChangeSet::EDGES;
                }
                for edge in detached {
                    match (resources.get(&edge.source), resources.get(&edge.target)) {
                        (Some(&source), Some(&target)) => {
                            tombstones.detach(edge, source.clone(), target.clone());
                        }
                        _ => log::debug!("dangling edge {} dropped on node removal", edge.id),
                    }
                }
                *edges = kept;
                if selected_node.is_some_and(|id| !live.contains(&id)) {
                    *selected_node = None;
                    changed |= ChangeSet::SELECTION;
                }
                layout_phase.mark_stale();
            }
            *nodes = next;
        }
        self.notify(changed);
    }

    /// Fold edge deltas into the diagram and queue the matching edge
    /// constraints, then re-layout.
    ///
    /// The returned future covers the layout pass too: it resolves once the
    /// relayout has finished or been coalesced into one already in flight.
    /// Layout failure is logged, not returned. A batch that references an
    /// unknown node is rejected whole, leaves the store untouched and skips
    /// the relayout.
    ///
    /// Edges detached by an earlier node removal are resolved by this batch
    /// and then forgotten; a removal reported in a later batch derives
    /// nothing.
    pub async fn on_edges_change(&self, changes: &[EdgeChange]) -> Result<(), EditorError> {
        if changes.is_empty() {
            return Ok(());
        }
        {
            let mut state = self.lock();
            let derived =
                derive_edge_constraints(changes, &state.nodes, &state.edges, &state.tombstones)?;
            state.edges = apply_edge_changes(changes, &state.edges);
            state.tombstones.clear();
            enqueue(&mut state, derived);
            state.layout_phase.mark_stale();
        }
        self.notify(ChangeSet::EDGES | ChangeSet::CONSTRAINTS);
        self.relayout().await;
        Ok(())
    }

    /// Make `id` the only selected node. Unknown ids are ignored.
    pub fn select_node(&self, id: ElementId) -> bool {
        {
            let mut state = self.lock();
            if find_node(&state.nodes, id).is_none() {
                log::debug!("select ignored: unknown node {id}");
                return false;
            }
            for node in &mut state.nodes {
                node.data.is_selected = node.id == id;
            }
            state.selected_node = Some(id);
        }
        self.notify(ChangeSet::NODES | ChangeSet::SELECTION);
        true
    }

    pub fn deselect_node(&self, id: ElementId) -> bool {
        {
            let mut state = self.lock();
            let mut changed = false;
            if let Some(node) = state.nodes.iter_mut().find(|n| n.id == id) {
                changed = std::mem::take(&mut node.data.is_selected);
            }
            if state.selected_node == Some(id) {
                state.selected_node = None;
                changed = true;
            }
            if !changed {
                return false;
            }
        }
        self.notify(ChangeSet::NODES | ChangeSet::SELECTION);
        true
    }

    // ─── Programmatic edits ──────────────────────────────────────────────

    /// Merge new nodes and edges into the diagram, queueing `Add` and
    /// `MustExist` constraints unless `generate_constraints` is false, then
    /// re-layout.
    pub async fn add_graph_elements(
        &self,
        mut elements: GraphElements,
        generate_constraints: bool,
    ) -> Result<(), EditorError> {
        if elements.is_empty() {
            return Ok(());
        }
        let mut changed = ChangeSet::NODES | ChangeSet::EDGES;
        {
            let mut state = self.lock();

            let mut node_ids: HashSet<ElementId> = state.nodes.iter().map(|n| n.id).collect();
            for node in &mut elements.nodes {
                if !node_ids.insert(node.id) {
                    return Err(EditorError::DuplicateElement(node.id));
                }
                node.data.is_selected = false;
            }
            let mut edge_ids: HashSet<ElementId> = state.edges.iter().map(|e| e.id).collect();
            for edge in &elements.edges {
                if !edge_ids.insert(edge.id) {
                    return Err(EditorError::DuplicateElement(edge.id));
                }
            }

            let mut merged = state.nodes.clone();
            merged.extend(elements.nodes.iter().cloned());
            let derived = derive_element_constraints(&elements, &merged)?;

            state.nodes = merged;
            state.edges.extend(elements.edges);
            if generate_constraints {
                enqueue(&mut state, derived);
                changed |= ChangeSet::CONSTRAINTS;
            }
            state.layout_phase.mark_stale();
        }
        self.notify(changed);
        self.relayout().await;
        Ok(())
    }

    /// Delete nodes and edges by element id. Edges attached to a deleted node
    /// go with it. Queues `Remove` per node and `MustNotExist` per listed
    /// edge unless `generate_constraints` is false.
    pub async fn delete_elements(
        &self,
        node_ids: &[ElementId],
        edge_ids: &[ElementId],
        generate_constraints: bool,
    ) -> Result<(), EditorError> {
        if node_ids.is_empty() && edge_ids.is_empty() {
            return Ok(());
        }
        let mut changed = ChangeSet::NODES | ChangeSet::EDGES;
        {
            let mut state = self.lock();

            let mut derived: Vec<Constraint> = Vec::with_capacity(node_ids.len() + edge_ids.len());
            for id in node_ids {
                let node = find_node(&state.nodes, *id).ok_or(EditorError::UnknownElement(*id))?;
                derived.push(ApplicationConstraint::remove(node.resource_id().clone()).into());
            }
            for id in edge_ids {
                let edge = find_edge(&state.edges, *id).ok_or(EditorError::UnknownElement(*id))?;
                let source = resource_of(&state.nodes, edge, edge.source)?;
                let target = resource_of(&state.nodes, edge, edge.target)?;
                derived.push(EdgeConstraint::must_not_exist(source, target, edge.data.clone()).into());
            }

            let doomed: HashSet<ElementId> = node_ids.iter().copied().collect();
            let cut: HashSet<ElementId> = edge_ids.iter().copied().collect();
            state.nodes.retain(|n| !doomed.contains(&n.id));
            state.edges.retain(|e| {
                !cut.contains(&e.id) && !doomed.contains(&e.source) && !doomed.contains(&e.target)
            });
            if state.selected_node.is_some_and(|id| doomed.contains(&id)) {
                state.selected_node = None;
                changed |= ChangeSet::SELECTION;
            }
            if generate_constraints {
                enqueue(&mut state, derived);
                changed |= ChangeSet::CONSTRAINTS;
            }
            state.layout_phase.mark_stale();
        }
        self.notify(changed);
        self.relayout().await;
        Ok(())
    }

    /// Point a node at a different resource and queue a `Replace`. Replacing
    /// a resource with itself does nothing.
    pub fn replace_resource(&self, element: ElementId, new_id: NodeId) -> Result<(), EditorError> {
        {
            let mut state = self.lock();
            let node = state
                .nodes
                .iter_mut()
                .find(|n| n.id == element)
                .ok_or(EditorError::UnknownElement(element))?;
            if node.data.resource_id == new_id {
                return Ok(());
            }
            let old = std::mem::replace(&mut node.data.resource_id, new_id.clone());
            node.data.label = new_id.display_name();
            enqueue(&mut state, [ApplicationConstraint::replace(old, new_id).into()]);
        }
        self.notify(ChangeSet::NODES | ChangeSet::CONSTRAINTS);
        Ok(())
    }

    /// Queue a property assignment for a resource.
    pub fn configure_resource(
        &self,
        resource: NodeId,
        property: impl Into<String>,
        value: serde_json::Value,
    ) {
        enqueue(
            &mut self.lock(),
            [ResourceConstraint::equals(resource, property, value).into()],
        );
        self.notify(ChangeSet::CONSTRAINTS);
    }

    // ─── Layout ──────────────────────────────────────────────────────────

    /// Lay the diagram out with the layout engine.
    ///
    /// Fails with `Reentrant(Layout)` while another layout is in flight; that
    /// pass will pick up any structural edit made in the meantime.
    pub async fn refresh_layout(&self) -> Result<(), EditorError> {
        let mut guard = {
            let mut state = self.lock();
            if let Err(err) = state.layout_phase.begin() {
                log::debug!("layout coalesced into the pass in flight");
                return Err(err);
            }
            InFlight::new(&self.state, Operation::Layout)
        };
        self.notify(ChangeSet::PHASE);

        let mut pass = 1;
        loop {
            let (nodes, edges) = self.select(|s| (s.nodes.clone(), s.edges.clone()));
            let result = self
                .layout
                .auto_layout(&nodes, &edges, &self.config.layout)
                .await;

            let outcome = {
                let mut state = self.lock();
                match result {
                    Ok(layout) => {
                        merge_layout(&mut state, layout);
                        if state.layout_phase.take_stale() && pass < MAX_LAYOUT_PASSES {
                            None
                        } else {
                            guard.complete(&mut state);
                            Some(Ok(()))
                        }
                    }
                    Err(err) => {
                        guard.complete(&mut state);
                        Some(Err(err))
                    }
                }
            };

            match outcome {
                None => {
                    self.notify(ChangeSet::NODES | ChangeSet::EDGES);
                    log::debug!("graph changed during layout pass {pass}, laying out again");
                    pass += 1;
                }
                Some(Ok(())) => {
                    self.notify(ChangeSet::NODES | ChangeSet::EDGES | ChangeSet::PHASE);
                    return Ok(());
                }
                Some(Err(err)) => {
                    log::warn!("layout failed: {err}");
                    self.notify(ChangeSet::PHASE);
                    return Err(EditorError::Layout(err));
                }
            }
        }
    }

    async fn relayout(&self) {
        if !self.config.relayout_on_structural_change {
            return;
        }
        if let Err(err) = self.refresh_layout().await {
            log::debug!("relayout after edit: {err}");
        }
    }

    // ─── Apply ───────────────────────────────────────────────────────────

    /// Send the queued constraints to the backend.
    ///
    /// On success exactly the constraints that were sent leave the queue;
    /// anything queued while the request was pending stays for the next
    /// apply. On failure the queue is untouched. The apply phase is idle
    /// again when this returns, whatever the outcome.
    pub async fn apply_constraints(&self) -> Result<ApplyOutcome, EditorError> {
        let (mut guard, architecture_id, version, batch) = {
            let mut state = self.lock();
            if state.apply_phase.is_busy() {
                log::debug!("apply coalesced into the batch in flight");
                return Err(EditorError::Reentrant(Operation::Apply));
            }
            let architecture = state
                .architecture
                .as_ref()
                .ok_or(EditorError::MissingArchitecture)?;
            if state.unapplied_constraints.is_empty() {
                return Ok(ApplyOutcome::NothingToApply);
            }
            let id = architecture.id.clone();
            let version = architecture.version;
            state.apply_phase.begin()?;
            let batch = state.unapplied_constraints.clone();
            (InFlight::new(&self.state, Operation::Apply), id, version, batch)
        };
        self.notify(ChangeSet::PHASE);

        let result = self
            .api
            .apply_constraints(&architecture_id, version, &batch)
            .await;

        {
            let mut state = self.lock();
            if result.is_ok() {
                let sent = batch.len().min(state.unapplied_constraints.len());
                state.unapplied_constraints.drain(..sent);
            }
            guard.complete(&mut state);
        }

        match result {
            Ok(()) => {
                log::info!(
                    "applied {} constraints to {architecture_id} v{version}",
                    batch.len()
                );
                self.notify(ChangeSet::CONSTRAINTS | ChangeSet::PHASE);
                let reloaded = if self.config.reload_after_apply {
                    match self.load_architecture(&architecture_id, None).await {
                        Ok(()) => true,
                        Err(err) => {
                            log::warn!("reload after apply failed: {err}");
                            false
                        }
                    }
                } else {
                    false
                };
                Ok(ApplyOutcome::Applied {
                    count: batch.len(),
                    reloaded,
                })
            }
            Err(err) => {
                log::warn!("apply to {architecture_id} v{version} failed: {err}");
                self.notify(ChangeSet::PHASE);
                Err(EditorError::RemoteApplyFailure(err))
            }
        }
    }
}
