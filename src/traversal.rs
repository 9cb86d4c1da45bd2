//! Fixpoint adjacency walk from a seed vertex.
//!
//! Reached vertex ids are expanded in discovery order. Expanding `v` emits
//! `vertex(v)` if the vertex exists, then every incoming edge of `v` as a
//! `sources` event and every outgoing edge as a `targets` event, each in
//! insertion order; the far endpoint of each new edge joins the frontier.
//! A vertex is expanded at most once and an `(edge, kind)` pair is emitted at
//! most once, so the walk terminates on cyclic graphs.

use std::collections::VecDeque;

use ahash::AHashSet;
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::{
    errors::GraphStoreError,
    graph::{EDGE_COLUMNS, Edge, GraphStore, Record, row_to_edge},
};

const INCOMING_SQL: &str = "WHERE target = ?1 ORDER BY rowid";
const OUTGOING_SQL: &str = "WHERE source = ?1 ORDER BY rowid";

/// Which adjacency the walk follows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraversalDirection {
    #[default]
    Both,
    /// Incoming edges only.
    Sources,
    /// Outgoing edges only.
    Targets,
}

impl TraversalDirection {
    fn follows_sources(self) -> bool {
        self != TraversalDirection::Targets
    }

    fn follows_targets(self) -> bool {
        self != TraversalDirection::Sources
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalKind {
    Vertex,
    /// Edge found as an incoming edge of a reached vertex.
    Sources,
    /// Edge found as an outgoing edge of a reached vertex.
    Targets,
}

/// One visitation. `id` is a vertex id for [`TraversalKind::Vertex`] and an
/// edge id otherwise; `record` is only filled by
/// [`GraphStore::traverse_with_props`].
#[derive(Clone, Debug, PartialEq)]
pub struct TraversalEvent {
    pub id: String,
    pub kind: TraversalKind,
    pub record: Option<Record>,
}

/// Lazy traversal sequence. Queries run as the iterator is advanced; an
/// error ends the sequence.
pub struct Traversal<'a> {
    store: &'a GraphStore,
    direction: TraversalDirection,
    with_props: bool,
    limit: Option<usize>,
    frontier: VecDeque<String>,
    expanded: AHashSet<String>,
    emitted_edges: AHashSet<(String, TraversalKind)>,
    pending: VecDeque<TraversalEvent>,
    done: bool,
}

impl<'a> Traversal<'a> {
    fn new(
        store: &'a GraphStore,
        seed: &str,
        direction: TraversalDirection,
        with_props: bool,
    ) -> Self {
        let mut frontier = VecDeque::new();
        frontier.push_back(seed.to_string());
        Self {
            store,
            direction,
            with_props,
            limit: store.config().traversal_limit,
            frontier,
            expanded: AHashSet::new(),
            emitted_edges: AHashSet::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Caps how many distinct vertices this walk expands, overriding the
    /// store configuration.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn expanded_count(&self) -> usize {
        self.expanded.len()
    }

    fn expand(&mut self, id: &str) -> Result<(), GraphStoreError> {
        tracing::debug!(vertex = id, "traversal expand");
        if let Some(vertex) = self.store.get_vertex_by_id(id)? {
            let record = self.with_props.then(|| Record::Vertex(vertex));
            self.pending.push_back(TraversalEvent {
                id: id.to_string(),
                kind: TraversalKind::Vertex,
                record,
            });
        }
        if self.direction.follows_sources() {
            for edge in self.adjacent(INCOMING_SQL, id)? {
                let next = edge.source.clone();
                self.emit_edge(edge, TraversalKind::Sources, next);
            }
        }
        if self.direction.follows_targets() {
            for edge in self.adjacent(OUTGOING_SQL, id)? {
                let next = edge.target.clone();
                self.emit_edge(edge, TraversalKind::Targets, next);
            }
        }
        Ok(())
    }

    fn emit_edge(&mut self, edge: Edge, kind: TraversalKind, next: String) {
        let id = edge.resolved_id();
        if !self.emitted_edges.insert((id.clone(), kind)) {
            return;
        }
        if !self.expanded.contains(&next) {
            self.frontier.push_back(next);
        }
        let record = self.with_props.then(|| Record::Edge(edge));
        self.pending.push_back(TraversalEvent { id, kind, record });
    }

    fn adjacent(&self, filter: &str, id: &str) -> Result<Vec<Edge>, GraphStoreError> {
        let mut stmt = self
            .store
            .connection()
            .prepare_cached(&format!("SELECT {EDGE_COLUMNS} FROM edges {filter}"))?;
        let rows = stmt.query_map(params![id], row_to_edge)?;
        let mut edges = Vec::new();
        for edge in rows {
            edges.push(edge?);
        }
        Ok(edges)
    }
}

impl Iterator for Traversal<'_> {
    type Item = Result<TraversalEvent, GraphStoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.done {
                return None;
            }
            let Some(id) = self.frontier.pop_front() else {
                self.done = true;
                return None;
            };
            if self.expanded.contains(&id) {
                continue;
            }
            if let Some(limit) = self.limit {
                if self.expanded.len() >= limit {
                    tracing::warn!(limit, "traversal limit reached, stopping early");
                    self.frontier.clear();
                    self.done = true;
                    return None;
                }
            }
            self.expanded.insert(id.clone());
            if let Err(err) = self.expand(&id) {
                self.pending.clear();
                self.done = true;
                return Some(Err(err));
            }
        }
    }
}

impl GraphStore {
    /// Walks the graph from `seed`, yielding vertex and edge ids.
    pub fn traverse(&self, seed: &str, direction: TraversalDirection) -> Traversal<'_> {
        Traversal::new(self, seed, direction, false)
    }

    /// Like [`GraphStore::traverse`], with the full record attached to each event.
    pub fn traverse_with_props(&self, seed: &str, direction: TraversalDirection) -> Traversal<'_> {
        Traversal::new(self, seed, direction, true)
    }
}
