//! Embedded property-graph store on SQLite.
//!
//! vertexstore persists vertices and edges as rows carrying an opaque JSON
//! document (`props`), and answers reads through a structured predicate
//! language, a fixpoint adjacency traversal and conjunctive triple-pattern
//! queries.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use vertexstore::{Edge, GraphStore, TraversalDirection, Vertex, WhereClause};
//! use serde_json::json;
//!
//! let store = GraphStore::open_in_memory()?;
//! store.insert_vertex(&Vertex::new("a").with_props(json!({ "kind": "person" })))?;
//! store.insert_vertex(&Vertex::new("b"))?;
//! store.insert_edge(&Edge::new("a", "b").with_name("knows"))?;
//!
//! let people = store
//!     .search_vertices(&WhereClause::new().eq("kind", "person"), None)?
//!     .collect_all()?;
//!
//! for event in store.traverse("a", TraversalDirection::Both) {
//!     let event = event?;
//!     println!("{:?} {}", event.kind, event.id);
//! }
//! # Ok::<(), vertexstore::GraphStoreError>(())
//! ```
//!
//! # Public API Organization
//!
//! - [`GraphStore`] - store handle, vertex/edge CRUD and search
//! - [`WhereClause`] / [`compile`] - predicate compiler
//! - [`Traversal`] - lazy traversal from a seed vertex
//! - [`Batch`] - transactional multi-row insert with deduplication
//! - [`TripleInput`] / [`normalize`] - nested triples flattened into records
//! - [`PatternQuery`] / [`compile_pattern`] - conjunctive pattern queries
//! - [`StoreConfig`] / [`open_store`] - configuration
//!
//! # Integrity
//!
//! Vertex and edge ids are unique and edge endpoints must name existing
//! vertices when written. Deleting a vertex does not delete its edges.

pub mod batch;
pub mod config;
pub mod errors;
pub mod graph;
pub mod ids;
pub mod params;
pub mod pattern;
pub mod predicate;
pub mod schema;
pub mod traversal;
pub mod triples;

pub use crate::batch::{Batch, CommitReport};
pub use crate::config::{StoreConfig, open_store};
pub use crate::errors::GraphStoreError;
pub use crate::graph::{
    Edge, EdgeDirection, GraphStore, Pagination, Record, RecordCursor, Vertex,
};
pub use crate::ids::content_id;
pub use crate::pattern::{
    CompiledPattern, EdgePattern, PatternQuery, PatternRow, Term, TriplePattern, Variable,
    VariableFactory, VertexPattern, compile_pattern,
};
pub use crate::predicate::{CompiledPredicate, Condition, Operation, WhereClause, compile};
pub use crate::schema::{DEFAULT_SCHEMA, SchemaDefinition, ensure_schema};
pub use crate::traversal::{Traversal, TraversalDirection, TraversalEvent, TraversalKind};
pub use crate::triples::{
    EdgeInput, EdgeRef, ObjectRef, PredicateObject, TripleInput, VertexInput, VertexRef,
    normalize,
};
