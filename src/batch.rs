//! Transactional multi-row insert of mixed vertex and edge records.
//!
//! Records are staged in memory by [`Batch::push`]; nothing touches the
//! store until [`Batch::commit`]. Structurally identical records are kept
//! once (first occurrence wins). Vertices are written before edges, in
//! multi-row `INSERT` statements of at most `batch_chunk_rows` rows, all
//! inside one transaction. Vertices staged by [`Batch::push_linked`] only
//! need to exist and go through `INSERT OR IGNORE` after the plain ones.

use std::ops::Range;

use ahash::AHashSet;
use rusqlite::{Connection, types::Value as SqlValue};

use crate::{
    errors::GraphStoreError,
    graph::{EDGE_COLUMNS, Edge, GraphStore, Record, VERTEX_COLUMNS, Vertex, props_to_sql},
    params::NamedParams,
};

/// Rolls the transaction back on drop unless [`TransactionGuard::commit`]
/// ran.
pub(crate) struct TransactionGuard<'a> {
    conn: &'a Connection,
    committed: bool,
}

impl<'a> TransactionGuard<'a> {
    pub(crate) fn begin(conn: &'a Connection) -> Result<Self, GraphStoreError> {
        conn.execute_batch("BEGIN IMMEDIATE TRANSACTION")
            .map_err(|e| GraphStoreError::transaction(e.to_string()))?;
        Ok(Self {
            conn,
            committed: false,
        })
    }

    pub(crate) fn commit(mut self) -> Result<(), GraphStoreError> {
        self.conn
            .execute_batch("COMMIT TRANSACTION")
            .map_err(|e| GraphStoreError::transaction(e.to_string()))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            tracing::warn!("rolling back batch transaction");
            let _ = self.conn.execute_batch("ROLLBACK TRANSACTION");
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Table {
    Vertices,
    LinkedVertices,
    Edges,
}

impl Table {
    fn verb(self) -> &'static str {
        match self {
            Table::LinkedVertices => "INSERT OR IGNORE INTO",
            Table::Vertices | Table::Edges => "INSERT INTO",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Table::Vertices | Table::LinkedVertices => "vertices",
            Table::Edges => "edges",
        }
    }

    fn columns(self) -> &'static str {
        match self {
            Table::Vertices | Table::LinkedVertices => VERTEX_COLUMNS,
            Table::Edges => EDGE_COLUMNS,
        }
    }

    fn width(self) -> usize {
        match self {
            Table::Vertices | Table::LinkedVertices => 4,
            Table::Edges => 7,
        }
    }
}

/// One planned `INSERT` covering `rows` of one table.
struct PlannedInsert {
    table: Table,
    rows: Range<usize>,
    first_param: usize,
}

impl PlannedInsert {
    fn sql(&self) -> String {
        let width = self.table.width();
        let tuples: Vec<String> = (0..self.rows.len())
            .map(|row| {
                let base = self.first_param + row * width;
                let placeholders: Vec<String> =
                    (base..base + width).map(|idx| format!(":{idx}")).collect();
                format!("({})", placeholders.join(", "))
            })
            .collect();
        format!(
            "{} {}({}) VALUES {}",
            self.table.verb(),
            self.table.name(),
            self.table.columns(),
            tuples.join(", ")
        )
    }
}

/// Rows written by a successful [`Batch::commit`]. Linked vertices that
/// were already stored are not counted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub vertices: usize,
    pub edges: usize,
}

/// Staged records awaiting a single transactional commit.
pub struct Batch<'a> {
    store: &'a GraphStore,
    vertices: Vec<Vertex>,
    linked: Vec<Vertex>,
    edges: Vec<Edge>,
    seen: AHashSet<String>,
}

impl<'a> Batch<'a> {
    fn new(store: &'a GraphStore) -> Self {
        Self {
            store,
            vertices: Vec::new(),
            linked: Vec::new(),
            edges: Vec::new(),
            seen: AHashSet::new(),
        }
    }

    /// Stages a record. Edge defaults are filled first, so two edges that
    /// only differ by an explicit default id count as duplicates. Returns
    /// `false` when an identical record was already staged.
    pub fn push(&mut self, record: impl Into<Record>) -> Result<bool, GraphStoreError> {
        let record = match record.into() {
            Record::Edge(edge) => Record::Edge(edge.resolve()),
            vertex => vertex,
        };
        let key = serde_json::to_string(&record)?;
        if !self.seen.insert(key) {
            return Ok(false);
        }
        match record {
            Record::Vertex(vertex) => self.vertices.push(vertex),
            Record::Edge(edge) => self.edges.push(edge),
        }
        Ok(true)
    }

    /// Stages a vertex that only has to exist once the batch commits. A
    /// stored vertex with the same id is left untouched instead of failing
    /// the batch. Returns `false` when the vertex is already staged, either
    /// way.
    pub fn push_linked(&mut self, vertex: Vertex) -> Result<bool, GraphStoreError> {
        let record = Record::Vertex(vertex);
        let key = serde_json::to_string(&record)?;
        if self.seen.contains(&key) || !self.seen.insert(format!("linked:{key}")) {
            return Ok(false);
        }
        if let Record::Vertex(vertex) = record {
            self.linked.push(vertex);
        }
        Ok(true)
    }

    /// Stages every record, returning how many were new.
    pub fn extend<I, R>(&mut self, records: I) -> Result<usize, GraphStoreError>
    where
        I: IntoIterator<Item = R>,
        R: Into<Record>,
    {
        let mut added = 0;
        for record in records {
            if self.push(record)? {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn len(&self) -> usize {
        self.vertices.len() + self.linked.len() + self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn linked_vertices(&self) -> &[Vertex] {
        &self.linked
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// The script [`Batch::commit`] would run, without running it.
    pub fn preview(&self) -> String {
        let mut script = String::from("BEGIN TRANSACTION;\n");
        for insert in self.plan() {
            script.push_str(&insert.sql());
            script.push_str(";\n");
        }
        script.push_str("COMMIT TRANSACTION;");
        script
    }

    /// Writes every staged record in one transaction. Any failure rolls the
    /// whole batch back and leaves the store unchanged.
    pub fn commit(self) -> Result<CommitReport, GraphStoreError> {
        let mut report = CommitReport::default();
        if self.is_empty() {
            return Ok(report);
        }
        let conn = self.store.connection();
        let guard = TransactionGuard::begin(conn)?;
        for insert in self.plan() {
            let sql = insert.sql();
            let values = self.values(&insert)?;
            let params = NamedParams::starting_at(insert.first_param, values);
            let named = params.as_named();
            let written = conn.prepare_cached(&sql)?.execute(named.as_slice())?;
            match insert.table {
                Table::Vertices | Table::LinkedVertices => report.vertices += written,
                Table::Edges => report.edges += written,
            }
        }
        guard.commit()?;
        tracing::info!(
            vertices = report.vertices,
            edges = report.edges,
            "batch committed"
        );
        Ok(report)
    }

    fn plan(&self) -> Vec<PlannedInsert> {
        let chunk = self.store.config().batch_chunk_rows.max(1);
        let mut plan = Vec::new();
        let mut next_param = 0;
        for (table, count) in [
            (Table::Vertices, self.vertices.len()),
            (Table::LinkedVertices, self.linked.len()),
            (Table::Edges, self.edges.len()),
        ] {
            for start in (0..count).step_by(chunk) {
                let rows = start..count.min(start + chunk);
                let params = rows.len() * table.width();
                plan.push(PlannedInsert {
                    table,
                    rows,
                    first_param: next_param,
                });
                next_param += params;
            }
        }
        plan
    }

    fn values(&self, insert: &PlannedInsert) -> Result<Vec<SqlValue>, GraphStoreError> {
        let mut values = Vec::with_capacity(insert.rows.len() * insert.table.width());
        match insert.table {
            Table::Vertices | Table::LinkedVertices => {
                let staged = match insert.table {
                    Table::LinkedVertices => &self.linked,
                    _ => &self.vertices,
                };
                for vertex in &staged[insert.rows.clone()] {
                    values.push(SqlValue::Text(vertex.id.clone()));
                    values.push(optional_text(&vertex.name));
                    values.push(optional_text(&vertex.namespace));
                    values.push(optional_text(&props_to_sql(vertex.props.as_ref())?));
                }
            }
            Table::Edges => {
                for edge in &self.edges[insert.rows.clone()] {
                    values.push(SqlValue::Text(edge.resolved_id()));
                    values.push(optional_text(&edge.name));
                    values.push(optional_text(&edge.inverse_name));
                    values.push(optional_text(&edge.namespace));
                    values.push(SqlValue::Text(edge.source.clone()));
                    values.push(SqlValue::Text(edge.target.clone()));
                    values.push(optional_text(&props_to_sql(edge.props.as_ref())?));
                }
            }
        }
        Ok(values)
    }
}

fn optional_text(value: &Option<String>) -> SqlValue {
    value
        .as_ref()
        .map_or(SqlValue::Null, |text| SqlValue::Text(text.clone()))
}

impl GraphStore {
    /// Starts an empty batch bound to this store.
    pub fn batch(&self) -> Batch<'_> {
        Batch::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_preview_numbers_vertices_before_edges() {
        let store = GraphStore::open_in_memory().expect("store");
        let mut batch = store.batch();
        batch.push(Edge::new("a", "b")).unwrap();
        batch.push(Vertex::new("a")).unwrap();
        batch.push(Vertex::new("b")).unwrap();
        assert_eq!(
            batch.preview(),
            "BEGIN TRANSACTION;\n\
             INSERT INTO vertices(id, name, ns, props) VALUES (:0, :1, :2, :3), (:4, :5, :6, :7);\n\
             INSERT INTO edges(id, name, inverseName, ns, source, target, props) \
             VALUES (:8, :9, :10, :11, :12, :13, :14);\n\
             COMMIT TRANSACTION;"
        );
    }

    #[test]
    fn test_push_drops_identical_records() {
        let store = GraphStore::open_in_memory().expect("store");
        let mut batch = store.batch();
        let vertex = Vertex::new("a").with_props(json!({ "k": 1 }));
        assert!(batch.push(vertex.clone()).unwrap());
        assert!(!batch.push(vertex).unwrap());
        // resolves to the same id and inverse name
        assert!(batch.push(Edge::new("a", "b").with_name("r")).unwrap());
        assert!(
            !batch
                .push(Edge::new("a", "b").with_name("r").with_id("a:b"))
                .unwrap()
        );
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_linked_vertices_use_insert_or_ignore() {
        let store = GraphStore::open_in_memory().expect("store");
        let mut batch = store.batch();
        batch.push(Vertex::new("a")).unwrap();
        assert!(batch.push_linked(Vertex::new("b")).unwrap());
        // already staged as a plain vertex
        assert!(!batch.push_linked(Vertex::new("a")).unwrap());
        assert!(!batch.push_linked(Vertex::new("b")).unwrap());
        assert_eq!(batch.linked_vertices().len(), 1);
        assert_eq!(
            batch.preview(),
            "BEGIN TRANSACTION;\n\
             INSERT INTO vertices(id, name, ns, props) VALUES (:0, :1, :2, :3);\n\
             INSERT OR IGNORE INTO vertices(id, name, ns, props) VALUES (:4, :5, :6, :7);\n\
             COMMIT TRANSACTION;"
        );
    }

    #[test]
    fn test_plan_chunks_rows() {
        let mut config = crate::config::StoreConfig::default();
        config.batch_chunk_rows = 2;
        let store = GraphStore::open_in_memory_with_config(&config).expect("store");
        let mut batch = store.batch();
        batch
            .extend((0..5).map(|i| Vertex::new(format!("v{i}"))))
            .unwrap();
        let plan = batch.plan();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[1].first_param, 8);
        assert_eq!(plan[2].rows, 4..5);
        assert_eq!(plan[2].first_param, 16);
    }
}
