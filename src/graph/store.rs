use std::path::Path;

use ahash::AHashSet;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};

use crate::{
    config::{DEFAULT_STATEMENT_CACHE_CAPACITY, StoreConfig},
    errors::GraphStoreError,
    params::{NamedParams, from_sql_value},
    predicate::{WhereClause, compile},
    schema::ensure_schema,
};

use super::{
    cursor::RecordCursor,
    types::{
        EDGE_COLUMNS, Edge, VERTEX_COLUMNS, Vertex, props_to_sql, row_to_edge, row_to_vertex,
    },
};

/// Document column that search predicates are evaluated against.
pub const PROPS_FIELD: &str = "props";

/// Which way [`GraphStore::get_edges`] reads the `(from, to)` pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EdgeDirection {
    /// `source = from AND target = to`.
    #[default]
    FromTo,
    /// The `FromTo` query with the ids swapped.
    ToFrom,
    /// `ToFrom` results followed by `FromTo` results, without repeats.
    Both,
}

/// `LIMIT`/`OFFSET` applied to a vertex search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Pagination {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }
}

/// The store handle. One connection, one logical owner; every component
/// borrows it.
pub struct GraphStore {
    conn: Connection,
    config: StoreConfig,
}

impl GraphStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GraphStoreError> {
        Self::open_with_config(path, &StoreConfig::default())
    }

    pub fn open_in_memory() -> Result<Self, GraphStoreError> {
        Self::open_in_memory_with_config(&StoreConfig::default())
    }

    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        cfg: &StoreConfig,
    ) -> Result<Self, GraphStoreError> {
        cfg.validate()?;
        let conn =
            Connection::open(path.as_ref()).map_err(|e| GraphStoreError::connection(e.to_string()))?;
        tracing::info!(path = %path.as_ref().display(), "opening graph store");
        Self::from_connection(conn, cfg)
    }

    pub fn open_in_memory_with_config(cfg: &StoreConfig) -> Result<Self, GraphStoreError> {
        cfg.validate()?;
        let conn = Connection::open_in_memory()
            .map_err(|e| GraphStoreError::connection(e.to_string()))?;
        tracing::info!("opening in-memory graph store");
        Self::from_connection(conn, cfg)
    }

    /// Closes the underlying connection, reporting any error SQLite raises
    /// while finalizing.
    pub fn close(self) -> Result<(), GraphStoreError> {
        self.conn
            .close()
            .map_err(|(_, e)| GraphStoreError::connection(e.to_string()))?;
        tracing::info!("graph store closed");
        Ok(())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Fails with `ConstraintViolation` when the id already exists.
    pub fn insert_vertex(&self, vertex: &Vertex) -> Result<(), GraphStoreError> {
        let props = props_to_sql(vertex.props.as_ref())?;
        self.conn
            .prepare_cached("INSERT INTO vertices(id, name, ns, props) VALUES(?1, ?2, ?3, ?4)")?
            .execute(params![
                vertex.id,
                vertex.name,
                vertex.namespace,
                props
            ])?;
        Ok(())
    }

    /// Replaces name, namespace and props. Missing ids are `NotFound`.
    pub fn update_vertex(&self, vertex: &Vertex) -> Result<(), GraphStoreError> {
        let props = props_to_sql(vertex.props.as_ref())?;
        let affected = self
            .conn
            .prepare_cached("UPDATE vertices SET name = ?1, ns = ?2, props = ?3 WHERE id = ?4")?
            .execute(params![vertex.name, vertex.namespace, props, vertex.id])?;
        if affected == 0 {
            return Err(GraphStoreError::not_found(format!("vertex {}", vertex.id)));
        }
        Ok(())
    }

    /// Deleting an absent id is not an error. Edges that reference the
    /// vertex are left in place.
    pub fn delete_vertex(&self, id: &str) -> Result<(), GraphStoreError> {
        self.conn
            .prepare_cached("DELETE FROM vertices WHERE id = ?1")?
            .execute(params![id])?;
        Ok(())
    }

    pub fn get_vertex_by_id(&self, id: &str) -> Result<Option<Vertex>, GraphStoreError> {
        let vertex = self
            .conn
            .prepare_cached(&format!("SELECT {VERTEX_COLUMNS} FROM vertices WHERE id = ?1"))?
            .query_row(params![id], row_to_vertex)
            .optional()?;
        Ok(vertex)
    }

    /// Inserts an edge, filling the default id and inverse name. Returns the
    /// id actually stored.
    pub fn insert_edge(&self, edge: &Edge) -> Result<String, GraphStoreError> {
        let edge = edge.clone().resolve();
        let props = props_to_sql(edge.props.as_ref())?;
        let id = edge.resolved_id();
        self.conn
            .prepare_cached(
                "INSERT INTO edges(id, name, inverseName, ns, source, target, props) \
                 VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?
            .execute(params![
                id,
                edge.name,
                edge.inverse_name,
                edge.namespace,
                edge.source,
                edge.target,
                props
            ])?;
        Ok(id)
    }

    /// Full-payload replacement of an edge addressed by its (resolved) id.
    pub fn update_edge(&self, edge: &Edge) -> Result<(), GraphStoreError> {
        let edge = edge.clone().resolve();
        let props = props_to_sql(edge.props.as_ref())?;
        let id = edge.resolved_id();
        let affected = self
            .conn
            .prepare_cached(
                "UPDATE edges SET name = ?1, inverseName = ?2, ns = ?3, source = ?4, \
                 target = ?5, props = ?6 WHERE id = ?7",
            )?
            .execute(params![
                edge.name,
                edge.inverse_name,
                edge.namespace,
                edge.source,
                edge.target,
                props,
                id
            ])?;
        if affected == 0 {
            return Err(GraphStoreError::not_found(format!("edge {id}")));
        }
        Ok(())
    }

    pub fn delete_edge(&self, id: &str) -> Result<(), GraphStoreError> {
        self.conn
            .prepare_cached("DELETE FROM edges WHERE id = ?1")?
            .execute(params![id])?;
        Ok(())
    }

    pub fn get_edge_by_id(&self, id: &str) -> Result<Option<Edge>, GraphStoreError> {
        let edge = self
            .conn
            .prepare_cached(&format!("SELECT {EDGE_COLUMNS} FROM edges WHERE id = ?1"))?
            .query_row(params![id], row_to_edge)
            .optional()?;
        Ok(edge)
    }

    /// Edges between two vertices.
    pub fn get_edges(
        &self,
        from_id: &str,
        to_id: &str,
        direction: EdgeDirection,
    ) -> Result<Vec<Edge>, GraphStoreError> {
        match direction {
            EdgeDirection::FromTo => self.edges_between(from_id, to_id),
            EdgeDirection::ToFrom => self.edges_between(to_id, from_id),
            EdgeDirection::Both => {
                let mut edges = self.edges_between(to_id, from_id)?;
                let mut seen: AHashSet<String> =
                    edges.iter().filter_map(|e| e.id.clone()).collect();
                for edge in self.edges_between(from_id, to_id)? {
                    if edge.id.as_ref().is_some_and(|id| seen.insert(id.clone())) {
                        edges.push(edge);
                    }
                }
                Ok(edges)
            }
        }
    }

    /// Vertices whose props satisfy `predicate`.
    pub fn search_vertices(
        &self,
        predicate: &WhereClause,
        pagination: Option<Pagination>,
    ) -> Result<RecordCursor<'_, Vertex>, GraphStoreError> {
        let compiled = compile(predicate, Some(PROPS_FIELD))?;
        let mut sql = format!(
            "SELECT {VERTEX_COLUMNS} FROM vertices WHERE {} ORDER BY rowid",
            compiled.where_sql()
        );
        if let Some(page) = pagination {
            sql.push_str(&format!(
                " LIMIT {} OFFSET {}",
                i64::try_from(page.limit).unwrap_or(i64::MAX),
                i64::try_from(page.offset).unwrap_or(i64::MAX)
            ));
        }
        tracing::debug!(%sql, params = compiled.params.len(), "search vertices");
        let stmt = self.conn.prepare_cached(&sql)?;
        Ok(RecordCursor::new(
            stmt,
            NamedParams::from_values(&compiled.params),
            row_to_vertex,
        ))
    }

    /// Edges whose props satisfy `predicate`.
    pub fn search_edges(
        &self,
        predicate: &WhereClause,
    ) -> Result<RecordCursor<'_, Edge>, GraphStoreError> {
        let compiled = compile(predicate, Some(PROPS_FIELD))?;
        let sql = format!(
            "SELECT {EDGE_COLUMNS} FROM edges WHERE {} ORDER BY rowid",
            compiled.where_sql()
        );
        tracing::debug!(%sql, params = compiled.params.len(), "search edges");
        let stmt = self.conn.prepare_cached(&sql)?;
        Ok(RecordCursor::new(
            stmt,
            NamedParams::from_values(&compiled.params),
            row_to_edge,
        ))
    }

    /// Runs arbitrary SQL with `:0, :1, ...` parameters and returns each row
    /// as a column-ordered JSON object.
    pub fn raw(&self, sql: &str, parameters: &[Value]) -> Result<Vec<Map<String, Value>>, GraphStoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let params = NamedParams::from_values(parameters);
        let named = params.as_named();
        let mut rows = stmt.query(named.as_slice())?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut object = Map::new();
            for (idx, column) in columns.iter().enumerate() {
                let value: rusqlite::types::Value = row.get(idx)?;
                object.insert(column.clone(), from_sql_value(value));
            }
            out.push(object);
        }
        Ok(out)
    }

    pub fn vertex_count(&self) -> Result<u64, GraphStoreError> {
        self.count("SELECT COUNT(*) FROM vertices")
    }

    pub fn edge_count(&self) -> Result<u64, GraphStoreError> {
        self.count("SELECT COUNT(*) FROM edges")
    }
}

impl GraphStore {
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    fn edges_between(&self, source: &str, target: &str) -> Result<Vec<Edge>, GraphStoreError> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {EDGE_COLUMNS} FROM edges WHERE source = ?1 AND target = ?2 ORDER BY rowid"
        ))?;
        let rows = stmt.query_map(params![source, target], row_to_edge)?;
        let mut edges = Vec::new();
        for edge in rows {
            edges.push(edge?);
        }
        Ok(edges)
    }

    fn count(&self, sql: &str) -> Result<u64, GraphStoreError> {
        let count: i64 = self.conn.prepare_cached(sql)?.query_row([], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn from_connection(conn: Connection, cfg: &StoreConfig) -> Result<Self, GraphStoreError> {
        for (key, value) in &cfg.pragma_settings {
            let pragma_sql = format!("PRAGMA {key} = {value}");
            match conn.execute(&pragma_sql, []) {
                Ok(_) => {}
                // journal_mode and friends echo the new value back
                Err(rusqlite::Error::ExecuteReturnedResults) => {}
                Err(e) => {
                    return Err(GraphStoreError::connection(format!(
                        "PRAGMA {key} = {value}: {e}"
                    )));
                }
            }
        }
        conn.set_prepared_statement_cache_capacity(
            cfg.statement_cache_capacity
                .unwrap_or(DEFAULT_STATEMENT_CACHE_CAPACITY),
        );
        ensure_schema(&conn, &cfg.schema)?;
        Ok(Self {
            conn,
            config: cfg.clone(),
        })
    }
}
