use rusqlite::CachedStatement;

use crate::{errors::GraphStoreError, params::NamedParams};

type RowMapper<T> = fn(&rusqlite::Row<'_>) -> Result<T, rusqlite::Error>;

/// A prepared query with its bound parameters.
///
/// Rows stream straight off the SQLite cursor: [`RecordCursor::rows`] is
/// forward-only and single-pass, and each call re-runs the statement from
/// the start. Nothing is cached between calls.
pub struct RecordCursor<'conn, T> {
    stmt: CachedStatement<'conn>,
    params: NamedParams,
    map: RowMapper<T>,
}

impl<'conn, T> RecordCursor<'conn, T> {
    pub(crate) fn new(stmt: CachedStatement<'conn>, params: NamedParams, map: RowMapper<T>) -> Self {
        Self { stmt, params, map }
    }

    pub fn rows(
        &mut self,
    ) -> Result<impl Iterator<Item = Result<T, GraphStoreError>> + '_, GraphStoreError> {
        let named = self.params.as_named();
        let rows = self.stmt.query_map(named.as_slice(), self.map)?;
        Ok(rows.map(|row| row.map_err(GraphStoreError::from)))
    }

    /// Runs the query and collects every row.
    pub fn collect_all(&mut self) -> Result<Vec<T>, GraphStoreError> {
        self.rows()?.collect()
    }
}
