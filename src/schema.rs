use rusqlite::Connection;

use crate::errors::GraphStoreError;

/// Default vertex/edge layout.
///
/// `REFERENCES` clauses document the endpoint relation, but the engine's
/// foreign-key enforcement stays off: deleting a vertex must neither fail nor
/// cascade. Endpoint existence is checked on write by the two triggers instead.
pub const DEFAULT_SCHEMA: &str = r#"
    PRAGMA foreign_keys = OFF;
    CREATE TABLE IF NOT EXISTS vertices (
        id    TEXT NOT NULL UNIQUE,
        name  TEXT,
        ns    TEXT,
        props TEXT
    );
    CREATE INDEX IF NOT EXISTS vertices_id_idx ON vertices(id);
    CREATE INDEX IF NOT EXISTS vertices_name_idx ON vertices(name);
    CREATE INDEX IF NOT EXISTS vertices_ns_idx ON vertices(ns);
    CREATE TABLE IF NOT EXISTS edges (
        id          TEXT NOT NULL UNIQUE,
        name        TEXT,
        inverseName TEXT,
        ns          TEXT,
        source      TEXT NOT NULL,
        target      TEXT NOT NULL,
        props       TEXT,
        FOREIGN KEY(source) REFERENCES vertices(id),
        FOREIGN KEY(target) REFERENCES vertices(id)
    );
    CREATE INDEX IF NOT EXISTS edges_id_idx ON edges(id);
    CREATE INDEX IF NOT EXISTS edges_name_idx ON edges(name);
    CREATE INDEX IF NOT EXISTS edges_inverse_name_idx ON edges(inverseName);
    CREATE INDEX IF NOT EXISTS edges_ns_idx ON edges(ns);
    CREATE INDEX IF NOT EXISTS edges_source_idx ON edges(source);
    CREATE INDEX IF NOT EXISTS edges_target_idx ON edges(target);
    CREATE TRIGGER IF NOT EXISTS edges_endpoints_insert
    BEFORE INSERT ON edges
    WHEN NOT EXISTS (SELECT 1 FROM vertices WHERE id = NEW.source)
      OR NOT EXISTS (SELECT 1 FROM vertices WHERE id = NEW.target)
    BEGIN
        SELECT RAISE(ABORT, 'FOREIGN KEY constraint failed: edge endpoints must reference vertices');
    END;
    CREATE TRIGGER IF NOT EXISTS edges_endpoints_update
    BEFORE UPDATE OF source, target ON edges
    WHEN NOT EXISTS (SELECT 1 FROM vertices WHERE id = NEW.source)
      OR NOT EXISTS (SELECT 1 FROM vertices WHERE id = NEW.target)
    BEGIN
        SELECT RAISE(ABORT, 'FOREIGN KEY constraint failed: edge endpoints must reference vertices');
    END;
"#;

const VERTEX_COLUMNS: &[&str] = &["id", "name", "ns", "props"];
const EDGE_COLUMNS: &[&str] = &[
    "id",
    "name",
    "inverseName",
    "ns",
    "source",
    "target",
    "props",
];

/// Which DDL establishes the store layout.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SchemaDefinition {
    #[default]
    Default,
    /// Caller-supplied DDL. It must still produce the `vertices` and `edges`
    /// tables with the standard columns.
    Custom(String),
}

impl SchemaDefinition {
    pub fn sql(&self) -> &str {
        match self {
            SchemaDefinition::Default => DEFAULT_SCHEMA,
            SchemaDefinition::Custom(sql) => sql.as_str(),
        }
    }
}

/// Runs the schema DDL and verifies the resulting layout. Safe to call on an
/// already initialized database.
pub fn ensure_schema(
    conn: &Connection,
    definition: &SchemaDefinition,
) -> Result<(), GraphStoreError> {
    let sql = definition.sql();
    if sql.trim().is_empty() {
        return Err(GraphStoreError::schema("schema definition is empty"));
    }
    conn.execute_batch(sql)
        .map_err(|e| GraphStoreError::schema(e.to_string()))?;
    verify_table(conn, "vertices", VERTEX_COLUMNS)?;
    verify_table(conn, "edges", EDGE_COLUMNS)?;
    tracing::debug!(custom = matches!(definition, SchemaDefinition::Custom(_)), "schema ensured");
    Ok(())
}

fn verify_table(
    conn: &Connection,
    table: &str,
    required: &[&str],
) -> Result<(), GraphStoreError> {
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info(?1)")
        .map_err(|e| GraphStoreError::schema(e.to_string()))?;
    let rows = stmt
        .query_map([table], |row| row.get::<_, String>(0))
        .map_err(|e| GraphStoreError::schema(e.to_string()))?;
    let mut columns = Vec::new();
    for column in rows {
        columns.push(column.map_err(|e| GraphStoreError::schema(e.to_string()))?);
    }
    if columns.is_empty() {
        return Err(GraphStoreError::schema(format!("table {table} is missing")));
    }
    for column in required {
        if !columns.iter().any(|c| c == column) {
            return Err(GraphStoreError::schema(format!(
                "table {table} is missing column {column}"
            )));
        }
    }
    Ok(())
}
