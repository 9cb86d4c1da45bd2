//! Configuration for opening a [`GraphStore`](crate::GraphStore).
//!
//! Mirrors the shape of a plain options struct with public fields and a
//! `Default` that reproduces the behavior of [`GraphStore::open`](crate::GraphStore::open).

use std::collections::HashMap;
use std::path::Path;

use crate::{GraphStore, GraphStoreError, schema::SchemaDefinition};

pub const DEFAULT_STATEMENT_CACHE_CAPACITY: usize = 128;
pub const DEFAULT_BATCH_CHUNK_ROWS: usize = 500;
/// Host parameter ceiling of the bundled SQLite build.
const MAX_BOUND_PARAMETERS: usize = 32_766;
/// Columns bound per edge row, the widest batch row.
const EDGE_ROW_WIDTH: usize = 7;

/// Options applied when a store is opened.
///
/// # Default Configuration
///
/// ```rust
/// use vertexstore::{SchemaDefinition, StoreConfig};
/// let config = StoreConfig::default();
/// assert_eq!(config.schema, SchemaDefinition::Default);
/// assert!(config.pragma_settings.is_empty());
/// assert!(config.traversal_limit.is_none());
/// ```
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// DDL used to establish the layout. Runs on every open; the default DDL
    /// is idempotent.
    pub schema: SchemaDefinition,

    /// Additional SQLite PRAGMA settings, applied after the connection is
    /// opened and before the schema runs.
    ///
    /// ```rust
    /// use vertexstore::StoreConfig;
    ///
    /// let mut cfg = StoreConfig::default();
    /// cfg.pragma_settings.insert("journal_mode".to_string(), "WAL".to_string());
    /// cfg.pragma_settings.insert("synchronous".to_string(), "NORMAL".to_string());
    /// ```
    pub pragma_settings: HashMap<String, String>,

    /// Prepared statement cache capacity. `None` keeps
    /// [`DEFAULT_STATEMENT_CACHE_CAPACITY`].
    pub statement_cache_capacity: Option<usize>,

    /// Upper bound on distinct vertices a single traversal expands.
    /// `None` means unbounded; traversal still terminates on cyclic graphs.
    pub traversal_limit: Option<usize>,

    /// Maximum rows per multi-row INSERT inside one batch transaction.
    pub batch_chunk_rows: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            schema: SchemaDefinition::Default,
            pragma_settings: HashMap::new(),
            statement_cache_capacity: None,
            traversal_limit: None,
            batch_chunk_rows: DEFAULT_BATCH_CHUNK_ROWS,
        }
    }
}

impl StoreConfig {
    pub fn with_schema(schema: SchemaDefinition) -> Self {
        Self {
            schema,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), GraphStoreError> {
        if self.batch_chunk_rows == 0 {
            return Err(GraphStoreError::invalid_input(
                "batch_chunk_rows must be positive",
            ));
        }
        if self.batch_chunk_rows.saturating_mul(EDGE_ROW_WIDTH) > MAX_BOUND_PARAMETERS {
            return Err(GraphStoreError::invalid_input(format!(
                "batch_chunk_rows must be at most {}",
                MAX_BOUND_PARAMETERS / EDGE_ROW_WIDTH
            )));
        }
        if self.traversal_limit == Some(0) {
            return Err(GraphStoreError::invalid_input(
                "traversal_limit must be positive when set",
            ));
        }
        Ok(())
    }
}

/// Opens a file-backed store with the given configuration.
pub fn open_store<P: AsRef<Path>>(
    path: P,
    cfg: &StoreConfig,
) -> Result<GraphStore, GraphStoreError> {
    GraphStore::open_with_config(path, cfg)
}
