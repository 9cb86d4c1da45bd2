use rusqlite::ErrorCode;
use thiserror::Error;

/// Error type for vertexstore operations.
#[derive(Debug, Error)]
pub enum GraphStoreError {
    #[error("connection error: {0}")]
    ConnectionError(String),
    #[error("schema error: {0}")]
    SchemaError(String),
    #[error("query error: {0}")]
    QueryError(String),
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("transaction error: {0}")]
    TransactionError(String),
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl GraphStoreError {
    pub fn connection<T: Into<String>>(msg: T) -> Self {
        GraphStoreError::ConnectionError(msg.into())
    }

    pub fn schema<T: Into<String>>(msg: T) -> Self {
        GraphStoreError::SchemaError(msg.into())
    }

    pub fn query<T: Into<String>>(msg: T) -> Self {
        GraphStoreError::QueryError(msg.into())
    }

    pub fn constraint<T: Into<String>>(msg: T) -> Self {
        GraphStoreError::ConstraintViolation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        GraphStoreError::NotFound(msg.into())
    }

    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        GraphStoreError::InvalidInput(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        GraphStoreError::ValidationError(msg.into())
    }

    pub fn transaction<T: Into<String>>(msg: T) -> Self {
        GraphStoreError::TransactionError(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        GraphStoreError::SerializationError(msg.into())
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, GraphStoreError::ConstraintViolation(_))
    }
}

/// Engine errors surface unmodified: constraint failures keep SQLite's own
/// message (e.g. `UNIQUE constraint failed: vertices.id`).
impl From<rusqlite::Error> for GraphStoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, msg)
                if code.code == ErrorCode::ConstraintViolation =>
            {
                GraphStoreError::constraint(msg.clone().unwrap_or_else(|| err.to_string()))
            }
            _ => GraphStoreError::query(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for GraphStoreError {
    fn from(err: serde_json::Error) -> Self {
        GraphStoreError::serialization(err.to_string())
    }
}
