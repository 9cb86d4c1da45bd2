//! Binding of JSON values to `:n` statement placeholders.

use rusqlite::{ToSql, types::Value as SqlValue};
use serde_json::Value;

/// Converts a document scalar into the SQLite value it compares against.
/// Booleans become 0/1 (what `json_extract` yields); arrays and objects are
/// bound as their JSON text.
pub fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                SqlValue::Integer(int)
            } else {
                SqlValue::Real(number.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(text) => SqlValue::Text(text.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

pub fn from_sql_value(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(int) => Value::from(int),
        SqlValue::Real(real) => Value::from(real),
        SqlValue::Text(text) => Value::String(text),
        SqlValue::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}

/// Positional parameters addressed by name (`:0`, `:1`, ...).
#[derive(Clone, Debug, Default)]
pub struct NamedParams {
    entries: Vec<(String, SqlValue)>,
}

impl NamedParams {
    pub fn from_values<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let entries = values
            .into_iter()
            .enumerate()
            .map(|(idx, value)| (format!(":{idx}"), to_sql_value(value)))
            .collect();
        Self { entries }
    }

    /// Names the values `:first`, `:first + 1`, ... for statements that
    /// continue a numbering started by an earlier statement.
    pub fn starting_at(first: usize, values: Vec<SqlValue>) -> Self {
        let entries = values
            .into_iter()
            .enumerate()
            .map(|(idx, value)| (format!(":{}", first + idx), value))
            .collect();
        Self { entries }
    }

    /// Borrowed view accepted by rusqlite's named-parameter binding.
    pub fn as_named(&self) -> Vec<(&str, &dyn ToSql)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
            .collect()
    }
}
