//! Where-clause compiler.
//!
//! A [`WhereClause`] is an ordered list of field conditions and parenthesized
//! `AND`/`OR` sub-clauses. [`compile`] turns it into a SQL boolean expression
//! with `:0, :1, ...` placeholders numbered left to right across the whole
//! tree, so the parameter list is contiguous. Once an `OR` has been joined
//! in, the expression so far is parenthesized before the next `AND`, so
//! siblings keep their left-to-right grouping.

use serde_json::Value;

use crate::errors::GraphStoreError;

/// The string operators match their operand literally: `%`, `_` and `\`
/// in it are escaped before binding.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    Eq(Value),
    /// Substring match.
    Like(String),
    StartsWith(String),
    EndsWith(String),
}

impl Operation {
    fn render(&self, column: &str, index: usize) -> String {
        match self {
            Operation::Eq(Value::Null) => format!("{column} IS :{index}"),
            Operation::Eq(_) => format!("{column} = :{index}"),
            Operation::Like(_) => format!("{column} LIKE '%' || :{index} || '%' ESCAPE '\\'"),
            Operation::StartsWith(_) => format!("{column} LIKE :{index} || '%' ESCAPE '\\'"),
            Operation::EndsWith(_) => format!("{column} LIKE '%' || :{index} ESCAPE '\\'"),
        }
    }

    fn operand(&self) -> Value {
        match self {
            Operation::Eq(value) => value.clone(),
            Operation::Like(text) | Operation::StartsWith(text) | Operation::EndsWith(text) => {
                Value::String(escape_like(text))
            }
        }
    }

    /// Parses a single `{op: value}` object. Only the first key is read.
    fn from_json(field: &str, spec: &Value) -> Result<Self, GraphStoreError> {
        let object = spec.as_object().ok_or_else(|| {
            GraphStoreError::invalid_input(format!("field {field}: operation must be an object"))
        })?;
        let (op, value) = object.iter().next().ok_or_else(|| {
            GraphStoreError::invalid_input(format!("field {field}: operation is empty"))
        })?;
        let text = || {
            value.as_str().map(str::to_string).ok_or_else(|| {
                GraphStoreError::invalid_input(format!(
                    "field {field}: {op} applies to string values only"
                ))
            })
        };
        match op.as_str() {
            "eq" => {
                if value.is_array() || value.is_object() {
                    return Err(GraphStoreError::invalid_input(format!(
                        "field {field}: eq takes a scalar"
                    )));
                }
                Ok(Operation::Eq(value.clone()))
            }
            "like" => Ok(Operation::Like(text()?)),
            "startsWith" => Ok(Operation::StartsWith(text()?)),
            "endsWith" => Ok(Operation::EndsWith(text()?)),
            other => Err(GraphStoreError::invalid_input(format!(
                "field {field}: unknown operator {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Field { name: String, op: Operation },
    And(WhereClause),
    Or(WhereClause),
}

/// Structured filter. Sibling field conditions are AND-ed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WhereClause {
    conditions: Vec<Condition>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, op: Operation) -> Self {
        self.conditions.push(Condition::Field {
            name: name.into(),
            op,
        });
        self
    }

    pub fn eq(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.field(name, Operation::Eq(value.into()))
    }

    pub fn like(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.field(name, Operation::Like(value.into()))
    }

    pub fn starts_with(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.field(name, Operation::StartsWith(value.into()))
    }

    pub fn ends_with(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.field(name, Operation::EndsWith(value.into()))
    }

    pub fn and(mut self, clause: WhereClause) -> Self {
        self.conditions.push(Condition::And(clause));
        self
    }

    pub fn or(mut self, clause: WhereClause) -> Self {
        self.conditions.push(Condition::Or(clause));
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Parses the document form `{ field: { op: value }, AND: {...}, OR: {...} }`.
    ///
    /// Keys are read in document order. When an operation object carries
    /// several operator keys, the first one wins and the rest are ignored.
    pub fn from_json(value: &Value) -> Result<Self, GraphStoreError> {
        let object = value
            .as_object()
            .ok_or_else(|| GraphStoreError::invalid_input("where clause must be an object"))?;
        let mut clause = WhereClause::new();
        for (key, spec) in object {
            clause = match key.as_str() {
                "AND" => clause.and(WhereClause::from_json(spec)?),
                "OR" => clause.or(WhereClause::from_json(spec)?),
                field => clause.field(field, Operation::from_json(field, spec)?),
            };
        }
        Ok(clause)
    }
}

/// Output of [`compile`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompiledPredicate {
    pub sql: String,
    pub params: Vec<Value>,
}

impl CompiledPredicate {
    /// Expression usable after `WHERE`; an empty clause matches everything.
    pub fn where_sql(&self) -> &str {
        if self.sql.is_empty() { "1" } else { &self.sql }
    }
}

/// Compiles `clause`. With `document_field`, every field reference becomes
/// `json_extract(<document_field>, '$.<field>')` instead of a bare column.
pub fn compile(
    clause: &WhereClause,
    document_field: Option<&str>,
) -> Result<CompiledPredicate, GraphStoreError> {
    if let Some(doc) = document_field {
        validate_identifier(doc)?;
    }
    let mut params = Vec::new();
    let sql = compile_into(clause, document_field, &mut params)?;
    Ok(CompiledPredicate { sql, params })
}

fn compile_into(
    clause: &WhereClause,
    document_field: Option<&str>,
    params: &mut Vec<Value>,
) -> Result<String, GraphStoreError> {
    let mut sql = String::new();
    // whether `sql` has a top-level OR
    let mut open_or = false;
    for condition in &clause.conditions {
        match condition {
            Condition::Field { name, op } => {
                validate_identifier(name)?;
                join(&mut sql, &mut open_or, "AND");
                let column = field_ref(name, document_field);
                sql.push_str(&op.render(&column, params.len()));
                params.push(op.operand());
            }
            Condition::And(sub) | Condition::Or(sub) => {
                let keyword = if matches!(condition, Condition::And(_)) {
                    "AND"
                } else {
                    "OR"
                };
                let inner = compile_into(sub, document_field, params)?;
                if inner.is_empty() {
                    continue;
                }
                join(&mut sql, &mut open_or, keyword);
                sql.push('(');
                sql.push_str(&inner);
                sql.push(')');
            }
        }
    }
    Ok(sql)
}

fn join(sql: &mut String, open_or: &mut bool, keyword: &str) {
    if sql.is_empty() {
        return;
    }
    if keyword == "AND" && *open_or {
        *sql = format!("({sql})");
        *open_or = false;
    }
    if keyword == "OR" {
        *open_or = true;
    }
    sql.push(' ');
    sql.push_str(keyword);
    sql.push(' ');
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn field_ref(name: &str, document_field: Option<&str>) -> String {
    match document_field {
        Some(doc) => format!("json_extract({doc}, '$.{name}')"),
        None => name.to_string(),
    }
}

// Names are spliced into SQL text.
fn validate_identifier(name: &str) -> Result<(), GraphStoreError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.ends_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(GraphStoreError::invalid_input(format!(
            "invalid field name {name:?}"
        )))
    }
}
