//! Conjunctive triple-pattern queries compiled to a single edge join.
//!
//! Each [`TriplePattern`] matches one edge row: the subject against
//! `source`, the predicate against the edge itself and the object against
//! `target`. A [`Variable`] binds to the column of its first occurrence and
//! every later occurrence becomes an equality with that column, so shared
//! variables join patterns together.

use ahash::AHashMap;
use serde_json::Value;

use crate::{
    errors::GraphStoreError,
    graph::{GraphStore, RecordCursor},
    params::NamedParams,
};

/// An unbound pattern position, identified by the order it was minted in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(usize);

impl Variable {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Mints fresh variables for one query.
#[derive(Debug, Default)]
pub struct VariableFactory {
    next: usize,
}

impl VariableFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn var(&mut self) -> Variable {
        let var = Variable(self.next);
        self.next += 1;
        var
    }
}

/// Bound vertex position. Unset fields match anything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexPattern {
    pub id: Option<String>,
    pub name: Option<String>,
    pub namespace: Option<String>,
}

impl VertexPattern {
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    fn id_only(&self) -> bool {
        self.id.is_some() && self.name.is_none() && self.namespace.is_none()
    }
}

/// Bound predicate position. Unset fields match anything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EdgePattern {
    pub id: Option<String>,
    pub name: Option<String>,
    pub inverse_name: Option<String>,
    pub namespace: Option<String>,
}

impl EdgePattern {
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_inverse_name(mut self, inverse_name: impl Into<String>) -> Self {
        self.inverse_name = Some(inverse_name.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
    Var(Variable),
    Vertex(VertexPattern),
    Edge(EdgePattern),
}

impl From<Variable> for Term {
    fn from(var: Variable) -> Self {
        Term::Var(var)
    }
}

impl From<VertexPattern> for Term {
    fn from(pattern: VertexPattern) -> Self {
        Term::Vertex(pattern)
    }
}

impl From<EdgePattern> for Term {
    fn from(pattern: EdgePattern) -> Self {
        Term::Edge(pattern)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl TriplePattern {
    pub fn new(subject: impl Into<Term>, predicate: impl Into<Term>, object: impl Into<Term>) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatternQuery {
    pub patterns: Vec<TriplePattern>,
    pub select: Vec<Term>,
}

impl PatternQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `(subject, predicate, object)` to the conjunction.
    pub fn pattern(
        mut self,
        subject: impl Into<Term>,
        predicate: impl Into<Term>,
        object: impl Into<Term>,
    ) -> Self {
        self.patterns
            .push(TriplePattern::new(subject, predicate, object));
        self
    }

    pub fn select<I, T>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Term>,
    {
        self.select.extend(terms.into_iter().map(Into::into));
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompiledPattern {
    pub sql: String,
    pub params: Vec<Value>,
    /// Output column alias per projected term.
    pub columns: Vec<String>,
}

/// One result row: the id bound to each projected term, in projection order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternRow {
    pub values: Vec<String>,
}

impl PatternRow {
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.values.get(idx).map(String::as_str)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Role {
    Vertex,
    Edge,
}

#[derive(Default)]
struct PatternCompiler {
    joins: Vec<String>,
    conditions: Vec<String>,
    params: Vec<Value>,
    bindings: AHashMap<Variable, (String, Role)>,
    descriptors: Vec<(Term, String)>,
    vertex_aliases: usize,
}

impl PatternCompiler {
    fn bind_param(&mut self, column: &str, value: &str) {
        self.conditions
            .push(format!("{column} = :{}", self.params.len()));
        self.params.push(Value::String(value.to_string()));
    }

    fn variable(&mut self, var: Variable, column: String, role: Role) -> Result<(), GraphStoreError> {
        match self.bindings.get(&var) {
            Some((bound, bound_role)) => {
                if *bound_role != role {
                    return Err(GraphStoreError::invalid_input(format!(
                        "variable {} used as both vertex and edge",
                        var.index()
                    )));
                }
                self.conditions.push(format!("{column} = {bound}"));
            }
            None => {
                self.bindings.insert(var, (column, role));
            }
        }
        Ok(())
    }

    fn vertex_position(&mut self, term: &Term, column: String) -> Result<(), GraphStoreError> {
        match term {
            Term::Var(var) => self.variable(*var, column, Role::Vertex),
            Term::Vertex(pattern) => {
                self.remember(term, &column);
                if pattern.id_only() {
                    if let Some(id) = &pattern.id {
                        self.bind_param(&column, id);
                    }
                    return Ok(());
                }
                let alias = format!("v{}", self.vertex_aliases);
                self.vertex_aliases += 1;
                self.joins
                    .push(format!("JOIN vertices AS {alias} ON {alias}.id = {column}"));
                if let Some(id) = &pattern.id {
                    self.bind_param(&format!("{alias}.id"), id);
                }
                if let Some(name) = &pattern.name {
                    self.bind_param(&format!("{alias}.name"), name);
                }
                if let Some(ns) = &pattern.namespace {
                    self.bind_param(&format!("{alias}.ns"), ns);
                }
                Ok(())
            }
            Term::Edge(_) => Err(GraphStoreError::invalid_input(
                "edge descriptor in subject or object position",
            )),
        }
    }

    fn predicate_position(&mut self, term: &Term, alias: &str) -> Result<(), GraphStoreError> {
        match term {
            Term::Var(var) => self.variable(*var, format!("{alias}.id"), Role::Edge),
            Term::Edge(pattern) => {
                self.remember(term, &format!("{alias}.id"));
                if let Some(id) = &pattern.id {
                    self.bind_param(&format!("{alias}.id"), id);
                }
                if let Some(name) = &pattern.name {
                    self.bind_param(&format!("{alias}.name"), name);
                }
                if let Some(inverse) = &pattern.inverse_name {
                    self.bind_param(&format!("{alias}.inverseName"), inverse);
                }
                if let Some(ns) = &pattern.namespace {
                    self.bind_param(&format!("{alias}.ns"), ns);
                }
                Ok(())
            }
            Term::Vertex(_) => Err(GraphStoreError::invalid_input(
                "vertex descriptor in predicate position",
            )),
        }
    }

    fn remember(&mut self, term: &Term, column: &str) {
        if !self.descriptors.iter().any(|(known, _)| known == term) {
            self.descriptors.push((term.clone(), column.to_string()));
        }
    }

    fn projection(&self, term: &Term) -> Result<String, GraphStoreError> {
        match term {
            Term::Var(var) => self
                .bindings
                .get(var)
                .map(|(column, _)| column.clone())
                .ok_or_else(|| {
                    GraphStoreError::invalid_input(format!(
                        "selected variable {} appears in no pattern",
                        var.index()
                    ))
                }),
            descriptor => self
                .descriptors
                .iter()
                .find(|(known, _)| known == descriptor)
                .map(|(_, column)| column.clone())
                .ok_or_else(|| {
                    GraphStoreError::invalid_input("selected descriptor appears in no pattern")
                }),
        }
    }
}

/// Compiles `query` into one `SELECT DISTINCT` over a join of `edges`, one
/// alias per pattern, ordered by the projection.
pub fn compile_pattern(query: &PatternQuery) -> Result<CompiledPattern, GraphStoreError> {
    if query.patterns.is_empty() {
        return Err(GraphStoreError::invalid_input("pattern query has no patterns"));
    }
    if query.select.is_empty() {
        return Err(GraphStoreError::invalid_input("pattern query selects nothing"));
    }
    let mut compiler = PatternCompiler::default();
    let mut from = Vec::with_capacity(query.patterns.len());
    for (idx, pattern) in query.patterns.iter().enumerate() {
        let alias = format!("e{idx}");
        from.push(format!("edges AS {alias}"));
        compiler.vertex_position(&pattern.subject, format!("{alias}.source"))?;
        compiler.predicate_position(&pattern.predicate, &alias)?;
        compiler.vertex_position(&pattern.object, format!("{alias}.target"))?;
    }

    let mut projected = Vec::with_capacity(query.select.len());
    let mut columns = Vec::with_capacity(query.select.len());
    for (idx, term) in query.select.iter().enumerate() {
        let alias = format!("c{idx}");
        projected.push(format!("{} AS {alias}", compiler.projection(term)?));
        columns.push(alias);
    }

    let mut sql = format!(
        "SELECT DISTINCT {} FROM {}",
        projected.join(", "),
        from.join(", ")
    );
    for join in &compiler.joins {
        sql.push(' ');
        sql.push_str(join);
    }
    if !compiler.conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&compiler.conditions.join(" AND "));
    }
    sql.push_str(" ORDER BY ");
    sql.push_str(&columns.join(", "));

    Ok(CompiledPattern {
        sql,
        params: compiler.params,
        columns,
    })
}

fn row_to_pattern_row(row: &rusqlite::Row<'_>) -> Result<PatternRow, rusqlite::Error> {
    let width = row.as_ref().column_count();
    let mut values = Vec::with_capacity(width);
    for idx in 0..width {
        values.push(row.get(idx)?);
    }
    Ok(PatternRow { values })
}

impl GraphStore {
    /// Runs a compiled pattern query. Rows stream like search results.
    pub fn query_pattern(
        &self,
        query: &PatternQuery,
    ) -> Result<RecordCursor<'_, PatternRow>, GraphStoreError> {
        let compiled = compile_pattern(query)?;
        tracing::debug!(sql = %compiled.sql, params = compiled.params.len(), "pattern query");
        let stmt = self.connection().prepare_cached(&compiled.sql)?;
        Ok(RecordCursor::new(
            stmt,
            NamedParams::from_values(&compiled.params),
            row_to_pattern_row,
        ))
    }
}
