use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{errors::GraphStoreError, ids};

/// A uniquely identified graph node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vertex {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "ns")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub props: Option<Value>,
}

impl Vertex {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            namespace: None,
            props: None,
        }
    }

    /// Vertex whose id is derived from the content of `props`, so identical
    /// payloads always land on the same id.
    pub fn content_addressed(namespace: &str, props: Value) -> Result<Self, GraphStoreError> {
        let id = ids::content_id(namespace, &props)?;
        Ok(Self::new(id).with_namespace(namespace).with_props(props))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_props(mut self, props: Value) -> Self {
        self.props = Some(props);
        self
    }
}

/// A directed relation between two vertex ids.
///
/// `id` and `inverse_name` may be left unset on input; [`Edge::resolve`]
/// fills them with `"{source}:{target}"` and `"inverse({name})"`. Edges read
/// back from the store always carry an id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "inverseName")]
    pub inverse_name: Option<String>,
    #[serde(default, rename = "ns")]
    pub namespace: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub props: Option<Value>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: None,
            name: None,
            inverse_name: None,
            namespace: None,
            source: source.into(),
            target: target.into(),
            props: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_inverse_name(mut self, inverse_name: impl Into<String>) -> Self {
        self.inverse_name = Some(inverse_name.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_props(mut self, props: Value) -> Self {
        self.props = Some(props);
        self
    }

    pub fn resolved_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{}:{}", self.source, self.target))
    }

    pub fn resolved_inverse_name(&self) -> Option<String> {
        self.inverse_name.clone().or_else(|| {
            self.name
                .as_ref()
                .map(|name| format!("inverse({name})"))
        })
    }

    /// Fills in the default id and inverse name.
    pub fn resolve(mut self) -> Self {
        self.id = Some(self.resolved_id());
        self.inverse_name = self.resolved_inverse_name();
        self
    }
}

/// Either kind of stored record, tagged the way the document form tags them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Record {
    Vertex(Vertex),
    Edge(Edge),
}

impl Record {
    pub fn id(&self) -> String {
        match self {
            Record::Vertex(vertex) => vertex.id.clone(),
            Record::Edge(edge) => edge.resolved_id(),
        }
    }

    pub fn as_vertex(&self) -> Option<&Vertex> {
        match self {
            Record::Vertex(vertex) => Some(vertex),
            Record::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Record::Edge(edge) => Some(edge),
            Record::Vertex(_) => None,
        }
    }
}

impl From<Vertex> for Record {
    fn from(vertex: Vertex) -> Self {
        Record::Vertex(vertex)
    }
}

impl From<Edge> for Record {
    fn from(edge: Edge) -> Self {
        Record::Edge(edge)
    }
}

pub(crate) const VERTEX_COLUMNS: &str = "id, name, ns, props";
pub(crate) const EDGE_COLUMNS: &str = "id, name, inverseName, ns, source, target, props";

pub(crate) fn props_to_sql(props: Option<&Value>) -> Result<Option<String>, GraphStoreError> {
    props
        .map(serde_json::to_string)
        .transpose()
        .map_err(GraphStoreError::from)
}

fn props_from_row(row: &rusqlite::Row<'_>, idx: usize) -> Result<Option<Value>, rusqlite::Error> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(None),
        Some(text) => serde_json::from_str(&text).map(Some).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                text.len(),
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        }),
    }
}

/// Maps a row selected with [`VERTEX_COLUMNS`].
pub fn row_to_vertex(row: &rusqlite::Row<'_>) -> Result<Vertex, rusqlite::Error> {
    Ok(Vertex {
        id: row.get(0)?,
        name: row.get(1)?,
        namespace: row.get(2)?,
        props: props_from_row(row, 3)?,
    })
}

/// Maps a row selected with [`EDGE_COLUMNS`].
pub fn row_to_edge(row: &rusqlite::Row<'_>) -> Result<Edge, rusqlite::Error> {
    Ok(Edge {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        inverse_name: row.get(2)?,
        namespace: row.get(3)?,
        source: row.get(4)?,
        target: row.get(5)?,
        props: props_from_row(row, 6)?,
    })
}
