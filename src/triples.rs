//! Subject → predicate → object(s) descriptions flattened into records.
//!
//! ```text
//! Bob --friendOf--> Alice
//! TripleInput::new("Bob").with("friendOf", "Alice")
//!   => vertex Bob, vertex Alice, edge "Bob:friendOf:Alice"
//! ```
//!
//! Subjects are inserted outright. A vertex that only shows up as an object
//! is linked: it is created when missing and kept as is when already
//! stored.

use ahash::AHashMap;
use serde_json::Value;

use crate::{
    batch::CommitReport,
    errors::GraphStoreError,
    graph::{Edge, GraphStore, Record, Vertex},
};

/// A vertex given by its parts. At least one of `id` or `name` must be set;
/// the id falls back to the name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexInput {
    pub id: Option<String>,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub props: Option<Value>,
}

/// An edge given by its parts. At least one of `id` or `name` must be set.
/// Unset endpoints are filled from the triple it appears in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeInput {
    pub id: Option<String>,
    pub name: Option<String>,
    pub inverse_name: Option<String>,
    pub namespace: Option<String>,
    pub source: Option<String>,
    pub target: Option<String>,
    pub props: Option<Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum VertexRef {
    /// Used as both id and name.
    Id(String),
    Partial(VertexInput),
}

#[derive(Clone, Debug, PartialEq)]
pub enum EdgeRef {
    /// Used as the edge name; the id is derived from the endpoints.
    Name(String),
    Partial(EdgeInput),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ObjectRef {
    One(VertexRef),
    /// Fan-out: one edge per object, all sharing the predicate.
    Many(Vec<ObjectRef>),
    /// The object, which in turn becomes the subject of another predicate.
    Chain(VertexRef, Box<PredicateObject>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PredicateObject {
    pub predicate: EdgeRef,
    pub object: ObjectRef,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TripleInput {
    pub subject: VertexRef,
    pub predicates: Vec<PredicateObject>,
}

impl TripleInput {
    pub fn new(subject: impl Into<VertexRef>) -> Self {
        Self {
            subject: subject.into(),
            predicates: Vec::new(),
        }
    }

    pub fn with(mut self, predicate: impl Into<EdgeRef>, object: impl Into<ObjectRef>) -> Self {
        self.predicates.push(PredicateObject {
            predicate: predicate.into(),
            object: object.into(),
        });
        self
    }
}

impl ObjectRef {
    pub fn many<I, V>(objects: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<VertexRef>,
    {
        ObjectRef::Many(
            objects
                .into_iter()
                .map(|v| ObjectRef::One(v.into()))
                .collect(),
        )
    }

    pub fn chain(
        object: impl Into<VertexRef>,
        predicate: impl Into<EdgeRef>,
        next: impl Into<ObjectRef>,
    ) -> Self {
        ObjectRef::Chain(
            object.into(),
            Box::new(PredicateObject {
                predicate: predicate.into(),
                object: next.into(),
            }),
        )
    }
}

impl From<&str> for VertexRef {
    fn from(id: &str) -> Self {
        VertexRef::Id(id.to_string())
    }
}

impl From<String> for VertexRef {
    fn from(id: String) -> Self {
        VertexRef::Id(id)
    }
}

impl From<VertexInput> for VertexRef {
    fn from(input: VertexInput) -> Self {
        VertexRef::Partial(input)
    }
}

impl From<Vertex> for VertexRef {
    fn from(vertex: Vertex) -> Self {
        VertexRef::Partial(VertexInput {
            id: Some(vertex.id),
            name: vertex.name,
            namespace: vertex.namespace,
            props: vertex.props,
        })
    }
}

impl From<&str> for EdgeRef {
    fn from(name: &str) -> Self {
        EdgeRef::Name(name.to_string())
    }
}

impl From<String> for EdgeRef {
    fn from(name: String) -> Self {
        EdgeRef::Name(name)
    }
}

impl From<EdgeInput> for EdgeRef {
    fn from(input: EdgeInput) -> Self {
        EdgeRef::Partial(input)
    }
}

impl From<VertexRef> for ObjectRef {
    fn from(vertex: VertexRef) -> Self {
        ObjectRef::One(vertex)
    }
}

impl From<&str> for ObjectRef {
    fn from(id: &str) -> Self {
        ObjectRef::One(id.into())
    }
}

impl From<String> for ObjectRef {
    fn from(id: String) -> Self {
        ObjectRef::One(id.into())
    }
}

impl From<VertexInput> for ObjectRef {
    fn from(input: VertexInput) -> Self {
        ObjectRef::One(input.into())
    }
}

impl From<Vertex> for ObjectRef {
    fn from(vertex: Vertex) -> Self {
        ObjectRef::One(vertex.into())
    }
}

impl VertexRef {
    fn to_vertex(&self) -> Result<Vertex, GraphStoreError> {
        match self {
            VertexRef::Id(id) => Ok(Vertex::new(id.clone()).with_name(id.clone())),
            VertexRef::Partial(input) => {
                let id = input
                    .id
                    .clone()
                    .or_else(|| input.name.clone())
                    .ok_or_else(|| GraphStoreError::validation("vertex input needs an id or a name"))?;
                Ok(Vertex {
                    id,
                    name: input.name.clone(),
                    namespace: input.namespace.clone(),
                    props: input.props.clone(),
                })
            }
        }
    }
}

impl EdgeRef {
    fn validate(&self) -> Result<(), GraphStoreError> {
        match self {
            EdgeRef::Partial(input) if input.id.is_none() && input.name.is_none() => Err(
                GraphStoreError::validation("edge input needs an id or a name"),
            ),
            _ => Ok(()),
        }
    }

    fn to_edge(&self, subject: &str, object: &str) -> Edge {
        let edge = match self {
            EdgeRef::Name(name) => {
                Edge::new(subject, object)
                    .with_name(name.clone())
                    .with_id(format!("{subject}:{name}:{object}"))
            }
            EdgeRef::Partial(input) => {
                let source = input.source.clone().unwrap_or_else(|| subject.to_string());
                let target = input.target.clone().unwrap_or_else(|| object.to_string());
                let id = input.id.clone().unwrap_or_else(|| match &input.name {
                    Some(name) => format!("{source}:{name}:{target}"),
                    None => format!("{source}:{target}"),
                });
                Edge {
                    id: Some(id),
                    name: input.name.clone(),
                    inverse_name: input.inverse_name.clone(),
                    namespace: input.namespace.clone(),
                    source,
                    target,
                    props: input.props.clone(),
                }
            }
        };
        edge.resolve()
    }
}

/// Accumulates records in first-seen order, dropping structural repeats.
/// `linked[i]` is set while record `i` has only been seen as an object.
#[derive(Default)]
struct Flattened {
    records: Vec<Record>,
    linked: Vec<bool>,
    seen: AHashMap<String, usize>,
}

impl Flattened {
    fn push(&mut self, record: Record, linked: bool) -> Result<(), GraphStoreError> {
        let key = serde_json::to_string(&record)?;
        match self.seen.get(&key) {
            Some(&idx) => self.linked[idx] &= linked,
            None => {
                self.seen.insert(key, self.records.len());
                self.records.push(record);
                self.linked.push(linked);
            }
        }
        Ok(())
    }

    fn subject(&mut self, triple: &TripleInput) -> Result<(), GraphStoreError> {
        let subject = triple.subject.to_vertex()?;
        let id = subject.id.clone();
        self.push(Record::Vertex(subject), false)?;
        for link in &triple.predicates {
            self.predicate(&id, link)?;
        }
        Ok(())
    }

    fn predicate(&mut self, subject: &str, link: &PredicateObject) -> Result<(), GraphStoreError> {
        link.predicate.validate()?;
        self.object(subject, &link.predicate, &link.object)
    }

    fn object(
        &mut self,
        subject: &str,
        predicate: &EdgeRef,
        object: &ObjectRef,
    ) -> Result<(), GraphStoreError> {
        match object {
            ObjectRef::One(vertex) => {
                self.link(subject, predicate, vertex)?;
            }
            ObjectRef::Many(objects) => {
                for object in objects {
                    self.object(subject, predicate, object)?;
                }
            }
            ObjectRef::Chain(vertex, next) => {
                let id = self.link(subject, predicate, vertex)?;
                self.predicate(&id, next)?;
            }
        }
        Ok(())
    }

    fn link(
        &mut self,
        subject: &str,
        predicate: &EdgeRef,
        object: &VertexRef,
    ) -> Result<String, GraphStoreError> {
        let vertex = object.to_vertex()?;
        let id = vertex.id.clone();
        self.push(Record::Vertex(vertex), true)?;
        self.push(Record::Edge(predicate.to_edge(subject, &id)), false)?;
        Ok(id)
    }
}

/// Flattens `triples` into vertex and edge records, in first-seen order,
/// without structural duplicates. Malformed inputs fail before anything is
/// returned.
pub fn normalize(triples: &[TripleInput]) -> Result<Vec<Record>, GraphStoreError> {
    Ok(flatten(triples)?.records)
}

fn flatten(triples: &[TripleInput]) -> Result<Flattened, GraphStoreError> {
    let mut out = Flattened::default();
    for triple in triples {
        out.subject(triple)?;
    }
    Ok(out)
}

impl GraphStore {
    /// Normalizes and writes `triples` in one batch transaction. A subject
    /// that is already stored fails the batch; an object that is already
    /// stored is linked to as is.
    pub fn insert_triples(&self, triples: &[TripleInput]) -> Result<CommitReport, GraphStoreError> {
        let flattened = flatten(triples)?;
        let mut batch = self.batch();
        for (record, linked) in flattened.records.into_iter().zip(flattened.linked) {
            match record {
                Record::Vertex(vertex) if linked => batch.push_linked(vertex)?,
                record => batch.push(record)?,
            };
        }
        batch.commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(records: &[Record]) -> Vec<String> {
        records.iter().map(Record::id).collect()
    }

    #[test]
    fn test_single_triple() {
        let records = normalize(&[TripleInput::new("Bob").with("friendOf", "Alice")]).unwrap();
        assert_eq!(ids(&records), vec!["Bob", "Alice", "Bob:friendOf:Alice"]);
        let edge = records[2].as_edge().unwrap();
        assert_eq!(edge.source, "Bob");
        assert_eq!(edge.target, "Alice");
        assert_eq!(edge.name.as_deref(), Some("friendOf"));
        assert_eq!(edge.inverse_name.as_deref(), Some("inverse(friendOf)"));
    }

    #[test]
    fn test_fan_out_and_chain() {
        let triple = TripleInput::new("band")
            .with("member", ObjectRef::many(["john", "paul"]))
            .with("album", ObjectRef::chain("imagine", "artist", "john"));
        let records = normalize(&[triple]).unwrap();
        assert_eq!(
            ids(&records),
            vec![
                "band",
                "john",
                "band:member:john",
                "paul",
                "band:member:paul",
                "imagine",
                "band:album:imagine",
                "imagine:artist:john",
            ]
        );
    }

    #[test]
    fn test_partial_inputs() {
        let subject = VertexInput {
            name: Some("acme".into()),
            props: Some(json!({ "size": 10 })),
            ..Default::default()
        };
        let edge = EdgeInput {
            name: Some("employs".into()),
            target: Some("override".into()),
            ..Default::default()
        };
        let records = normalize(&[TripleInput::new(subject).with(edge, "bob")]).unwrap();
        assert_eq!(records[0].as_vertex().unwrap().id, "acme");
        let edge = records[2].as_edge().unwrap();
        assert_eq!(edge.id.as_deref(), Some("acme:employs:override"));
        assert_eq!(edge.target, "override");
    }

    #[test]
    fn test_missing_id_and_name_is_validation_error() {
        let err = normalize(&[TripleInput::new(VertexInput::default())]).unwrap_err();
        assert!(matches!(err, GraphStoreError::ValidationError(_)));
        let err = normalize(&[TripleInput::new("a").with(EdgeInput::default(), "b")]).unwrap_err();
        assert!(matches!(err, GraphStoreError::ValidationError(_)));
    }

    #[test]
    fn test_objects_are_linked_until_seen_as_subject() {
        let out = flatten(&[
            TripleInput::new("a").with("r", "b"),
            TripleInput::new("c").with("r", "a"),
            TripleInput::new("b").with("r", "c"),
        ])
        .unwrap();
        let linked: Vec<String> = out
            .records
            .iter()
            .zip(&out.linked)
            .filter(|(_, linked)| **linked)
            .map(|(record, _)| record.id())
            .collect();
        assert!(linked.is_empty());
        let out = flatten(&[TripleInput::new("a").with("r", "b")]).unwrap();
        assert_eq!(out.linked, vec![false, true, false]);
    }

    #[test]
    fn test_repeated_records_are_kept_once() {
        let records = normalize(&[
            TripleInput::new("a").with("r", "b"),
            TripleInput::new("b").with("r", "a"),
            TripleInput::new("a").with("r", "b"),
        ])
        .unwrap();
        assert_eq!(ids(&records), vec!["a", "b", "a:r:b", "b:r:a"]);
    }
}
