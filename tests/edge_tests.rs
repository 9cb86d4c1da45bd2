use serde_json::json;
use vertexstore::{Edge, EdgeDirection, GraphStore, GraphStoreError, TraversalDirection, Vertex};

fn store_with_vertices(ids: &[&str]) -> GraphStore {
    let store = GraphStore::open_in_memory().expect("store");
    for id in ids {
        store.insert_vertex(&Vertex::new(*id)).expect("vertex");
    }
    store
}

#[test]
fn test_get_edges_in_every_direction() {
    let store = store_with_vertices(&["1", "2"]);
    let edge = Edge::new("1", "2")
        .with_id("12abc")
        .with_props(json!({ "fact": "abc" }));
    store.insert_edge(&edge).expect("edge");

    let from_to = store.get_edges("1", "2", EdgeDirection::FromTo).expect("fromTo");
    let to_from = store.get_edges("2", "1", EdgeDirection::ToFrom).expect("toFrom");
    let both = store.get_edges("2", "1", EdgeDirection::Both).expect("both");

    assert_eq!(from_to.len(), 1);
    assert_eq!(from_to, to_from);
    assert_eq!(from_to, both);
    let stored = &from_to[0];
    assert_eq!(stored.id.as_deref(), Some("12abc"));
    assert_eq!(stored.source, "1");
    assert_eq!(stored.target, "2");
    assert_eq!(stored.props, Some(json!({ "fact": "abc" })));
}

#[test]
fn test_get_edges_both_puts_reverse_direction_first() {
    let store = store_with_vertices(&["a", "b"]);
    store.insert_edge(&Edge::new("a", "b")).expect("ab");
    store.insert_edge(&Edge::new("b", "a")).expect("ba");

    let both = store.get_edges("a", "b", EdgeDirection::Both).expect("both");
    let ids: Vec<_> = both.iter().filter_map(|e| e.id.clone()).collect();
    assert_eq!(ids, vec!["b:a", "a:b"]);
}

#[test]
fn test_edge_defaults() {
    let store = store_with_vertices(&["s", "t"]);
    let id = store
        .insert_edge(&Edge::new("s", "t").with_name("likes"))
        .expect("edge");
    assert_eq!(id, "s:t");
    let stored = store.get_edge_by_id("s:t").expect("get").expect("present");
    assert_eq!(stored.name.as_deref(), Some("likes"));
    assert_eq!(stored.inverse_name.as_deref(), Some("inverse(likes)"));

    store.delete_edge("s:t").expect("delete");
    let unnamed = store.insert_edge(&Edge::new("s", "t")).expect("edge");
    let stored = store.get_edge_by_id(&unnamed).expect("get").expect("present");
    assert_eq!(stored.inverse_name, None);
}

#[test]
fn test_duplicate_edge_id_is_constraint_violation() {
    let store = store_with_vertices(&["a", "b"]);
    store.insert_edge(&Edge::new("a", "b")).expect("first");
    let err = store.insert_edge(&Edge::new("a", "b")).expect_err("dup");
    assert!(err.is_constraint_violation());
    assert_eq!(store.edge_count().expect("count"), 1);
}

#[test]
fn test_edge_endpoints_must_exist() {
    let store = store_with_vertices(&["a"]);
    let err = store
        .insert_edge(&Edge::new("a", "missing"))
        .expect_err("dangling target");
    assert!(err.is_constraint_violation());
    assert_eq!(store.edge_count().expect("count"), 0);
}

#[test]
fn test_update_edge() {
    let store = store_with_vertices(&["a", "b", "c"]);
    let id = store
        .insert_edge(&Edge::new("a", "b").with_name("r"))
        .expect("edge");
    let moved = Edge::new("a", "c")
        .with_id(id.clone())
        .with_name("r2")
        .with_props(json!({ "w": 2 }));
    store.update_edge(&moved).expect("update");

    let stored = store.get_edge_by_id(&id).expect("get").expect("present");
    assert_eq!(stored.target, "c");
    assert_eq!(stored.inverse_name.as_deref(), Some("inverse(r2)"));
    assert_eq!(stored.props, Some(json!({ "w": 2 })));

    let mut dangling = moved.clone();
    dangling.target = "nowhere".to_string();
    assert!(store.update_edge(&dangling).expect_err("dangling").is_constraint_violation());

    let err = store
        .update_edge(&Edge::new("a", "b").with_id("ghost"))
        .expect_err("missing");
    assert!(matches!(err, GraphStoreError::NotFound(_)));
}

#[test]
fn test_delete_vertex_leaves_edges() {
    let store = store_with_vertices(&["a", "b"]);
    store.insert_edge(&Edge::new("a", "b")).expect("edge");
    store.delete_vertex("b").expect("delete vertex");

    assert!(store.get_vertex_by_id("b").expect("get").is_none());
    assert!(store.get_edge_by_id("a:b").expect("get").is_some());

    let events: Vec<_> = store
        .traverse("a", TraversalDirection::Targets)
        .collect::<Result<_, _>>()
        .expect("traverse");
    // the dangling endpoint is reached but has no vertex event
    assert_eq!(events.len(), 2);
}

#[test]
fn test_get_edge_miss_is_none() {
    let store = store_with_vertices(&[]);
    assert!(store.get_edge_by_id("nope").expect("get").is_none());
    store.delete_edge("nope").expect("delete");
}
