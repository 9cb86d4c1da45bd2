use serde_json::json;
use vertexstore::{Edge, GraphStore, Pagination, Vertex, WhereClause};

fn people_store() -> GraphStore {
    let store = GraphStore::open_in_memory().expect("store");
    let people = [
        ("alice", json!({ "name": "Alice", "age": 31, "team": "core", "active": true })),
        ("bob", json!({ "name": "Bob", "age": 27, "team": "infra", "active": false })),
        ("carol", json!({ "name": "Carol", "age": 31, "team": "infra", "active": true })),
        ("dave", json!({ "name": "Dave", "age": 45, "team": "core" })),
    ];
    for (id, props) in people {
        store
            .insert_vertex(&Vertex::new(id).with_props(props))
            .expect("vertex");
    }
    store
}

fn ids(vertices: &[Vertex]) -> Vec<&str> {
    vertices.iter().map(|v| v.id.as_str()).collect()
}

#[test]
fn test_search_by_equality() {
    let store = people_store();
    let found = store
        .search_vertices(&WhereClause::new().eq("age", 31), None)
        .expect("search")
        .collect_all()
        .expect("rows");
    assert_eq!(ids(&found), vec!["alice", "carol"]);
}

#[test]
fn test_search_boolean_and_null() {
    let store = people_store();
    let active = store
        .search_vertices(&WhereClause::new().eq("active", true), None)
        .expect("search")
        .collect_all()
        .expect("rows");
    assert_eq!(ids(&active), vec!["alice", "carol"]);

    let missing = store
        .search_vertices(&WhereClause::new().eq("active", json!(null)), None)
        .expect("search")
        .collect_all()
        .expect("rows");
    assert_eq!(ids(&missing), vec!["dave"]);
}

#[test]
fn test_search_string_operators() {
    let store = people_store();
    let run = |clause: WhereClause| {
        store
            .search_vertices(&clause, None)
            .expect("search")
            .collect_all()
            .expect("rows")
            .into_iter()
            .map(|v| v.id)
            .collect::<Vec<_>>()
    };
    assert_eq!(run(WhereClause::new().like("name", "aro")), vec!["carol"]);
    assert_eq!(run(WhereClause::new().starts_with("team", "in")), vec!["bob", "carol"]);
    assert_eq!(run(WhereClause::new().ends_with("name", "ve")), vec!["dave"]);
}

#[test]
fn test_search_with_or_sub_clause() {
    let store = people_store();
    let clause = WhereClause::new()
        .eq("team", "core")
        .or(WhereClause::new().eq("name", "Bob"));
    let found = store
        .search_vertices(&clause, None)
        .expect("search")
        .collect_all()
        .expect("rows");
    assert_eq!(ids(&found), vec!["alice", "bob", "dave"]);
}

#[test]
fn test_sibling_after_or_still_applies() {
    let store = people_store();
    let clause = WhereClause::new()
        .eq("team", "core")
        .or(WhereClause::new().eq("name", "Bob"))
        .eq("active", true);
    let found = store
        .search_vertices(&clause, None)
        .expect("search")
        .collect_all()
        .expect("rows");
    assert_eq!(ids(&found), vec!["alice"]);

    let store = GraphStore::open_in_memory().expect("store");
    store
        .insert_vertex(&Vertex::new("x").with_props(json!({ "a": 1, "b": 0, "e": 0 })))
        .expect("vertex");
    let clause = WhereClause::from_json(&json!({
        "a": { "eq": 1 },
        "OR": { "b": { "eq": 2 } },
        "e": { "eq": 5 }
    }))
    .expect("clause");
    let found = store
        .search_vertices(&clause, None)
        .expect("search")
        .collect_all()
        .expect("rows");
    assert!(found.is_empty());
}

#[test]
fn test_string_operators_match_wildcards_literally() {
    let store = GraphStore::open_in_memory().expect("store");
    for (id, label) in [
        ("pct", "50% off"),
        ("num", "500 off"),
        ("under", "a_b"),
        ("plain", "axb"),
    ] {
        store
            .insert_vertex(&Vertex::new(id).with_props(json!({ "label": label })))
            .expect("vertex");
    }
    let search = |clause: WhereClause| {
        store
            .search_vertices(&clause, None)
            .expect("search")
            .collect_all()
            .expect("rows")
            .into_iter()
            .map(|v| v.id)
            .collect::<Vec<_>>()
    };
    assert_eq!(search(WhereClause::new().like("label", "50%")), vec!["pct"]);
    assert_eq!(search(WhereClause::new().starts_with("label", "a_")), vec!["under"]);
    assert_eq!(search(WhereClause::new().ends_with("label", "%")), Vec::<String>::new());
    assert_eq!(search(WhereClause::new().like("label", "off")), vec!["pct", "num"]);
}

#[test]
fn test_search_from_json_document() {
    let store = people_store();
    let clause = WhereClause::from_json(&json!({
        "team": { "eq": "infra" },
        "AND": { "age": { "eq": 31 } }
    }))
    .expect("clause");
    let found = store
        .search_vertices(&clause, None)
        .expect("search")
        .collect_all()
        .expect("rows");
    assert_eq!(ids(&found), vec!["carol"]);
}

#[test]
fn test_empty_clause_matches_all_and_paginates() {
    let store = people_store();
    let all = store
        .search_vertices(&WhereClause::new(), None)
        .expect("search")
        .collect_all()
        .expect("rows");
    assert_eq!(all.len(), 4);

    let page = store
        .search_vertices(&WhereClause::new(), Some(Pagination::new(1, 2)))
        .expect("search")
        .collect_all()
        .expect("rows");
    assert_eq!(ids(&page), vec!["bob", "carol"]);
}

#[test]
fn test_cursor_is_restartable() {
    let store = people_store();
    let mut cursor = store
        .search_vertices(&WhereClause::new().eq("team", "core"), None)
        .expect("search");
    let first: Vec<_> = cursor.rows().expect("rows").take(1).collect();
    assert_eq!(first.len(), 1);
    let again = cursor.collect_all().expect("rows");
    assert_eq!(ids(&again), vec!["alice", "dave"]);
}

#[test]
fn test_search_edges_by_props() {
    let store = people_store();
    store
        .insert_edge(&Edge::new("alice", "bob").with_props(json!({ "since": 2020 })))
        .expect("edge");
    store
        .insert_edge(&Edge::new("carol", "dave").with_props(json!({ "since": 2021 })))
        .expect("edge");
    let found = store
        .search_edges(&WhereClause::new().eq("since", 2021))
        .expect("search")
        .collect_all()
        .expect("rows");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id.as_deref(), Some("carol:dave"));
}

#[test]
fn test_search_rejects_unsafe_field_name() {
    let store = people_store();
    let result = store.search_vertices(&WhereClause::new().eq("name') OR 1=1 --", "x"), None);
    assert!(matches!(
        result.err(),
        Some(vertexstore::GraphStoreError::InvalidInput(_))
    ));
}

#[test]
fn test_raw_query() {
    let store = people_store();
    let rows = store
        .raw(
            "SELECT id, json_extract(props, '$.age') AS age FROM vertices WHERE id = :0",
            &[json!("dave")],
        )
        .expect("raw");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], json!("dave"));
    assert_eq!(rows[0]["age"], json!(45));
}
