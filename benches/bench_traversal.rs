use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::json;
use vertexstore::{Edge, GraphStore, TraversalDirection, Vertex, WhereClause};

const ER_SEED: u64 = 0xEE45;
const SAMPLE_SIZE: usize = 20;
const WARM_UP: Duration = Duration::from_millis(300);
const MEASURE: Duration = Duration::from_millis(500);

struct PreparedGraph {
    store: GraphStore,
    label: &'static str,
}

fn bench_scale() -> usize {
    #[cfg(feature = "bench-ci")]
    {
        1_000
    }
    #[cfg(not(feature = "bench-ci"))]
    {
        5_000
    }
}

fn materialize(vertices: Vec<Vertex>, edges: Vec<Edge>, label: &'static str) -> PreparedGraph {
    let store = GraphStore::open_in_memory().expect("store");
    let mut batch = store.batch();
    batch.extend(vertices).expect("vertices");
    batch.extend(edges).expect("edges");
    batch.commit().expect("commit");
    PreparedGraph { store, label }
}

fn line(nodes: usize) -> PreparedGraph {
    let vertices = (0..nodes).map(|i| Vertex::new(format!("n{i}"))).collect();
    let edges = (1..nodes)
        .map(|i| Edge::new(format!("n{}", i - 1), format!("n{i}")))
        .collect();
    materialize(vertices, edges, "line")
}

fn random(nodes: usize, seed: u64) -> PreparedGraph {
    let mut rng = StdRng::seed_from_u64(seed);
    let vertices = (0..nodes)
        .map(|i| Vertex::new(format!("n{i}")).with_props(json!({ "bucket": i % 10 })))
        .collect();
    let edges = (0..nodes.saturating_mul(4))
        .map(|i| {
            let from = rng.gen_range(0..nodes);
            let to = rng.gen_range(0..nodes);
            Edge::new(format!("n{from}"), format!("n{to}")).with_id(format!("e{i}"))
        })
        .collect();
    materialize(vertices, edges, "er")
}

fn prepared_graphs() -> Vec<PreparedGraph> {
    let nodes = bench_scale();
    vec![line(nodes), random(nodes, ER_SEED)]
}

fn bench_traverse(c: &mut Criterion) {
    let graphs = prepared_graphs();
    for (name, direction) in [
        ("traverse_both", TraversalDirection::Both),
        ("traverse_targets", TraversalDirection::Targets),
    ] {
        let mut group = c.benchmark_group(name);
        group.sample_size(SAMPLE_SIZE);
        group.warm_up_time(WARM_UP);
        group.measurement_time(MEASURE);
        for prepared in &graphs {
            group.bench_function(prepared.label, |b| {
                b.iter(|| {
                    prepared
                        .store
                        .traverse("n0", direction)
                        .map(|event| event.expect("event"))
                        .count()
                });
            });
        }
        group.finish();
    }
}

fn bench_search(c: &mut Criterion) {
    let graphs = prepared_graphs();
    let clause = WhereClause::new().eq("bucket", 3);
    let mut group = c.benchmark_group("search_vertices");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    for prepared in &graphs {
        group.bench_function(prepared.label, |b| {
            b.iter(|| {
                prepared
                    .store
                    .search_vertices(&clause, None)
                    .expect("search")
                    .collect_all()
                    .expect("rows")
                    .len()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_traverse, bench_search);
criterion_main!(benches);
