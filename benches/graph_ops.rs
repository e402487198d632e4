//! Benchmarks for graph ingestion, inference and retrieval.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use kgraph::config::EngineConfig;
use kgraph::engine::Engine;
use kgraph::graph::{EdgeOptions, NodeOptions, Properties};

const NODES: usize = 2_000;

/// A long `precedes` chain plus an `is_a` fan into a few classes.
fn populated_engine() -> Engine {
    let mut engine = Engine::new(EngineConfig::default()).unwrap();
    for i in 0..NODES {
        engine.add_node(
            format!("n{i}"),
            "Task",
            format!("task number {i}"),
            Properties::new(),
            NodeOptions::default().with_confidence(0.5 + (i % 5) as f32 * 0.1),
        );
    }
    for c in 0..10 {
        engine.add_node(
            format!("class{c}"),
            "Concept",
            format!("class {c}"),
            Properties::new(),
            NodeOptions::default(),
        );
    }
    for i in 1..NODES {
        engine.add_edge(
            format!("n{}", i - 1),
            format!("n{i}"),
            "precedes",
            Properties::new(),
            EdgeOptions::default(),
        );
        engine.add_edge(
            format!("n{i}"),
            format!("class{}", i % 10),
            "is_a",
            Properties::new(),
            EdgeOptions::default(),
        );
    }
    engine
}

fn bench_ingest(c: &mut Criterion) {
    c.bench_function("ingest_2k_chain", |bench| {
        bench.iter(|| black_box(populated_engine().get_stats().edge_count))
    });
}

fn bench_inference(c: &mut Criterion) {
    c.bench_function("inference_pass_2k", |bench| {
        bench.iter_batched(
            populated_engine,
            |mut engine| black_box(engine.run_inference()),
            criterion::BatchSize::LargeInput,
        )
    });
}

fn bench_retrieval(c: &mut Criterion) {
    let engine = populated_engine();
    c.bench_function("context_for_query_2k", |bench| {
        bench.iter(|| black_box(engine.get_context_for_query("task 1999", Some(10))))
    });
}

fn bench_decay(c: &mut Criterion) {
    let mut engine = populated_engine();
    c.bench_function("decay_2k", |bench| {
        bench.iter(|| black_box(engine.apply_confidence_decay(30.0).unwrap()))
    });
}

criterion_group!(benches, bench_ingest, bench_inference, bench_retrieval, bench_decay);
criterion_main!(benches);
