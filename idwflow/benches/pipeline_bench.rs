//! Benchmarks for interpolation and full pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use idwflow::analysis::idw::{idw, IdwParams, SamplePoint};
use idwflow::prelude::*;
use idwflow::testing::WorkspaceFixture;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn samples(n: usize) -> Vec<SamplePoint> {
    let mut rng = StdRng::seed_from_u64(1);
    (0..n)
        .map(|_| {
            let x = rng.gen_range(0.0..1000.0);
            let y = rng.gen_range(0.0..1000.0);
            SamplePoint::new(x, y, rng.gen_range(0.0..10.0))
        })
        .collect()
}

fn idw_benchmark(c: &mut Criterion) {
    let points = samples(200);
    let mut group = c.benchmark_group("idw");

    for neighbours in [0, 12] {
        let params = IdwParams::covering(&points, Some(10.0), 2.0, neighbours)
            .expect("valid grid");
        group.bench_with_input(
            BenchmarkId::new("neighbours", neighbours),
            &params,
            |b, params| b.iter(|| idw(black_box(&points), params)),
        );
    }
    group.finish();
}

fn pipeline_benchmark(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("temp dir");
    WorkspaceFixture::new()
        .with_cell_size(25.0)
        .write_to(dir.path())
        .expect("fixture");
    let workspace = WorkspaceContext::open(dir.path()).expect("workspace");
    let pipeline = Pipeline::new(workspace, NativeBackend::new());

    c.bench_function("native_pipeline", |b| {
        b.iter(|| pipeline.run(black_box("2")))
    });
}

criterion_group!(benches, idw_benchmark, pipeline_benchmark);
criterion_main!(benches);
