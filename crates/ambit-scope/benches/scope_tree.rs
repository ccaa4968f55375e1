//! Criterion benchmarks for scope trees
//!
//! - Nested create/complete/dispose at increasing depth
//! - Lock delegation from a leaf scope

use std::hint::black_box;

use ambit_scope::{CoreScope, LockId, ScopeOptions, ScopeProvider, ScopeSettings};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn nested_scopes(c: &mut Criterion) {
    let provider = ScopeProvider::in_memory(ScopeSettings::default());
    let mut group = c.benchmark_group("nested_scopes");

    for depth in [1_usize, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| {
                let scopes: Vec<CoreScope> = (0..depth)
                    .map(|_| provider.create_scope(ScopeOptions::new()).unwrap())
                    .collect();
                let mut outcome = false;
                for scope in scopes.iter().rev() {
                    scope.complete().unwrap();
                    outcome = scope.dispose().unwrap();
                }
                black_box(outcome)
            });
        });
    }
    group.finish();
}

fn leaf_locking(c: &mut Criterion) {
    let provider = ScopeProvider::in_memory(ScopeSettings::default());

    c.bench_function("leaf_eager_write_lock", |b| {
        b.iter(|| {
            let root = provider.create_scope(ScopeOptions::new()).unwrap();
            let leaf = provider.create_scope(ScopeOptions::new()).unwrap();
            leaf.eager_write_lock(&[LockId::CONTENT_TREE, LockId::MEDIA_TREE])
                .unwrap();
            leaf.complete().unwrap();
            leaf.dispose().unwrap();
            root.complete().unwrap();
            black_box(root.dispose().unwrap())
        });
    });
}

criterion_group!(benches, nested_scopes, leaf_locking);
criterion_main!(benches);
