//! # Composition Benchmarks
//!
//! Performance benchmarks for introspec-core metamodel composition.
//!
//! Run with: `cargo bench -p introspec-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use introspec_core::{
    ClassKind, ClassModel, ClassRegistry, MarkerKind, MemberModel, SpecId, SpecificationLoader,
};
use std::hint::black_box;

/// Build a registry of N three-level hierarchies with members and markers.
fn create_registry(size: usize) -> ClassRegistry {
    let mut registry = ClassRegistry::new();
    for i in 0..size {
        let base = format!("Base{i}");
        let leaf = format!("Leaf{i}");
        registry.register(
            ClassModel::new(&base, ClassKind::Entity)
                .with_marker_method(MarkerKind::NavigableParent, "owner")
                .with_marker_method(MarkerKind::Title, "label")
                .with_member(MemberModel::property("name").with_default("unnamed"))
                .with_member(MemberModel::collection("children")),
        );
        registry.register(
            ClassModel::new(&leaf, ClassKind::Entity)
                .with_superclass(&base)
                .with_member(MemberModel::property("detail")),
        );
    }
    registry
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_cold_composition(c: &mut Criterion) {
    let mut group = c.benchmark_group("cold_composition");

    for size in [10, 100, 500].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let loader = SpecificationLoader::new(create_registry(size));
                loader.compose_all().expect("compose");
                black_box(loader)
            });
        });
    }

    group.finish();
}

fn bench_cached_lookup(c: &mut Criterion) {
    let loader = SpecificationLoader::new(create_registry(100));
    loader.compose_all().expect("compose");
    let id = SpecId::new("Leaf50");

    c.bench_function("cached_lookup", |b| {
        b.iter(|| {
            let spec = loader.specification_for(black_box(&id)).expect("spec");
            black_box(spec)
        });
    });
}

fn bench_validation(c: &mut Criterion) {
    c.bench_function("validation_pass", |b| {
        let loader = SpecificationLoader::new(create_registry(100));
        loader.compose_all().expect("compose");
        b.iter(|| black_box(loader.run_validation()));
    });
}

criterion_group!(
    benches,
    bench_cold_composition,
    bench_cached_lookup,
    bench_validation
);
criterion_main!(benches);
