//! Criterion benchmarks for the spatial join.
//!
//! Measures join throughput for a fixed batch of points as the number of
//! regions in the tiling grows. With the bounding-box index in front of the
//! exact test, per-record cost should stay roughly flat across sizes.
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench --package boundary-join-core
//! ```

// Criterion macros generate code that triggers missing_docs warnings.
#![allow(missing_docs, reason = "Criterion macros generate undocumented code")]

use std::hint::black_box;

use boundary_join_core::test_support::{record, store_of, tiling};
use boundary_join_core::{JoinOptions, PointRecord, SpatialJoinEngine};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seed for deterministic point generation.
const BENCHMARK_SEED: u64 = 42;

/// Grid side lengths; the region count is the square of each.
const GRID_SIDES: &[usize] = &[5, 10, 20, 40];

/// Points joined per iteration.
const BATCH_SIZE: usize = 5_000;

/// Extent of every tiling, independent of the region count.
const AREA_SIZE: f64 = 100.0;

/// Sampling window; slightly larger than the tiling so some points miss.
const SAMPLE_MIN: f64 = -5.0;
const SAMPLE_MAX: f64 = 105.0;

fn generate_points(count: usize, seed: u64) -> Vec<PointRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            record(
                rng.gen_range(SAMPLE_MIN..SAMPLE_MAX),
                rng.gen_range(SAMPLE_MIN..SAMPLE_MAX),
            )
        })
        .collect()
}

fn bench_join_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("join_throughput");
    let points = generate_points(BATCH_SIZE, BENCHMARK_SEED);

    #[expect(
        clippy::as_conversions,
        reason = "Safe conversion for a small batch size"
    )]
    let throughput_size = BATCH_SIZE as u64;
    group.throughput(Throughput::Elements(throughput_size));

    for &side in GRID_SIDES {
        #[expect(
            clippy::as_conversions,
            clippy::cast_precision_loss,
            clippy::float_arithmetic,
            reason = "Cell size derived from a small grid side"
        )]
        let cell = AREA_SIZE / side as f64;
        let store = store_of(tiling(side, side, cell));
        let engine = SpatialJoinEngine::new(store, JoinOptions::default());
        let regions = side * side;

        group.bench_with_input(BenchmarkId::new("sequential", regions), &points, |b, input| {
            b.iter(|| black_box(engine.join_all(input.iter().cloned())));
        });

        #[cfg(feature = "parallel")]
        group.bench_with_input(BenchmarkId::new("parallel", regions), &points, |b, input| {
            b.iter(|| black_box(engine.par_join_all(input.clone())));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_join_throughput);
criterion_main!(benches);
