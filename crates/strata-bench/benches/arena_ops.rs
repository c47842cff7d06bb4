//! Criterion micro-benchmarks for arena allocation, growth, and scopes.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use strata_arena::{AllocFlags, Arena, ArenaVec};
use strata_bench::{bench_arena, mixed_sizes};

/// Benchmark: 10K mixed-size raw allocations, then reset.
fn bench_bump_mixed_10k(c: &mut Criterion) {
    let sizes = mixed_sizes(10_000, 4096, 42);
    let mut arena = bench_arena();
    c.bench_function("bump_mixed_10k", |b| {
        b.iter(|| {
            for &size in &sizes {
                let p = arena.alloc_raw(size, 8, 1, AllocFlags::NO_INIT).unwrap();
                black_box(p);
            }
            arena.reset();
        });
    });
}

/// Baseline: the same sizes through the global allocator.
fn bench_box_mixed_10k(c: &mut Criterion) {
    let sizes = mixed_sizes(10_000, 4096, 42);
    c.bench_function("box_mixed_10k", |b| {
        b.iter(|| {
            let boxes: Vec<Box<[u8]>> = sizes
                .iter()
                .map(|&size| vec![0u8; size].into_boxed_slice())
                .collect();
            black_box(boxes);
        });
    });
}

/// Benchmark: zeroed typed allocation of 1K small structs.
fn bench_alloc_zeroed_1k(c: &mut Criterion) {
    let mut arena = Arena::with_capacity(1 << 20);
    c.bench_function("alloc_zeroed_1k", |b| {
        b.iter(|| {
            for _ in 0..1000 {
                black_box(arena.alloc::<[u64; 4]>());
            }
            arena.reset();
        });
    });
}

/// Benchmark: push 100K u32 into an ArenaVec at the tip (in-place growth).
fn bench_vec_push_100k(c: &mut Criterion) {
    let mut arena = bench_arena();
    c.bench_function("arena_vec_push_100k", |b| {
        b.iter(|| {
            {
                let mut v = ArenaVec::new_in(&arena);
                for i in 0..100_000u32 {
                    v.push(i);
                }
                black_box(v.len());
            }
            arena.reset();
        });
    });
}

/// Benchmark: two interleaved ArenaVecs (every growth relocates).
fn bench_vec_interleaved_10k(c: &mut Criterion) {
    let mut arena = bench_arena();
    c.bench_function("arena_vec_interleaved_10k", |b| {
        b.iter(|| {
            {
                let mut a = ArenaVec::new_in(&arena);
                let mut z = ArenaVec::new_in(&arena);
                for i in 0..10_000u32 {
                    a.push(i);
                    z.push(i);
                }
                black_box((a.len(), z.len()));
            }
            arena.reset();
        });
    });
}

/// Benchmark: open a scratch scope, allocate 64 blocks, close it.
fn bench_scratch_scope(c: &mut Criterion) {
    let arena = Arena::with_capacity(1 << 20);
    c.bench_function("scratch_scope_64", |b| {
        b.iter(|| {
            let scratch = arena.scratch();
            for _ in 0..64 {
                black_box(scratch.alloc_slice_uninit::<u8>(128));
            }
        });
    });
}

/// Benchmark: fresh commit-on-demand arena, touch 4MB, drop.
fn bench_commit_growth(c: &mut Criterion) {
    c.bench_function("commit_growth_4mb", |b| {
        b.iter_batched(
            bench_arena,
            |arena| {
                for _ in 0..64 {
                    black_box(arena.alloc_slice_uninit::<u8>(64 * 1024));
                }
                arena
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_bump_mixed_10k,
    bench_box_mixed_10k,
    bench_alloc_zeroed_1k,
    bench_vec_push_100k,
    bench_vec_interleaved_10k,
    bench_scratch_scope,
    bench_commit_growth,
);
criterion_main!(benches);
