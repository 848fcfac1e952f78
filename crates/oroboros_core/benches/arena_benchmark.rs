//! # Frame Memory Benchmark
//!
//! Bump allocation must stay in the low nanoseconds: a busy frame carves
//! hundreds of thousands of payloads.
//!
//! Run with: `cargo bench --package oroboros_core`

// Benchmarks don't need docs and may have intentionally unused code
#![allow(missing_docs)]
#![allow(dead_code)]
#![allow(unsafe_code)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use oroboros_core::{ArenaPage, FrameSlot, FrameStamp, SortKey};

const PAGE_SIZE: usize = 2 * 1024 * 1024;

fn bench_bump(c: &mut Criterion) {
    let mut group = c.benchmark_group("arena_bump");

    for size in [16usize, 64, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || ArenaPage::try_new(PAGE_SIZE).unwrap(),
                |page| {
                    while let Some(ptr) = page.bump(black_box(size), 16) {
                        black_box(ptr);
                    }
                    page
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_carve_and_write(c: &mut Criterion) {
    let stamp = FrameStamp::new(1, 1);
    c.bench_function("carve_write_u64x4", |b| {
        b.iter_batched(
            || ArenaPage::try_new(PAGE_SIZE).unwrap(),
            |page| {
                for i in 0..10_000u64 {
                    // SAFETY: payloads are never read.
                    let mut slot = unsafe { FrameSlot::carve(&page, 32, 8, stamp) }.unwrap();
                    slot.write(&[i, i + 1, i + 2, i + 3]);
                    black_box(slot.finish());
                }
                page
            },
            criterion::BatchSize::LargeInput,
        );
    });
}

fn bench_sort_keys(c: &mut Criterion) {
    let keys: Vec<SortKey> = (0..100_000u64)
        .map(|i| {
            let priority = i.wrapping_mul(0x9E37_79B9) & 0xFFFF_FFFF;
            SortKey::encode((i % 7) as u8, (i % 13) as u8, priority).unwrap()
        })
        .collect();

    c.bench_function("sort_100k_keys", |b| {
        b.iter_batched(
            || keys.clone(),
            |mut keys| {
                keys.sort();
                keys
            },
            criterion::BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_bump, bench_carve_and_write, bench_sort_keys);
criterion_main!(benches);
