//! Benchmarks for the rewrite worklist and driver.
//!
//! Measures the cost of the raw worklist operations and of a full fixpoint run:
//! - Seeding and draining with and without duplicates
//! - Remove/replace churn (stale entries in the sequence)
//! - Tracing disabled vs. recording into an event log
//! - A driver run that halves numbers until they reach 1

extern crate optcore;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use optcore::{
    compiler::{EventLog, RewriteContext},
    Arena, Handle, Result, RewriteAction, RewriteConfig, RewriteDriver, RewriteRule, Worklist,
};
use std::hint::black_box;

const ELEMENTS: u32 = 10_000;

/// Benchmark seeding 10k distinct elements and draining them.
fn bench_add_pop(c: &mut Criterion) {
    c.bench_function("worklist_add_pop_10k", |b| {
        b.iter(|| {
            let mut worklist = Worklist::new("bench");
            worklist.add_initial_group(0..ELEMENTS);
            while let Some(element) = worklist.pop() {
                black_box(element);
            }
        });
    });
}

/// Benchmark adding every element four times before draining.
fn bench_duplicates(c: &mut Criterion) {
    c.bench_function("worklist_duplicates_10k", |b| {
        b.iter(|| {
            let mut worklist = Worklist::new("bench");
            for _ in 0..4 {
                for element in 0..ELEMENTS {
                    worklist.add(black_box(element));
                }
            }
            black_box(worklist.len())
        });
    });
}

/// Benchmark removing half of the elements and replacing the rest.
fn bench_remove_replace(c: &mut Criterion) {
    c.bench_function("worklist_remove_replace_10k", |b| {
        b.iter_batched(
            || {
                let mut worklist = Worklist::new("bench");
                worklist.add_initial_group(0..ELEMENTS);
                worklist
            },
            |mut worklist| {
                for element in 0..ELEMENTS {
                    if element % 2 == 0 {
                        worklist.remove(element);
                    } else {
                        worklist.replace(element, element + ELEMENTS);
                    }
                }
                black_box(worklist.pop())
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark the same traffic while recording every operation.
fn bench_traced(c: &mut Criterion) {
    c.bench_function("worklist_traced_1k", |b| {
        b.iter(|| {
            let log = EventLog::new();
            let mut worklist = Worklist::with_tracer("bench", &log);
            worklist.add_initial_group(0..1_000u32);
            while worklist.pop().is_some() {}
            black_box(log.len())
        });
    });
}

struct Halve;

impl RewriteRule<u32> for Halve {
    fn name(&self) -> &'static str {
        "halve"
    }

    fn rewrite(&mut self, handle: Handle, ctx: &mut RewriteContext<'_, u32>) -> Result<RewriteAction> {
        match ctx.get(handle).copied() {
            Some(n) if n > 1 => {
                let a = ctx.insert(n / 2);
                let b = ctx.insert(n - n / 2);
                Ok(RewriteAction::Replaced(vec![a, b]))
            }
            _ => Ok(RewriteAction::Unchanged),
        }
    }
}

/// Benchmark a driver run that splits 64 seeds of 256 into 16k unit elements.
fn bench_driver(c: &mut Criterion) {
    c.bench_function("driver_halve_64x256", |b| {
        b.iter_batched(
            || {
                let mut arena = Arena::with_capacity(64 * 512);
                let seeds: Vec<Handle> = (0..64).map(|_| arena.insert(256u32)).collect();
                (arena, seeds)
            },
            |(mut arena, seeds)| {
                let driver = RewriteDriver::new(RewriteConfig::default());
                let stats = driver.run(&mut arena, seeds, &mut Halve).unwrap();
                black_box(stats)
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_add_pop,
    bench_duplicates,
    bench_remove_replace,
    bench_traced,
    bench_driver,
);
criterion_main!(benches);
