//! Client-layer benchmarks for prettysql.
//!
//! Benchmarks for:
//! - Named-parameter processing
//! - Cached result materialization
//! - Cursor navigation and column lookup
//! - Query registry eviction

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use prettysql_bench::utils::{braced_query, film_columns, generate_film_rows, named_query};
use prettysql_client::driver::BufferedRows;
use prettysql_client::registry::BoundedQueue;
use prettysql_client::{CachedScrollableResult, NamedQueryPlan};

/// Benchmark named-parameter processing.
fn bench_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("params/process");

    for count in [1, 8, 32].iter() {
        let bare = named_query(*count);
        let braced = braced_query(*count);

        group.bench_with_input(BenchmarkId::new("bare", count), &bare, |b, sql| {
            b.iter(|| black_box(NamedQueryPlan::process(black_box(sql))));
        });
        group.bench_with_input(BenchmarkId::new("braced", count), &braced, |b, sql| {
            b.iter(|| black_box(NamedQueryPlan::process(black_box(sql))));
        });
    }

    group.bench_function("no_parameters", |b| {
        b.iter(|| black_box(NamedQueryPlan::process(black_box("SELECT id::text FROM films"))));
    });

    group.finish();
}

/// Benchmark draining a row stream into a cached result.
fn bench_materialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("result/materialize");

    for rows in [100, 1_000, 10_000].iter() {
        let data = generate_film_rows(*rows);
        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &data, |b, data| {
            b.iter(|| {
                let mut stream = BufferedRows::new(film_columns(), data.clone());
                black_box(CachedScrollableResult::from_stream(&mut stream, 64))
            });
        });
    }

    group.finish();
}

/// Benchmark cursor navigation and typed reads.
fn bench_navigate(c: &mut Criterion) {
    let mut group = c.benchmark_group("result/navigate");

    let mut result = CachedScrollableResult::from_rows(film_columns(), generate_film_rows(1_000))
        .expect("Failed to build result");

    group.bench_function("forward_by_index", |b| {
        b.iter(|| {
            result.before_first();
            let mut sum = 0i64;
            while result.next() {
                sum += i64::from(result.get::<i32>(1).ok().flatten().unwrap_or_default());
            }
            black_box(sum)
        });
    });

    group.bench_function("forward_by_name", |b| {
        b.iter(|| {
            result.before_first();
            let mut sum = 0i64;
            while result.next() {
                sum += i64::from(result.get_by_name::<i16>("YEAR").ok().flatten().unwrap_or_default());
            }
            black_box(sum)
        });
    });

    group.bench_function("backward", |b| {
        b.iter(|| {
            result.after_last();
            let mut visited = 0;
            while result.previous() {
                visited += 1;
            }
            black_box(visited)
        });
    });

    group.finish();
}

/// Benchmark registry pushes past capacity.
fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry/push");

    for capacity in [16, 256].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), capacity, |b, &capacity| {
            b.iter(|| {
                let mut queue = BoundedQueue::new(capacity);
                let mut evicted = 0;
                for i in 0..1_000 {
                    if queue.push(i).is_some() {
                        evicted += 1;
                    }
                }
                black_box(evicted)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_process,
    bench_materialize,
    bench_navigate,
    bench_registry,
);
criterion_main!(benches);
