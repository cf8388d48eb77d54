//! Bulk Pipeline Benchmarks
//!
//! Encoding, response correlation and retry extraction for typical batch
//! sizes.
//!
//! Run with: cargo bench --bench bulk_benchmarks

use bulkwire::testing::bulk_response_body;
use bulkwire::{BulkAction, IgnorePolicy, StatusPolicy, WriteOperation, decode, encode};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::json;
use std::hint::black_box;

const SIZES: [usize; 3] = [10, 100, 1000];

fn operations(n: usize) -> Vec<WriteOperation> {
    (0..n)
        .map(|i| {
            let id = i.to_string();
            WriteOperation::index(
                "events",
                Some(id.as_str()),
                &json!({ "seq": i, "host": "web-01", "message": "GET /index.html 200" }),
            )
            .unwrap()
        })
        .collect()
}

fn response(n: usize) -> Vec<u8> {
    let items: Vec<_> = (0..n)
        .map(|i| {
            let status = match i % 10 {
                0 => 429,
                1 => 404,
                _ => 201,
            };
            (BulkAction::Index, Some(i.to_string()), status)
        })
        .collect();
    bulk_response_body(&items)
}

// ============================================================================
// Encoding
// ============================================================================

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for size in SIZES {
        let ops = operations(size);
        let bytes: usize = ops.iter().map(WriteOperation::len).sum();
        group.throughput(Throughput::Bytes(bytes as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &ops, |b, ops| {
            b.iter(|| black_box(encode(black_box(ops))))
        });
    }

    group.finish();
}

// ============================================================================
// Response Handling
// ============================================================================

fn bench_decode_and_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_classify");
    let policy = StatusPolicy::new(IgnorePolicy::new([404]), [429]);

    for size in SIZES {
        let (buffer, _) = encode(&operations(size));
        let body = response(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &body, |b, body| {
            b.iter(|| {
                let outcomes = decode(black_box(body), buffer.spans()).unwrap();
                black_box(policy.partition(outcomes))
            })
        });
    }

    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");

    for size in SIZES {
        let (buffer, _) = encode(&operations(size));
        let ordinals: Vec<usize> = (0..size).step_by(10).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &ordinals, |b, ordinals| {
            b.iter(|| black_box(buffer.extract(ordinals.iter().copied()).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode_and_classify, bench_extract);
criterion_main!(benches);
