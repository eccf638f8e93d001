//! Performance benchmarks for the card block codec.
//!
//! Encoding and decoding run once per card in every batch, and the mock
//! reader runs them on every simulated write and read.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench codec_bench
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use kanban_core::ThreadPair;
use kanban_hardware::codec::{
    apdu, check_status, decode_block, decode_pair, encode_block, encode_pair,
};
use std::hint::black_box;

/// Benchmark encoding single thread codes of different lengths.
fn bench_encode_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_block");
    group.throughput(Throughput::Elements(1));

    for code in ["T", "TH-001", "TH-RED-100", "1234567890123456"] {
        group.bench_with_input(BenchmarkId::from_parameter(code.len()), code, |b, code| {
            b.iter(|| black_box(encode_block(black_box(code)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark decoding a zero-padded block.
fn bench_decode_block(c: &mut Criterion) {
    let block = encode_block("TH-RED-100").unwrap();

    c.bench_function("decode_block", |b| {
        b.iter(|| black_box(decode_block(black_box(&block))));
    });
}

/// Benchmark a full card write and read-back of both blocks.
fn bench_pair_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("pair_roundtrip");

    for batch_size in [1usize, 10, 100] {
        group.throughput(Throughput::Elements(batch_size as u64));

        let pairs: Vec<ThreadPair> = (0..batch_size)
            .map(|i| ThreadPair::new(format!("TH-{:03}", i), format!("TH-RED-{}", i)))
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &pairs,
            |b, pairs| {
                b.iter(|| {
                    for pair in pairs {
                        let [(_, thread1), (_, thread2)] = encode_pair(black_box(pair)).unwrap();
                        black_box(decode_pair(&thread1, &thread2));
                    }
                });
            },
        );
    }

    group.finish();
}

/// Benchmark building the write command sequence and checking its response.
fn bench_write_commands(c: &mut Criterion) {
    let block = encode_block("TH-001").unwrap();
    let response = [0x90, 0x00];

    c.bench_function("write_commands", |b| {
        b.iter(|| {
            black_box(apdu::load_key(&[0xFF; 6]));
            black_box(apdu::authenticate(black_box(4)));
            black_box(apdu::update_block(black_box(4), &block));
            black_box(check_status(&response).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_encode_block,
    bench_decode_block,
    bench_pair_roundtrip,
    bench_write_commands
);
criterion_main!(benches);
