//! Benchmarks for the Golay (23,12,3) codec's encode/decode throughput.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tdm_modem::golay::{decode, encode};

fn generate_test_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("golay_encode");

    for size in [3usize, 30, 96, 255] {
        let data = generate_test_data(size - size % 3);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| encode(black_box(data)).unwrap())
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("golay_decode");

    for size in [3usize, 30, 96, 255] {
        let data = generate_test_data(size - size % 3);
        let encoded = encode(&data).unwrap();
        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, encoded| {
            b.iter(|| decode(black_box(encoded)).unwrap())
        });
    }
    group.finish();
}

fn bench_decode_with_errors(c: &mut Criterion) {
    let mut group = c.benchmark_group("golay_decode_with_correction");

    let data = generate_test_data(96);
    let mut encoded = encode(&data).unwrap();
    for (i, byte) in encoded.iter_mut().enumerate() {
        if i % 6 == 0 {
            *byte ^= 0x01;
        }
    }

    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("with_single_bit_errors", |b| {
        b.iter(|| decode(black_box(&encoded)).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_decode_with_errors);
criterion_main!(benches);
