//! Criterion benchmarks for the OSC codec and ring rendering.
//!
//! The hot path on an arc is one inbound `enc/delta` followed by one outbound
//! `ring/map` of 64 levels, so those dominate the fixtures below.
//!
//! Run with:
//! ```bash
//! cargo bench --package monome-core --bench osc_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use monome_core::{
    decode_packet, encode_bundle, encode_message, int_value, message, DeviceCommand, DeviceNotice,
    OscMessage, OscType, Ring, RingLevels, RingMode,
};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn make_enc_delta() -> OscMessage {
    message("/monome/enc/delta", vec![OscType::Int(0), OscType::Int(-2)])
}

fn make_ring_map() -> OscMessage {
    let levels: Vec<u8> = (0..64).map(|i| (i % 16) as u8).collect();
    DeviceCommand::RingMap { ring: 0, levels }.to_osc("monome")
}

// ── Benchmark groups ──────────────────────────────────────────────────────────

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    let map = make_ring_map();
    group.bench_function("ring_map", |b| b.iter(|| encode_message(black_box(&map)).unwrap()));

    let quads: Vec<OscMessage> = (0..4)
        .map(|ring| DeviceCommand::RingAll { ring, level: 0 }.to_osc("monome"))
        .collect();
    group.bench_function("bundle_4", |b| b.iter(|| encode_bundle(black_box(&quads)).unwrap()));

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    let delta = encode_message(&make_enc_delta()).unwrap();
    group.bench_function("enc_delta", |b| {
        b.iter(|| {
            let msgs = decode_packet(black_box(&delta)).unwrap();
            DeviceNotice::from_osc(&msgs[0], "monome").unwrap()
        })
    });

    let map = encode_message(&make_ring_map()).unwrap();
    group.bench_function("ring_map", |b| b.iter(|| decode_packet(black_box(&map)).unwrap()));

    group.finish();
}

/// One encoder tick end to end: decode, move the ring, render, encode.
fn bench_tick_hot_path(c: &mut Criterion) {
    let delta = encode_message(&make_enc_delta()).unwrap();
    let mut ring = Ring::new(0, RingMode::Bipolar);
    c.bench_function("tick_hot_path", |b| {
        b.iter(|| {
            let msgs = decode_packet(black_box(&delta)).unwrap();
            let delta = int_value(&msgs[0].args[1]).unwrap_or(0);
            ring.apply_delta(i64::from(delta), 64);
            let levels = ring.render(64, RingLevels::default());
            encode_message(&DeviceCommand::RingMap { ring: 0, levels }.to_osc("monome")).unwrap()
        })
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_tick_hot_path);
criterion_main!(benches);
