//! CIDR 코덱 및 카운터 합산 벤치마크

use std::hint::black_box;
use std::net::Ipv4Addr;

use criterion::{Criterion, criterion_group, criterion_main};
use xdpwall_ebpf_engine::status::aggregate;
use xdpwall_ebpf_engine::{BlockKey, TargetCounters};

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    group.bench_function("parse_cidr", |b| {
        b.iter(|| BlockKey::parse(black_box("192.168.128.0/17")))
    });

    let key = BlockKey::parse("10.20.30.0/24").unwrap();
    group.bench_function("format_cidr", |b| b.iter(|| black_box(key).to_string()));

    group.bench_function("contains", |b| {
        b.iter(|| black_box(key).contains(black_box(Ipv4Addr::new(10, 20, 30, 40))))
    });

    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let replicas: Vec<TargetCounters> = (0..64u64)
        .map(|i| TargetCounters {
            src_packets: i,
            src_bytes: i * 1500,
            dst_packets: i,
            dst_bytes: i * 64,
        })
        .collect();

    c.bench_function("aggregate_64_cpus", |b| {
        b.iter(|| aggregate(black_box(&replicas)))
    });
}

criterion_group!(benches, bench_parse, bench_aggregate);
criterion_main!(benches);
