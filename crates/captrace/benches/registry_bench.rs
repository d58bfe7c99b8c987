//! Registry hot-path benchmarks.
//!
//! Measures per-call cost of insert/remove cycles and of enumeration at a
//! fixed population, the two operations debug builds pay for on every
//! tracked allocation.

use std::time::Duration;

use captrace::{AllocMethod, AllocRecord, AllocRegistry, CallSite, TracerConfig, UNKNOWN_LABEL};
use captrace_heap::Caps;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn record(addr: usize, size: usize) -> AllocRecord {
    AllocRecord {
        address: addr,
        size,
        caps: Caps::CAP_8BIT,
        method: AllocMethod::Alloc,
        site: CallSite {
            file: "registry_bench.rs",
            line: 1,
            function: "bench",
        },
        label: UNKNOWN_LABEL,
    }
}

fn bench_insert_remove(c: &mut Criterion) {
    let reg = AllocRegistry::new(
        &TracerConfig::default()
            .with_max_entries(1 << 20)
            .with_stall_pause(Duration::ZERO),
    );
    c.bench_function("registry_insert_remove", |b| {
        b.iter(|| {
            let addr = black_box(0x1000_usize);
            reg.insert(record(addr, 64));
            reg.remove(addr);
        });
    });
}

fn bench_remove_from_population(c: &mut Criterion) {
    let reg = AllocRegistry::new(
        &TracerConfig::default()
            .with_max_entries(1 << 20)
            .with_stall_pause(Duration::ZERO),
    );
    for i in 0..1024_usize {
        reg.insert(record(0x1000 + i * 16, 64));
    }
    // Re-insert what each iteration removes so the population is steady.
    c.bench_function("registry_remove_reinsert_1k", |b| {
        b.iter(|| {
            let addr = black_box(0x1000 + 512 * 16);
            reg.remove(addr);
            reg.insert(record(addr, 64));
        });
    });
}

fn bench_snapshot(c: &mut Criterion) {
    let reg = AllocRegistry::new(
        &TracerConfig::default()
            .with_max_entries(1 << 20)
            .with_stall_pause(Duration::ZERO),
    );
    for i in 0..1024_usize {
        reg.insert(record(0x1000 + i * 16, 64));
    }
    c.bench_function("registry_snapshot_1k", |b| {
        b.iter(|| black_box(reg.snapshot()));
    });
}

criterion_group!(
    benches,
    bench_insert_remove,
    bench_remove_from_population,
    bench_snapshot
);
criterion_main!(benches);
