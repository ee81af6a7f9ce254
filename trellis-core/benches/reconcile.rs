//! Benchmarks for keyed list reconciliation.
//!
//! Run with: cargo bench -p trellis-core --bench reconcile

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use trellis_core::Runtime;

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("list/reconcile");

    for len in [10usize, 100, 1_000] {
        group.throughput(Throughput::Elements(len as u64));

        let forward: Vec<usize> = (0..len).collect();
        let reversed: Vec<usize> = forward.iter().rev().copied().collect();
        let mut rotated = forward.clone();
        rotated.rotate_left(1);
        let mut shrunk = forward.clone();
        shrunk.retain(|n| n % 3 != 0);

        for (name, next) in [("reverse", reversed), ("rotate", rotated), ("remove_third", shrunk)] {
            let rt = Runtime::new();
            let doc = rt.document();
            let ul = doc.create_element("ul");
            let (items, set_items) = rt.signal(forward.clone());

            let runtime = rt.clone();
            let _list = rt.list(
                ul,
                items,
                |n: &usize| *n,
                move |n: &usize, _| runtime.el("li").child(n.to_string()).build(),
            );

            let mut flip = false;
            group.bench_with_input(BenchmarkId::new(name, len), &(), |b, _| {
                b.iter(|| {
                    flip = !flip;
                    set_items.set(if flip { next.clone() } else { forward.clone() });
                    black_box(doc.len())
                })
            });
        }
    }

    group.finish();
}

fn bench_signal_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal/fanout");

    for effects in [1usize, 10, 100] {
        let rt = Runtime::new();
        let (count, set_count) = rt.signal(0u64);
        for _ in 0..effects {
            let count = count.clone();
            rt.effect(move || {
                black_box(count.get());
            });
        }

        let mut next = 0u64;
        group.bench_with_input(BenchmarkId::new("set", effects), &(), |b, _| {
            b.iter(|| {
                next += 1;
                set_count.set(next);
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reconcile, bench_signal_fanout);
criterion_main!(benches);
