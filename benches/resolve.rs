//! Benchmark: tick resolution over chain and fan-out derivation sets.
//!
//! Compares:
//! - a linear chain where each deriver pulls the previous one
//! - a wide fan-out where every deriver reads the same input
//! - a memoized repeat tick where every tracked deriver reuses

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use derive_flow::{DerivationSet, DeriveRuntime, Deriver, Snapshot};

/// Chain of `depth` derivers, d0..d{depth-1}, each adding 1 to its
/// predecessor; d0 reads the "seed" input.
fn chain_set(depth: usize) -> DerivationSet<String, i64> {
    let mut set = DerivationSet::new();
    set.add(Deriver::new("d0".to_string(), |ctx| {
        Ok(ctx.input(&"seed".to_string()).copied().unwrap_or(0) + 1)
    }));
    for i in 1..depth {
        let previous = format!("d{}", i - 1);
        set.add(Deriver::new(format!("d{i}"), move |ctx| {
            Ok(ctx.derived(&previous)? + 1)
        }));
    }
    set
}

/// `width` independent derivers, all tracked on the same input.
fn fan_out_set(width: usize) -> DerivationSet<String, i64> {
    let mut set = DerivationSet::new();
    for i in 0..width {
        set.add(
            Deriver::new(format!("d{i}"), move |ctx| {
                Ok(ctx.input(&"seed".to_string()).copied().unwrap_or(0) + i as i64)
            })
            .tracked(["seed".to_string()]),
        );
    }
    set
}

fn benchmark_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    let runtime = DeriveRuntime::new();
    let empty: Snapshot<String, i64> = Snapshot::new();

    for depth in [4, 16, 64] {
        let set = chain_set(depth);
        let inputs = Snapshot::from_iter([("seed".to_string(), 1)]);
        group.bench_with_input(BenchmarkId::new("chain", depth), &depth, |b, _| {
            b.iter(|| {
                runtime
                    .resolve(black_box(&set), &empty, black_box(&inputs), &empty)
                    .unwrap()
            });
        });
    }

    for width in [4, 16, 64] {
        let set = fan_out_set(width);
        let inputs = Snapshot::from_iter([("seed".to_string(), 1)]);
        group.bench_with_input(BenchmarkId::new("fan_out", width), &width, |b, _| {
            b.iter(|| {
                runtime
                    .resolve(black_box(&set), &empty, black_box(&inputs), &empty)
                    .unwrap()
            });
        });

        // Repeat the same tick: every deriver reuses its previous value.
        let outputs = runtime.resolve(&set, &empty, &inputs, &empty).unwrap();
        group.bench_with_input(BenchmarkId::new("fan_out_memoized", width), &width, |b, _| {
            b.iter(|| {
                runtime
                    .resolve(
                        black_box(&set),
                        black_box(&inputs),
                        black_box(&inputs),
                        black_box(&outputs),
                    )
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_resolve);
criterion_main!(benches);
