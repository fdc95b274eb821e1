use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use dhash_table::{DHashTable, EntryHandle, EnumFlags, MapOps, STUB_OPS};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

// Word-aligned address-like keys for the stub ops.
fn addr(n: u64) -> usize {
    (n as usize) << 3
}

fn pick<T: Copy>(items: &[T], count: usize) -> Vec<T> {
    let n = items.len();
    let mut s = 0x9e3779b97f4a7c15u64;
    (0..count)
        .map(|_| {
            s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
            items[(s as usize) % n]
        })
        .collect()
}

fn bench_add_fresh_100k(c: &mut Criterion) {
    let ops: MapOps<String, u64> = MapOps::new();
    c.bench_function("dhash::add_fresh_100k", |b| {
        b.iter_batched(
            || DHashTable::new(&ops, ()).unwrap(),
            |mut t| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    t.add_entry(&key(x)).unwrap().value = i as u64;
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("dhash::add_presized_100k", |b| {
        b.iter_batched(
            || DHashTable::with_capacity(&ops, (), 100_000).unwrap(),
            |mut t| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    t.add_entry(&key(x)).unwrap().value = i as u64;
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_stub_add_100k(c: &mut Criterion) {
    c.bench_function("dhash::stub_add_100k", |b| {
        b.iter_batched(
            || DHashTable::new(&STUB_OPS, ()).unwrap(),
            |mut t| {
                for x in lcg(2).take(100_000) {
                    t.add(&addr(x)).unwrap();
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_remove_random_10k(c: &mut Criterion) {
    let ops: MapOps<String, u64> = MapOps::new();
    c.bench_function("dhash::remove_random_10k_of_110k", |b| {
        b.iter_batched(
            || {
                let mut t = DHashTable::new(&ops, ()).unwrap();
                let keys: Vec<u64> = lcg(5).take(110_000).collect();
                for &x in &keys {
                    t.add(&key(x)).unwrap();
                }
                let to_remove: Vec<String> = pick(&keys, 10_000).into_iter().map(key).collect();
                (t, to_remove)
            },
            |(mut t, to_remove)| {
                for k in &to_remove {
                    t.remove(k);
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_lookup_hit_10k(c: &mut Criterion) {
    let ops: MapOps<String, u64> = MapOps::new();
    c.bench_function("dhash::lookup_hit_10k_on_100k", |b| {
        let mut t = DHashTable::new(&ops, ()).unwrap();
        let keys: Vec<u64> = lcg(7).take(100_000).collect();
        for &x in &keys {
            t.add(&key(x)).unwrap();
        }
        let queries: Vec<String> = pick(&keys, 10_000).into_iter().map(key).collect();
        b.iter(|| {
            for k in &queries {
                black_box(t.lookup(k));
            }
        })
    });
}

fn bench_lookup_miss_10k(c: &mut Criterion) {
    let ops: MapOps<String, u64> = MapOps::new();
    c.bench_function("dhash::lookup_miss_10k_on_100k", |b| {
        let mut t = DHashTable::new(&ops, ()).unwrap();
        for x in lcg(11).take(100_000) {
            t.add(&key(x)).unwrap();
        }
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            for _ in 0..10_000 {
                let k = key(miss.next().unwrap());
                black_box(t.lookup(&k));
            }
        })
    });
}

fn bench_handle_access_increment(c: &mut Criterion) {
    let ops: MapOps<String, u64> = MapOps::new();
    c.bench_function("dhash::handle_access_increment_10k", |b| {
        b.iter_batched(
            || {
                let mut t = DHashTable::new(&ops, ()).unwrap();
                for x in lcg(123).take(100_000) {
                    t.add(&key(x)).unwrap();
                }
                // Handles from `add` go stale at each resize; take fresh ones.
                let handles: Vec<EntryHandle> = t.iter().map(|(h, _)| h).collect();
                let targets = pick(&handles, 10_000);
                (t, targets)
            },
            |(mut t, targets)| {
                for h in targets {
                    if let Some(e) = t.get_mut(h) {
                        e.value = e.value.wrapping_add(1);
                    }
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_enumerate(c: &mut Criterion) {
    let ops: MapOps<String, u64> = MapOps::new();
    c.bench_function("dhash::iter_all_100k", |b| {
        let mut t = DHashTable::new(&ops, ()).unwrap();
        for (i, x) in lcg(999).take(100_000).enumerate() {
            t.add_entry(&key(x)).unwrap().value = i as u64;
        }
        b.iter(|| {
            let mut sum = 0u64;
            for (_h, e) in t.iter() {
                sum = sum.wrapping_add(e.value);
            }
            black_box(sum)
        })
    });

    c.bench_function("dhash::enumerate_remove_half_100k", |b| {
        b.iter_batched(
            || {
                let mut t = DHashTable::new(&ops, ()).unwrap();
                for (i, x) in lcg(1001).take(100_000).enumerate() {
                    t.add_entry(&key(x)).unwrap().value = i as u64;
                }
                t
            },
            |mut t| {
                t.enumerate(|v| if v.entry().value % 2 == 0 { EnumFlags::REMOVE } else { EnumFlags::NEXT });
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches_add;
    config = bench_config();
    targets = bench_add_fresh_100k, bench_stub_add_100k
}
criterion_group! {
    name = benches_ops;
    config = bench_config();
    targets = bench_remove_random_10k,
              bench_lookup_hit_10k,
              bench_lookup_miss_10k,
              bench_handle_access_increment,
              bench_enumerate
}
criterion_main!(benches_add, benches_ops);
