use config::{EngineConfig, WalSyncPolicy};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use engine::Engine;
use std::path::Path;
use std::sync::Arc;
use storage::MemoryStorage;
use tempfile::tempdir;

const N_KEYS: usize = 10_000;
const VALUE_SIZE: usize = 100;

fn bench_config(dir: &Path) -> EngineConfig {
    EngineConfig::builder()
        .data_dir(dir)
        .flush_threshold(1024)
        .compaction_trigger(4)
        .compaction_size_limit(4096)
        .wal_sync(WalSyncPolicy::EveryN { count: 64 })
        .build()
}

fn value() -> String {
    "x".repeat(VALUE_SIZE)
}

fn populated_engine() -> Engine<String, String> {
    let storage = Arc::new(MemoryStorage::new());
    let mut engine = Engine::with_storage(bench_config(Path::new("bench")), storage).unwrap();
    for i in 0..N_KEYS {
        engine.put(format!("key{}", i), value()).unwrap();
    }
    engine
}

fn engine_put_disk_benchmark(c: &mut Criterion) {
    c.bench_function("engine_put_disk_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let engine: Engine<String, String> =
                    Engine::open(bench_config(dir.path())).unwrap();
                (dir, engine)
            },
            |(_dir, mut engine)| {
                for i in 0..N_KEYS {
                    engine.put(format!("key{}", i), value()).unwrap();
                }
            },
            BatchSize::LargeInput,
        );
    });
}

fn engine_put_memory_benchmark(c: &mut Criterion) {
    c.bench_function("engine_put_memory_10k", |b| {
        b.iter_batched(
            || {
                let storage = Arc::new(MemoryStorage::new());
                Engine::<String, String>::with_storage(bench_config(Path::new("bench")), storage)
                    .unwrap()
            },
            |mut engine| {
                for i in 0..N_KEYS {
                    engine.put(format!("key{}", i), value()).unwrap();
                }
            },
            BatchSize::LargeInput,
        );
    });
}

fn engine_get_hit_benchmark(c: &mut Criterion) {
    let engine = populated_engine();
    c.bench_function("engine_get_hit_10k", |b| {
        b.iter(|| {
            for i in 0..N_KEYS {
                let v = engine.get(&format!("key{}", i)).unwrap();
                assert!(v.is_some());
            }
        });
    });
}

fn engine_get_miss_benchmark(c: &mut Criterion) {
    let engine = populated_engine();
    c.bench_function("engine_get_miss_10k", |b| {
        b.iter(|| {
            for i in 0..N_KEYS {
                let v = engine.get(&format!("missing{}", i)).unwrap();
                assert!(v.is_none());
            }
        });
    });
}

criterion_group!(
    benches,
    engine_put_disk_benchmark,
    engine_put_memory_benchmark,
    engine_get_hit_benchmark,
    engine_get_miss_benchmark
);
criterion_main!(benches);
