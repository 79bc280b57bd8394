use anyhow::Result;
use config::{EngineConfig, WalSyncPolicy};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use storage::{MemoryStorage, Storage};

use crate::Engine;

pub type StrEngine = Engine<String, String>;

pub fn s(v: &str) -> String {
    v.to_string()
}

/// Config that never flushes or compacts on its own.
pub fn manual_config(dir: &Path) -> EngineConfig {
    EngineConfig::builder()
        .data_dir(dir)
        .flush_threshold(1024)
        .compaction_trigger(1000)
        .compaction_size_limit(4096)
        .wal_sync(WalSyncPolicy::EveryWrite)
        .build()
}

pub fn memory_engine() -> Result<(Arc<MemoryStorage>, StrEngine)> {
    let storage = Arc::new(MemoryStorage::new());
    let engine = Engine::with_storage(manual_config(Path::new("unused")), storage.clone())?;
    Ok((storage, engine))
}

pub fn rows(pairs: &[(&str, Option<&str>)]) -> BTreeMap<String, Option<String>> {
    pairs
        .iter()
        .map(|(k, v)| (s(k), v.map(s)))
        .collect()
}

pub fn count_with_suffix(storage: &dyn Storage, suffix: &str) -> Result<usize> {
    Ok(storage
        .list()?
        .iter()
        .filter(|f| f.ends_with(suffix))
        .count())
}

/// Memory storage whose whole-file writes can be made to fail on demand.
#[derive(Debug, Default)]
pub struct FlakyStorage {
    inner: MemoryStorage,
    fail_writes: AtomicBool,
}

impl FlakyStorage {
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl Storage for FlakyStorage {
    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        self.inner.read(name)
    }
    fn read_line_at(&self, name: &str, offset: u64) -> io::Result<Option<String>> {
        self.inner.read_line_at(name, offset)
    }
    fn write(&self, name: &str, data: &[u8]) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::other("injected write failure"));
        }
        self.inner.write(name, data)
    }
    fn append(&self, name: &str, data: &[u8]) -> io::Result<()> {
        self.inner.append(name, data)
    }
    fn sync(&self, name: &str) -> io::Result<()> {
        self.inner.sync(name)
    }
    fn exists(&self, name: &str) -> bool {
        self.inner.exists(name)
    }
    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        self.inner.rename(from, to)
    }
    fn delete(&self, name: &str) -> io::Result<()> {
        self.inner.delete(name)
    }
    fn list(&self) -> io::Result<Vec<String>> {
        self.inner.list()
    }
}
