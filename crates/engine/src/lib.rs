//! # Engine - SiltKV Storage Engine
//!
//! The central orchestrator that ties together the [`memtable`], [`wal`], and
//! [`sstable`] crates into a complete LSM-tree key-value store.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                   ENGINE                      │
//! │                                               │
//! │ write.rs → WAL append → Memtable insert       │
//! │              |                                │
//! │              |  (len > flush_threshold?)      │
//! │              |            yes                 │
//! │              v                                │
//! │     TableSet::flush() → new segment           │
//! │              |                                │
//! │              |  (flushes > trigger?)          │
//! │              |            yes                 │
//! │              v                                │
//! │     Compactor → merged segments               │
//! │                                               │
//! │ read.rs → Memtable → segments newest→oldest   │
//! │            (first entry wins)                 │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module         | Purpose                                                 |
//! |----------------|---------------------------------------------------------|
//! | `lib.rs`       | `Engine` struct, constructors, accessors, `Debug`       |
//! | [`recovery`]   | stale file cleanup, WAL replay                          |
//! | `write`        | `put()`, `delete()`, `force_flush()`, internal flush    |
//! | `read`         | `get()`                                                 |
//! | [`tables`]     | ordered segment list, flush, lookup, compaction trigger |
//! | [`compaction`] | `Compactor` trait, row-count policy, two-way merge      |
//!
//! ## Crash Safety
//!
//! Every write is appended to the WAL **before** the memtable update. The WAL
//! is only truncated **after** the memtable has been written as a segment.
//! Segment files are written atomically and the index goes last, so a
//! segment is either fully discoverable on restart or not at all.
//!
//! ## Concurrency
//!
//! Mutations take `&mut self`, reads take `&self`. The flush sequence
//! (freeze memtable, write segment, install it, clear WAL) therefore runs
//! under an exclusive borrow: no reader can see the data in neither place.
//! Wrap the engine in a `RwLock` to share it across threads.
//!
//! ## Limits
//!
//! WAL replay and compaction merges read whole files into memory, and every
//! segment index is held in memory. Size the memtable threshold and the
//! compaction size limit with that in mind.
pub mod compaction;
mod read;
pub mod recovery;
pub mod tables;
mod write;

use anyhow::Result;
use codec::Codec;
use config::{ConfigError, EngineConfig};
use memtable::Memtable;
use sstable::FilterParams;
use std::sync::Arc;
use storage::{LocalStorage, Storage};
use thiserror::Error;
use wal::Wal;

pub use compaction::{merge_records, Compactor, RowCountCompactor, SegmentMerger};
pub use tables::TableSet;

/// Errors raised by the engine itself.
///
/// Returned inside `anyhow::Error`; recover them with
/// `err.downcast_ref::<EngineError>()`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Rejected before any I/O; nothing was changed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// An embedded LSM key-value store over keys `K` and values `V`.
///
/// # Write Path
///
/// 1. Validate and encode the record.
/// 2. Append it to the WAL.
/// 3. Apply it to the memtable.
/// 4. If the memtable holds more than `flush_threshold` entries, flush it to
///    a new segment and clear the WAL.
///
/// # Read Path
///
/// 1. Check the memtable (freshest data, includes tombstones).
/// 2. Check segments from newest to oldest.
/// 3. First entry wins; tombstones shadow older values.
///
/// # Recovery
///
/// On construction stale temporary and orphaned segment files are removed,
/// the WAL is replayed into the memtable if it holds any records, and the
/// segments on disk are loaded in recency order.
pub struct Engine<K: Ord, V> {
    pub(crate) config: EngineConfig,
    pub(crate) mem: Memtable<K, V>,
    pub(crate) wal: Wal,
    pub(crate) tables: TableSet<K, V>,
}

impl<K, V> std::fmt::Debug for Engine<K, V>
where
    K: Ord,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("data_dir", &self.config.data_dir)
            .field("flush_threshold", &self.config.flush_threshold)
            .field("wal_sync", &self.wal.policy())
            .field("memtable_entries", &self.mem.len())
            .field("wal_records", &self.wal.size())
            .field("segment_count", &self.tables.len())
            .finish()
    }
}

impl<K, V> Engine<K, V>
where
    K: Codec + Ord + Clone,
    V: Codec + Clone,
{
    /// Opens an engine on the local directory `config.data_dir`, creating it
    /// if needed, and recovers any existing state.
    pub fn open(config: EngineConfig) -> Result<Self> {
        config.validate().map_err(EngineError::from)?;
        let storage = LocalStorage::open(&config.data_dir)?;
        tracing::info!("opening engine in {}", storage.root().display());
        Self::with_storage(config, Arc::new(storage))
    }

    /// Opens an engine on an arbitrary storage backend.
    ///
    /// # Recovery Steps
    ///
    /// 1. Validate the configuration.
    /// 2. Remove leftover `.tmp` files and segment files without an index.
    /// 3. Replay the WAL into a fresh memtable if it holds records.
    /// 4. Load every segment, oldest first.
    pub fn with_storage(config: EngineConfig, storage: Arc<dyn Storage>) -> Result<Self> {
        config.validate().map_err(EngineError::from)?;

        let removed = recovery::cleanup_stale_files(storage.as_ref())?;
        if removed > 0 {
            tracing::info!("removed {} stale files", removed);
        }

        let wal = Wal::open(storage.clone(), config.wal_sync)?;
        let mem = recovery::replay_wal(&wal)?;

        let filter = FilterParams {
            expected_elements: config.filter_expected_elements,
            false_positive_rate: config.filter_false_positive_rate,
        };
        let tables = TableSet::load(
            storage,
            filter,
            config.compaction_trigger,
            Box::new(RowCountCompactor::new(config.compaction_size_limit)),
        )?;

        tracing::info!(
            "engine opened: {} memtable entries, {} segments",
            mem.len(),
            tables.len()
        );

        Ok(Self {
            config,
            mem,
            wal,
            tables,
        })
    }

    /// Merges segments now according to the compaction policy.
    pub fn compact(&mut self) -> Result<()> {
        self.tables.compact()
    }
}

impl<K: Ord, V> Engine<K, V> {
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Entries in the memtable, tombstones included.
    #[must_use]
    pub fn memtable_len(&self) -> usize {
        self.mem.len()
    }

    /// Live segments on disk.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.tables.len()
    }

    /// Records in the write-ahead log.
    #[must_use]
    pub fn wal_len(&self) -> usize {
        self.wal.size()
    }

    #[must_use]
    pub fn tables(&self) -> &TableSet<K, V> {
        &self.tables
    }
}

#[cfg(test)]
mod tests;
