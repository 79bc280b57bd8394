//! The ordered set of live segments.

use anyhow::Result;
use codec::Codec;
use sstable::{FilterParams, Segment, SegmentId, INDEX_EXT};
use std::collections::BTreeMap;
use std::sync::Arc;
use storage::Storage;

use crate::compaction::{Compactor, SegmentMerger};

/// Owns every live segment, oldest first, and decides when to compact.
///
/// Recency is carried by each segment's sequence number: flushes allocate a
/// new one, merges inherit the newest input's, and
/// [`read_tables_from_file`](TableSet::read_tables_from_file) sorts by it.
pub struct TableSet<K, V> {
    storage: Arc<dyn Storage>,
    filter: FilterParams,
    /// Oldest first.
    segments: Vec<Segment<K, V>>,
    compactor: Box<dyn Compactor<K, V>>,
    /// Segments flushed since the last compaction.
    since_compaction: usize,
    compaction_trigger: usize,
    next_seq: u64,
}

impl<K, V> TableSet<K, V>
where
    K: Codec + Ord + Clone,
    V: Codec + Clone,
{
    /// An empty set; nothing is read from storage.
    pub fn new(
        storage: Arc<dyn Storage>,
        filter: FilterParams,
        compaction_trigger: usize,
        compactor: Box<dyn Compactor<K, V>>,
    ) -> Self {
        Self {
            storage,
            filter,
            segments: Vec::new(),
            compactor,
            since_compaction: 0,
            compaction_trigger,
            next_seq: 1,
        }
    }

    /// A set populated from the segments already in `storage`.
    pub fn load(
        storage: Arc<dyn Storage>,
        filter: FilterParams,
        compaction_trigger: usize,
        compactor: Box<dyn Compactor<K, V>>,
    ) -> Result<Self> {
        let mut tables = Self::new(storage, filter, compaction_trigger, compactor);
        tables.read_tables_from_file()?;
        Ok(tables)
    }

    /// Replaces the in-memory list with every segment whose index exists in
    /// storage, ordered by `(seq, name)`.
    ///
    /// Index files whose names are not segment ids are skipped with a warning.
    pub fn read_tables_from_file(&mut self) -> Result<()> {
        let mut ids = Vec::new();
        for file in self.storage.list()? {
            if !file.ends_with(INDEX_EXT) {
                continue;
            }
            match SegmentId::from_index_file(&file) {
                Some(id) => ids.push(id),
                None => tracing::warn!("ignoring unrecognised index file {}", file),
            }
        }
        ids.sort();

        let mut segments = Vec::with_capacity(ids.len());
        for id in ids {
            tracing::debug!("loading segment {} (seq {})", id, id.seq());
            segments.push(Segment::open(self.storage.clone(), id, self.filter)?);
        }

        let after_newest = segments.last().map_or(1, |s| s.id().seq() + 1);
        self.next_seq = self.next_seq.max(after_newest);
        self.segments = segments;
        if !self.segments.is_empty() {
            tracing::info!("loaded {} segments", self.segments.len());
        }
        Ok(())
    }

    /// Writes `rows` as a new newest segment, then compacts if more than
    /// `compaction_trigger` segments were flushed since the last compaction.
    pub fn flush(&mut self, rows: &BTreeMap<K, Option<V>>) -> Result<()> {
        let id = SegmentId::new(self.next_seq);
        let mut segment = Segment::open(self.storage.clone(), id, self.filter)?;
        segment.write(rows.iter().map(|(k, v)| (k.clone(), v.clone())))?;
        self.next_seq += 1;

        tracing::info!("flushed {} rows to segment {}", rows.len(), segment.id());
        self.segments.push(segment);
        self.since_compaction += 1;

        if self.since_compaction > self.compaction_trigger {
            self.compact()?;
        }
        Ok(())
    }

    /// Looks `key` up from the newest segment to the oldest. The first
    /// segment holding an entry decides, so a tombstone hides older values.
    pub fn find_value(&self, key: &K) -> Result<Option<V>> {
        for segment in self.segments.iter().rev() {
            if let Some(entry) = segment.get_entry(key)? {
                return Ok(entry);
            }
        }
        Ok(None)
    }

    /// Hands the whole list to the compactor and installs its output.
    ///
    /// If the compactor fails part way, the list is rebuilt from storage so
    /// that it matches whatever survived on disk.
    pub fn compact(&mut self) -> Result<()> {
        self.since_compaction = 0;
        if self.segments.len() < 2 {
            return Ok(());
        }

        let before = self.segments.len();
        let merger = SegmentMerger::new(self.storage.clone(), self.filter);
        let segments = std::mem::take(&mut self.segments);

        match self.compactor.compact(segments, &merger) {
            Ok(compacted) => {
                tracing::info!("compacted {} segments into {}", before, compacted.len());
                self.segments = compacted;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("compaction failed, reloading segments: {:#}", e);
                self.read_tables_from_file()?;
                Err(e)
            }
        }
    }

    /// Segments, oldest first.
    pub fn segments(&self) -> &[Segment<K, V>] {
        &self.segments
    }
}

impl<K, V> TableSet<K, V> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl<K, V> std::fmt::Debug for TableSet<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableSet")
            .field("segments", &self.segments.len())
            .field("since_compaction", &self.since_compaction)
            .field("compaction_trigger", &self.compaction_trigger)
            .field("next_seq", &self.next_seq)
            .finish()
    }
}
