//! Compaction: merges runs of small segments into larger ones.
//!
//! A [`Compactor`] is a policy over the ordered (oldest first) segment list.
//! It builds new segments through a [`SegmentMerger`], which performs the
//! two-way merge, writes the result and deletes the consumed inputs.

use anyhow::Result;
use codec::{Codec, Record};
use sstable::{FilterParams, Segment, SegmentId};
use std::cmp::Ordering;
use std::sync::Arc;
use storage::Storage;

/// A compaction policy.
///
/// Receives every live segment, oldest first, and returns the replacement
/// list, also oldest first. Segments may only be merged with their
/// neighbours, and each merge must pass the older segment first.
pub trait Compactor<K, V>: Send + Sync {
    fn compact(
        &self,
        segments: Vec<Segment<K, V>>,
        merger: &SegmentMerger,
    ) -> Result<Vec<Segment<K, V>>>;
}

/// Size-tiered policy bounded by row count.
///
/// Walks the list oldest to newest. A segment with more than `size_limit`
/// rows is kept as-is. Otherwise it absorbs the following segments one by
/// one for as long as the merged result still has at most `size_limit` rows
/// before the next merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCountCompactor {
    size_limit: usize,
}

impl RowCountCompactor {
    pub fn new(size_limit: usize) -> Self {
        Self { size_limit }
    }

    #[must_use]
    pub fn size_limit(&self) -> usize {
        self.size_limit
    }
}

impl<K, V> Compactor<K, V> for RowCountCompactor
where
    K: Codec + Ord,
    V: Codec,
{
    fn compact(
        &self,
        segments: Vec<Segment<K, V>>,
        merger: &SegmentMerger,
    ) -> Result<Vec<Segment<K, V>>> {
        let mut input = segments.into_iter();
        let mut output = Vec::new();

        while let Some(segment) = input.next() {
            if segment.row_count() > self.size_limit {
                output.push(segment);
                continue;
            }

            let mut merged = segment;
            while merged.row_count() <= self.size_limit {
                let Some(newer) = input.next() else {
                    break;
                };
                merged = merger.merge(merged, newer)?;
            }
            output.push(merged);
        }

        Ok(output)
    }
}

/// Creates merged segments in a given storage backend.
#[derive(Debug, Clone)]
pub struct SegmentMerger {
    storage: Arc<dyn Storage>,
    filter: FilterParams,
}

impl SegmentMerger {
    pub fn new(storage: Arc<dyn Storage>, filter: FilterParams) -> Self {
        Self { storage, filter }
    }

    /// Merges `older` with `newer` into a new segment, then deletes both
    /// inputs.
    ///
    /// The result inherits the newer input's sequence number, so it keeps
    /// that input's place in recency order. The inputs are deleted only once
    /// the result is fully written.
    pub fn merge<K, V>(&self, older: Segment<K, V>, newer: Segment<K, V>) -> Result<Segment<K, V>>
    where
        K: Codec + Ord,
        V: Codec,
    {
        let rows = merge_records(older.get_all_lines()?, newer.get_all_lines()?);

        let seq = older.id().seq().max(newer.id().seq());
        let mut merged = Segment::open(self.storage.clone(), SegmentId::new(seq), self.filter)?;
        merged.write(rows.into_iter().map(|r| (r.key, r.value)))?;

        tracing::debug!(
            "merged {} ({} rows) + {} ({} rows) -> {} ({} rows)",
            older.id(),
            older.row_count(),
            newer.id(),
            newer.row_count(),
            merged.id(),
            merged.row_count()
        );

        older.delete_files()?;
        newer.delete_files()?;
        Ok(merged)
    }
}

/// Sorted union of two key-ordered record lists in a single linear pass.
///
/// On equal keys the record from `newer` wins, tombstones included.
pub fn merge_records<K: Ord, V>(
    older: Vec<Record<K, V>>,
    newer: Vec<Record<K, V>>,
) -> Vec<Record<K, V>> {
    let mut out = Vec::with_capacity(older.len() + newer.len());
    let mut old_it = older.into_iter().peekable();
    let mut new_it = newer.into_iter().peekable();

    loop {
        let next = match (old_it.peek(), new_it.peek()) {
            (Some(o), Some(n)) => match o.key.cmp(&n.key) {
                Ordering::Less => old_it.next(),
                Ordering::Greater => new_it.next(),
                Ordering::Equal => {
                    old_it.next();
                    new_it.next()
                }
            },
            (Some(_), None) => old_it.next(),
            (None, Some(_)) => new_it.next(),
            (None, None) => break,
        };
        out.extend(next);
    }

    out
}
