use anyhow::{Context, Result};
use bloom::BloomFilter;
use codec::{Codec, Record, LINE_TERMINATOR, SEPARATOR};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use storage::Storage;

use crate::{CorruptionError, SegmentId, SparseIndex};

/// Geometry of each segment's bloom filter.
///
/// A segment's filter is sized for its own row count, with
/// `expected_elements` as the lower bound. The row count is also known on
/// reload (the index length), so the same geometry is rebuilt. The false
/// positive rate must stay the same for the lifetime of a data directory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub expected_elements: usize,
    pub false_positive_rate: f64,
}

impl FilterParams {
    /// Element count a filter over `rows` keys is sized for.
    #[must_use]
    pub fn expected_for(&self, rows: usize) -> usize {
        rows.max(self.expected_elements).max(1)
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            expected_elements: 4096,
            false_positive_rate: 0.01,
        }
    }
}

/// One immutable sorted table: data file, sparse index and bloom filter.
///
/// A segment is opened by id. If its index already exists the segment is
/// considered written, and any further [`write`](Segment::write) is ignored.
pub struct Segment<K, V> {
    id: SegmentId,
    storage: Arc<dyn Storage>,
    index: SparseIndex<K>,
    filter: BloomFilter,
    params: FilterParams,
    _value: PhantomData<fn() -> V>,
}

impl<K, V> Segment<K, V>
where
    K: Codec + Ord,
    V: Codec,
{
    /// Opens (or prepares to create) the segment `id`, loading its index and
    /// filter if they exist.
    pub fn open(storage: Arc<dyn Storage>, id: SegmentId, params: FilterParams) -> Result<Self> {
        let index = SparseIndex::open(storage.clone(), id.index_file())?;

        let filter_file = id.filter_file();
        let blob = storage
            .read_string_if_exists(&filter_file)
            .with_context(|| format!("reading filter {filter_file}"))?
            .unwrap_or_default();
        let filter = BloomFilter::from_base64(
            &blob,
            params.expected_for(index.len()),
            params.false_positive_rate,
        )
        .with_context(|| format!("decoding filter {filter_file}"))?;

        Ok(Self {
            id,
            storage,
            index,
            filter,
            params,
            _value: PhantomData,
        })
    }

    /// Writes `rows` as this segment's content.
    ///
    /// Rows are sorted by key if they are not already; for duplicate keys the
    /// last row wins. Every row is encoded before anything touches storage,
    /// then the data file, the filter and the index are each written
    /// atomically, in that order.
    ///
    /// Returns `Ok(false)` without writing if the segment already exists.
    pub fn write<I>(&mut self, rows: I) -> Result<bool>
    where
        I: IntoIterator<Item = (K, Option<V>)>,
    {
        if self.index.exists() {
            tracing::warn!("segment {} already written, ignoring write", self.id);
            return Ok(false);
        }

        let rows = sorted_unique(rows.into_iter().collect());

        let mut data = String::new();
        let mut filter = BloomFilter::new(
            self.params.expected_for(rows.len()),
            self.params.false_positive_rate,
        );
        let mut offsets = Vec::with_capacity(rows.len());
        for (key, value) in rows {
            let key_token = codec::serialize_key(&key)?;
            let value_token = codec::serialize(value.as_ref())?;

            offsets.push((key, data.len() as u64));
            filter.insert(key_token.as_bytes());

            data.push_str(&key_token);
            data.push_str(SEPARATOR);
            data.push_str(&value_token);
            data.push_str(LINE_TERMINATOR);
        }
        let rows_written = offsets.len();

        self.storage
            .write_atomic(&self.id.data_file(), data.as_bytes())
            .with_context(|| format!("writing {}", self.id.data_file()))?;
        self.storage
            .write_atomic(&self.id.filter_file(), filter.to_base64().as_bytes())
            .with_context(|| format!("writing {}", self.id.filter_file()))?;

        for (key, offset) in offsets {
            self.index.add(key, offset);
        }
        self.index.save()?;
        self.filter = filter;

        tracing::info!("wrote segment {} ({} rows)", self.id, rows_written);
        Ok(true)
    }

    /// Point lookup. `Some(None)` means the segment holds a tombstone for
    /// `key`, which must shadow older segments.
    ///
    /// # Errors
    ///
    /// A [`CorruptionError`] if the index and data file disagree, or an I/O
    /// error from the backend.
    pub fn get_entry(&self, key: &K) -> Result<Option<Option<V>>> {
        let key_token = codec::serialize_key(key)?;
        if !self.filter.may_contain(key_token.as_bytes()) {
            return Ok(None);
        }
        let Some(offset) = self.index.get_offset(key) else {
            return Ok(None);
        };

        let data_file = self.id.data_file();
        let line = self
            .storage
            .read_line_at(&data_file, offset)
            .with_context(|| format!("reading {data_file} at {offset}"))?
            .ok_or_else(|| CorruptionError::DanglingOffset {
                segment: self.id.to_string(),
                offset,
                key: key_token.clone(),
            })?;

        let malformed = |e: codec::CodecError| CorruptionError::MalformedRecord {
            segment: self.id.to_string(),
            offset,
            line: line.clone(),
            reason: e.to_string(),
        };
        let (found, value) = codec::split_fields(&line).map_err(malformed)?;
        if found != key_token {
            return Err(CorruptionError::KeyMismatch {
                segment: self.id.to_string(),
                offset,
                expected: key_token,
                found: found.to_string(),
            }
            .into());
        }

        let value = codec::deserialize::<V>(value).map_err(malformed)?;
        Ok(Some(value))
    }

    /// Live value for `key`; a tombstone reads as `None`.
    pub fn get_value(&self, key: &K) -> Result<Option<V>> {
        Ok(self.get_entry(key)?.flatten())
    }

    /// Every record in key order, tombstones included.
    ///
    /// # Errors
    ///
    /// Any line that does not decode into exactly a key and a value fails
    /// the whole read with [`CorruptionError::MalformedLine`].
    pub fn get_all_lines(&self) -> Result<Vec<Record<K, V>>> {
        let data_file = self.id.data_file();
        let bytes = self
            .storage
            .read(&data_file)
            .with_context(|| format!("reading {data_file}"))?;
        let text = String::from_utf8(bytes).with_context(|| format!("{data_file} is not UTF-8"))?;

        let mut records = Vec::with_capacity(self.index.len());
        for (idx, line) in text.lines().enumerate() {
            let record = codec::decode_line(line).map_err(|e| CorruptionError::MalformedLine {
                segment: self.id.to_string(),
                line_no: idx + 1,
                line: line.to_string(),
                reason: e.to_string(),
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Removes the segment's files, index first so that a crash part way
    /// through never leaves a discoverable half-segment.
    pub fn delete_files(&self) -> Result<()> {
        for file in [self.id.index_file(), self.id.data_file(), self.id.filter_file()] {
            self.storage
                .delete(&file)
                .with_context(|| format!("deleting {file}"))?;
        }
        Ok(())
    }

    /// Whether the segment's index has been written.
    #[must_use]
    pub fn is_written(&self) -> bool {
        self.index.exists()
    }

    /// Number of records (tombstones included).
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn id(&self) -> &SegmentId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.id.name()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.index.keys()
    }
}

impl<K, V> std::fmt::Debug for Segment<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segment")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .finish()
    }
}

/// Ascending, one row per key, last occurrence wins. Already-sorted input
/// is returned untouched.
fn sorted_unique<K: Ord, V>(rows: Vec<(K, Option<V>)>) -> Vec<(K, Option<V>)> {
    if rows.windows(2).all(|w| w[0].0 < w[1].0) {
        return rows;
    }
    rows.into_iter().collect::<BTreeMap<_, _>>().into_iter().collect()
}
