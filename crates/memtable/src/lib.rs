use codec::Record;
use std::collections::BTreeMap;

/// Sorted in-memory table of the most recent writes.
///
/// Each key maps to its latest value, or `None` for a tombstone. Tombstones
/// are kept so they can shadow older values once flushed to a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memtable<K: Ord, V> {
    map: BTreeMap<K, Option<V>>,
}

impl<K: Ord, V> Memtable<K, V> {
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    /// Builds a table from records in write order; later records for the
    /// same key overwrite earlier ones.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Record<K, V>>,
    {
        let mut m = Self::new();
        for record in records {
            m.put(record);
        }
        m
    }

    /// Inserts or overwrites the entry for `record.key`.
    pub fn put(&mut self, record: Record<K, V>) {
        self.map.insert(record.key, record.value);
    }

    /// Live value for `key`; `None` if absent or deleted.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key).and_then(Option::as_ref)
    }

    /// Raw entry for `key`: `Some(None)` is a tombstone.
    pub fn get_entry(&self, key: &K) -> Option<&Option<V>> {
        self.map.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Ordered iterator over entries, tombstones included.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &Option<V>)> {
        self.map.iter()
    }

    /// The sorted mapping itself.
    pub fn as_map(&self) -> &BTreeMap<K, Option<V>> {
        &self.map
    }

    pub fn into_map(self) -> BTreeMap<K, Option<V>> {
        self.map
    }

    /// Number of entries, tombstones included.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Moves every entry out, leaving this table empty.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

impl<K: Ord, V> Default for Memtable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
