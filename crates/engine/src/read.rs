/// Read path: `get()`.
///
/// Point lookups check the memtable first (freshest data), then segments from
/// newest to oldest. The first entry found wins; tombstones shadow older
/// values.
use anyhow::Result;
use codec::Codec;

use crate::Engine;

impl<K, V> Engine<K, V>
where
    K: Codec + Ord + Clone,
    V: Codec + Clone,
{
    /// Looks up the live value for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if a segment read fails (I/O or corruption).
    pub fn get(&self, key: &K) -> Result<Option<V>> {
        // memtable first, respecting tombstones
        if let Some(entry) = self.mem.get_entry(key) {
            return Ok(entry.clone());
        }
        self.tables.find_value(key)
    }
}
