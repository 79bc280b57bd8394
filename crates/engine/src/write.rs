/// Write path: `put()`, `delete()`, `force_flush()`, and the internal `flush()`.
///
/// All mutations flow through this module. Each write is first appended to the
/// WAL for durability, then applied to the memtable. When the memtable holds
/// more than `flush_threshold` entries it is persisted as a new segment.
use anyhow::Result;
use codec::{Codec, Record};

use crate::{Engine, EngineError};

impl<K, V> Engine<K, V>
where
    K: Codec + Ord + Clone,
    V: Codec + Clone,
{
    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidArgument`] for a key that encodes to an empty
    /// token, [`codec::CodecError`] for a key or value that cannot be encoded.
    /// Both are raised before anything is written.
    pub fn put(&mut self, key: K, value: V) -> Result<()> {
        self.write(Record::live(key, value))
    }

    /// Deletes `key` by writing a tombstone.
    ///
    /// The tombstone shadows any older value in the segments until a merge
    /// drops it.
    pub fn delete(&mut self, key: K) -> Result<()> {
        self.write(Record::tombstone(key))
    }

    /// Flushes the memtable to a new segment now.
    ///
    /// This is a no-op if the memtable is empty.
    pub fn force_flush(&mut self) -> Result<()> {
        if self.mem.is_empty() {
            return Ok(());
        }
        self.flush()
    }

    fn write(&mut self, record: Record<K, V>) -> Result<()> {
        let key = codec::serialize_key(&record.key)?;
        if key.is_empty() {
            return Err(EngineError::InvalidArgument("key must not be empty".to_string()).into());
        }
        codec::serialize(record.value.as_ref())?;

        // WAL first, then memtable
        self.wal.append(&record)?;
        self.mem.put(record);

        if self.mem.len() > self.config.flush_threshold {
            self.flush()?;
        }
        Ok(())
    }

    /// # Steps
    ///
    /// 1. Take the memtable, leaving an empty one in its place.
    /// 2. Write it as the newest segment (this may trigger compaction).
    /// 3. Truncate the WAL.
    ///
    /// If step 2 fails the taken memtable is put back and the WAL is left
    /// alone, so nothing is lost.
    pub(crate) fn flush(&mut self) -> Result<()> {
        let frozen = self.mem.take();
        if let Err(e) = self.tables.flush(frozen.as_map()) {
            self.mem = frozen;
            return Err(e);
        }
        self.wal.clear()?;
        Ok(())
    }
}
