/// Cold-start path: removing debris from interrupted writes and replaying the
/// WAL into a fresh memtable.
use anyhow::{Context, Result};
use codec::Codec;
use memtable::Memtable;
use sstable::{DATA_EXT, FILTER_EXT, INDEX_EXT};
use std::collections::HashSet;
use storage::{Storage, TMP_SUFFIX};
use wal::Wal;

/// Deletes leftovers of writes that never completed.
///
/// That is every `*.tmp` file, and every `.data` or `.filter` file whose
/// `.index` is missing. A segment's index is written last, so such files
/// belong to a segment that was never made discoverable.
///
/// Returns the number of files removed.
pub fn cleanup_stale_files(storage: &dyn Storage) -> Result<usize> {
    let files = storage.list().context("failed to list storage for cleanup")?;
    let present: HashSet<&str> = files.iter().map(String::as_str).collect();
    let mut removed = 0;

    for file in &files {
        if file.ends_with(TMP_SUFFIX) {
            storage.delete(file)?;
            tracing::info!("removed stale temp file {}", file);
            removed += 1;
            continue;
        }

        let base = file
            .strip_suffix(DATA_EXT)
            .or_else(|| file.strip_suffix(FILTER_EXT));
        if let Some(base) = base {
            if !present.contains(format!("{base}{INDEX_EXT}").as_str()) {
                storage.delete(file)?;
                tracing::info!("removed orphaned segment file {}", file);
                removed += 1;
            }
        }
    }

    Ok(removed)
}

/// Rebuilds the memtable from the WAL.
///
/// An empty log yields an empty memtable without reading the file. Later
/// records overwrite earlier ones for the same key, tombstones included.
///
/// # Errors
///
/// Any undecodable line aborts recovery; see [`Wal::read_all`].
pub fn replay_wal<K, V>(wal: &Wal) -> Result<Memtable<K, V>>
where
    K: Codec + Ord,
    V: Codec,
{
    if wal.is_empty() {
        return Ok(Memtable::new());
    }

    let records = wal
        .read_all::<K, V>()
        .context("failed to replay write-ahead log")?;
    tracing::info!("replayed {} records from the write-ahead log", records.len());
    Ok(Memtable::from_records(records))
}
