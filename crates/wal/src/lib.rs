//! # WAL - Write-Ahead Log
//!
//! Provides crash-safe durability for the SiltKV storage engine.
//!
//! Every mutation (put or delete) is encoded as one text line and appended to
//! the log **before** the corresponding memtable update. On restart the log
//! is replayed to reconstruct the memtable, so no acknowledged write is lost.
//!
//! ## Record Format
//!
//! ```text
//! <key token>;;<value token or <TOMBSTONE>>\n
//! ```
//!
//! Lines are never reordered. The log only shrinks through [`Wal::clear`],
//! which the engine calls once the memtable has been durably written to a
//! segment.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use codec::Record;
//! use config::WalSyncPolicy;
//! use storage::LocalStorage;
//! use wal::Wal;
//!
//! let storage = Arc::new(LocalStorage::open("data").unwrap());
//! let mut wal = Wal::open(storage, WalSyncPolicy::EveryWrite).unwrap();
//! wal.append(&Record::live("hello".to_string(), "world".to_string())).unwrap();
//!
//! let records = wal.read_all::<String, String>().unwrap();
//! assert_eq!(records.len(), 1);
//! ```

use codec::{CodecError, Record};
use config::WalSyncPolicy;
use std::io;
use std::sync::Arc;
use storage::Storage;
use thiserror::Error;

/// File name of the log inside the storage root.
pub const WAL_FILE_NAME: &str = "commit-log.txt";

/// Errors that can occur during WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A record could not be encoded; nothing was written.
    #[error("cannot encode record: {0}")]
    Codec(#[from] CodecError),

    /// A line failed to decode during replay. Replay stops here.
    #[error("corrupt record at line {line_no}: {line:?}")]
    Corrupt {
        /// 1-based line number.
        line_no: usize,
        line: String,
        #[source]
        source: CodecError,
    },
}

/// Append-only write-ahead log over a [`Storage`] backend.
///
/// Appends go straight to the backend; durability is controlled by the
/// [`WalSyncPolicy`]. With `EveryN`, up to `count - 1` records may sit
/// unsynced until the next sync point or [`clear`](Wal::clear).
pub struct Wal {
    storage: Arc<dyn Storage>,
    policy: WalSyncPolicy,
    /// Records in the log.
    size: usize,
    /// Appends since the last fsync.
    unsynced: usize,
}

impl Wal {
    /// Opens (or lazily creates) the log in `storage`.
    ///
    /// If the file already holds records, their count becomes
    /// [`size`](Wal::size); the lines themselves are not validated until
    /// [`read_all`](Wal::read_all).
    pub fn open(storage: Arc<dyn Storage>, policy: WalSyncPolicy) -> Result<Self, WalError> {
        let size = match storage.read_string_if_exists(WAL_FILE_NAME)? {
            Some(text) => text.lines().count(),
            None => 0,
        };
        if size > 0 {
            tracing::debug!("found {} records in {}", size, WAL_FILE_NAME);
        }

        Ok(Self {
            storage,
            policy,
            size,
            unsynced: 0,
        })
    }

    /// Encodes `record` and appends it to the log.
    ///
    /// Encoding errors are returned before any byte is written.
    pub fn append<K: codec::Codec, V: codec::Codec>(
        &mut self,
        record: &Record<K, V>,
    ) -> Result<(), WalError> {
        let line = codec::encode_line(&record.key, record.value.as_ref())?;
        self.storage.append(WAL_FILE_NAME, line.as_bytes())?;
        self.size += 1;
        self.unsynced += 1;

        let due = match self.policy {
            WalSyncPolicy::EveryWrite => true,
            WalSyncPolicy::EveryN { count } => self.unsynced >= count,
        };
        if due {
            self.sync()?;
        }
        Ok(())
    }

    /// Reads every record in append order.
    ///
    /// # Errors
    ///
    /// Any line that does not decode (wrong field count, undecodable token)
    /// aborts the read with [`WalError::Corrupt`]; lines are never skipped.
    pub fn read_all<K: codec::Codec, V: codec::Codec>(&self) -> Result<Vec<Record<K, V>>, WalError> {
        let Some(text) = self.storage.read_string_if_exists(WAL_FILE_NAME)? else {
            return Ok(Vec::new());
        };

        let mut records = Vec::with_capacity(self.size);
        for (idx, line) in text.lines().enumerate() {
            let record = codec::decode_line(line).map_err(|source| WalError::Corrupt {
                line_no: idx + 1,
                line: line.to_string(),
                source,
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Number of records in the log.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Forces every appended record to stable storage.
    pub fn sync(&mut self) -> Result<(), WalError> {
        self.storage.sync(WAL_FILE_NAME)?;
        self.unsynced = 0;
        Ok(())
    }

    /// Makes all prior appends durable, then truncates the log to empty.
    pub fn clear(&mut self) -> Result<(), WalError> {
        self.sync()?;
        self.storage.write(WAL_FILE_NAME, &[])?;
        tracing::debug!("cleared {} ({} records)", WAL_FILE_NAME, self.size);
        self.size = 0;
        Ok(())
    }

    #[must_use]
    pub fn policy(&self) -> WalSyncPolicy {
        self.policy
    }
}

impl std::fmt::Debug for Wal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wal")
            .field("file", &WAL_FILE_NAME)
            .field("policy", &self.policy)
            .field("size", &self.size)
            .field("unsynced", &self.unsynced)
            .finish()
    }
}
