//! # SSTable - immutable sorted segments
//!
//! On-disk storage files for the SiltKV storage engine.
//!
//! When the memtable grows past its threshold the engine flushes it as a new
//! [`Segment`]. Segments are *write-once, read-many*: once created they are
//! never modified, only replaced during compaction.
//!
//! ## File layout
//!
//! Each segment is three text files sharing a base name (see [`SegmentId`]):
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ <name>.data     one record per line, ascending key order      │
//! │                 key;;value\n   (value may be <TOMBSTONE>)     │
//! ├──────────────────────────────────────────────────────────────┤
//! │ <name>.index    one line per key: key;;byte offset into .data │
//! ├──────────────────────────────────────────────────────────────┤
//! │ <name>.filter   base64 of the bloom filter bit array          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every file is written atomically (temp file + rename) and the index goes
//! last. A segment exists, for recovery purposes, only once its index exists.
//!
//! ## Lookup path
//!
//! filter → index → one seek + one line read → key check.
//!
//! The index is loaded fully into memory on open and full scans read the
//! whole data file, which bounds practical segment size by available memory.

mod id;
mod index;
mod segment;

pub use id::{SegmentId, DATA_EXT, FILTER_EXT, INDEX_EXT, SEGMENT_PREFIX};
pub use index::SparseIndex;
pub use segment::{FilterParams, Segment};

use thiserror::Error;

/// On-disk state that contradicts itself. Never retried.
///
/// Returned inside `anyhow::Error`; callers recover it with
/// `err.downcast_ref::<CorruptionError>()`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CorruptionError {
    /// The index points at a line holding a different key.
    #[error("segment {segment}: index offset {offset} for {expected:?} holds key {found:?}")]
    KeyMismatch {
        segment: String,
        offset: u64,
        expected: String,
        found: String,
    },

    /// The index points past the end of the data file.
    #[error("segment {segment}: index offset {offset} for {key:?} is past end of data")]
    DanglingOffset {
        segment: String,
        offset: u64,
        key: String,
    },

    /// The line an index offset points at does not decode.
    #[error("segment {segment}: malformed record at offset {offset}: {line:?} ({reason})")]
    MalformedRecord {
        segment: String,
        offset: u64,
        line: String,
        reason: String,
    },

    /// A data line that does not decode into exactly a key and a value.
    #[error("segment {segment}: malformed data line {line_no}: {line:?} ({reason})")]
    MalformedLine {
        segment: String,
        line_no: usize,
        line: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests;
