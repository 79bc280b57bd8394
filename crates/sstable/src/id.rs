use std::fmt;
use uuid::Uuid;

pub const SEGMENT_PREFIX: &str = "sstable-";
pub const DATA_EXT: &str = ".data";
pub const INDEX_EXT: &str = ".index";
pub const FILTER_EXT: &str = ".filter";

/// Identity of a segment: a recency sequence plus a unique base name.
///
/// Names look like `sstable-0000000042-<32 hex digits>`. The sequence is
/// zero-padded so names also sort by recency; the uuid keeps names unique
/// even when two segments share a sequence (a merge output inherits the
/// sequence of its newest input).
///
/// Ordering is by `(seq, name)`, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId {
    seq: u64,
    name: String,
}

impl SegmentId {
    /// A fresh, unique id for sequence `seq`.
    pub fn new(seq: u64) -> Self {
        let name = format!("{SEGMENT_PREFIX}{seq:010}-{}", Uuid::new_v4().simple());
        Self { seq, name }
    }

    /// Parses a base name produced by [`new`](Self::new).
    pub fn parse(name: &str) -> Option<Self> {
        let rest = name.strip_prefix(SEGMENT_PREFIX)?;
        let (seq, tail) = rest.split_once('-')?;
        if seq.is_empty() || !seq.bytes().all(|b| b.is_ascii_digit()) || tail.is_empty() {
            return None;
        }
        let seq = seq.parse().ok()?;
        Some(Self {
            seq,
            name: name.to_string(),
        })
    }

    /// Parses the id out of an index file name, e.g. `<name>.index`.
    pub fn from_index_file(file_name: &str) -> Option<Self> {
        Self::parse(file_name.strip_suffix(INDEX_EXT)?)
    }

    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_file(&self) -> String {
        format!("{}{DATA_EXT}", self.name)
    }

    pub fn index_file(&self) -> String {
        format!("{}{INDEX_EXT}", self.name)
    }

    pub fn filter_file(&self) -> String {
        format!("{}{FILTER_EXT}", self.name)
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
