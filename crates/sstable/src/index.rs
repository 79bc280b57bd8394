use anyhow::{Context, Result};
use codec::{Codec, LINE_TERMINATOR, SEPARATOR};
use std::collections::BTreeMap;
use std::sync::Arc;
use storage::Storage;

/// Exact key → byte offset map for one segment's data file.
///
/// Loaded fully into memory on [`open`](SparseIndex::open) and persisted as
/// `key;;offset` lines by [`save`](SparseIndex::save).
#[derive(Debug)]
pub struct SparseIndex<K> {
    storage: Arc<dyn Storage>,
    file_name: String,
    entries: BTreeMap<K, u64>,
}

impl<K: Codec + Ord> SparseIndex<K> {
    /// Opens the index stored in `file_name`, or an empty one if the file
    /// does not exist yet.
    ///
    /// Lines that do not split into a decodable key and offset are skipped
    /// with a warning.
    pub fn open(storage: Arc<dyn Storage>, file_name: impl Into<String>) -> Result<Self> {
        let file_name = file_name.into();
        let mut entries = BTreeMap::new();

        let text = storage
            .read_string_if_exists(&file_name)
            .with_context(|| format!("reading index {file_name}"))?;
        for (idx, line) in text.as_deref().unwrap_or_default().lines().enumerate() {
            match parse_line::<K>(line) {
                Some((key, offset)) => {
                    entries.insert(key, offset);
                }
                None => tracing::warn!(
                    "skipping malformed line {} in {}: {:?}",
                    idx + 1,
                    file_name,
                    line
                ),
            }
        }

        Ok(Self {
            storage,
            file_name,
            entries,
        })
    }

    pub fn add(&mut self, key: K, offset: u64) {
        self.entries.insert(key, offset);
    }

    #[must_use]
    pub fn get_offset(&self, key: &K) -> Option<u64> {
        self.entries.get(key).copied()
    }

    /// Whether the backing file is present.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.storage.exists(&self.file_name)
    }

    /// Writes every entry atomically, replacing any previous file.
    pub fn save(&self) -> Result<()> {
        let mut out = String::new();
        for (key, offset) in &self.entries {
            let token = codec::serialize_key(key)?;
            out.push_str(&token);
            out.push_str(SEPARATOR);
            out.push_str(&offset.to_string());
            out.push_str(LINE_TERMINATOR);
        }
        self.storage
            .write_atomic(&self.file_name, out.as_bytes())
            .with_context(|| format!("writing index {}", self.file_name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

fn parse_line<K: Codec>(line: &str) -> Option<(K, u64)> {
    let (key, offset) = codec::split_fields(line).ok()?;
    let key = K::from_token(key).ok()?;
    let offset = offset.trim().parse().ok()?;
    Some((key, offset))
}
