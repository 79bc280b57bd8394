use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io;

use crate::{trim_line_end, Storage};

/// [`Storage`] that keeps every file in memory.
///
/// Durability calls are no-ops. Share it through an `Arc` so that all
/// components see the same files.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files currently stored.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.read().len()
    }
}

fn not_found(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no such file: {name}"))
}

impl Storage for MemoryStorage {
    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        self.files.read().get(name).cloned().ok_or_else(|| not_found(name))
    }

    fn read_line_at(&self, name: &str, offset: u64) -> io::Result<Option<String>> {
        let files = self.files.read();
        let data = files.get(name).ok_or_else(|| not_found(name))?;

        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset out of range"))?;
        if start >= data.len() {
            return Ok(None);
        }
        let rest = &data[start..];
        let end = rest
            .iter()
            .position(|&b| b == b'\n')
            .map_or(rest.len(), |p| p + 1);

        let mut line = String::from_utf8(rest[..end].to_vec())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        trim_line_end(&mut line);
        Ok(Some(line))
    }

    fn write(&self, name: &str, data: &[u8]) -> io::Result<()> {
        self.files.write().insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn append(&self, name: &str, data: &[u8]) -> io::Result<()> {
        self.files
            .write()
            .entry(name.to_string())
            .or_default()
            .extend_from_slice(data);
        Ok(())
    }

    fn sync(&self, _name: &str) -> io::Result<()> {
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.files.read().contains_key(name)
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        let mut files = self.files.write();
        let data = files.remove(from).ok_or_else(|| not_found(from))?;
        files.insert(to.to_string(), data);
        Ok(())
    }

    fn delete(&self, name: &str) -> io::Result<()> {
        self.files.write().remove(name);
        Ok(())
    }

    fn list(&self) -> io::Result<Vec<String>> {
        Ok(self.files.read().keys().cloned().collect())
    }
}
