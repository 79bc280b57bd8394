//! # Storage - pluggable file backend
//!
//! Every persistent component of the engine (WAL, segment data, index and
//! filter files) talks to the outside world through the [`Storage`] trait
//! instead of touching `std::fs` directly. Files are addressed by a flat name
//! relative to the backend root.
//!
//! Two backends ship with the crate:
//!
//! | Backend           | Use                                              |
//! |-------------------|--------------------------------------------------|
//! | [`LocalStorage`]  | A directory on the local file system             |
//! | [`MemoryStorage`] | A map in RAM, for tests and throwaway instances  |
//!
//! ## Atomic writes
//!
//! [`Storage::write_atomic`] writes `<name>.tmp` and renames it over `name`,
//! so readers see either the old file or the complete new one. Leftover
//! `.tmp` files come from interrupted writes and are safe to delete.
//!
//! ## Example
//!
//! ```rust,no_run
//! use storage::{LocalStorage, Storage};
//!
//! let fs = LocalStorage::open("data").unwrap();
//! fs.append("log.txt", b"hello\n").unwrap();
//! fs.sync("log.txt").unwrap();
//! assert_eq!(fs.read("log.txt").unwrap(), b"hello\n");
//! ```

mod local;
mod memory;

use std::io;

pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Suffix used for in-flight atomic writes.
pub const TMP_SUFFIX: &str = ".tmp";

/// A flat namespace of byte files.
///
/// All operations are synchronous and either complete or fail with an
/// [`io::Error`]. Reading a file that does not exist fails with
/// [`io::ErrorKind::NotFound`].
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Reads the whole file.
    fn read(&self, name: &str) -> io::Result<Vec<u8>>;

    /// Reads one line starting at byte `offset`, without its terminator.
    ///
    /// Returns `Ok(None)` when `offset` is at or past the end of the file.
    fn read_line_at(&self, name: &str, offset: u64) -> io::Result<Option<String>>;

    /// Creates or truncates `name`, writes `data` and syncs it to stable storage.
    fn write(&self, name: &str, data: &[u8]) -> io::Result<()>;

    /// Appends `data` to `name`, creating it if necessary.
    ///
    /// The bytes are handed to the OS before returning; call
    /// [`sync`](Storage::sync) to make them durable.
    fn append(&self, name: &str, data: &[u8]) -> io::Result<()>;

    /// Forces previously appended bytes of `name` to stable storage.
    fn sync(&self, name: &str) -> io::Result<()>;

    /// Returns `true` if `name` exists.
    fn exists(&self, name: &str) -> bool;

    /// Renames `from` to `to`, replacing `to` if present.
    fn rename(&self, from: &str, to: &str) -> io::Result<()>;

    /// Deletes `name`. Deleting a missing file is not an error.
    fn delete(&self, name: &str) -> io::Result<()>;

    /// Lists the names of all files directly under the root.
    fn list(&self) -> io::Result<Vec<String>>;

    /// Writes `data` to `name` so that no reader ever observes a partial file.
    fn write_atomic(&self, name: &str, data: &[u8]) -> io::Result<()> {
        let tmp = format!("{name}{TMP_SUFFIX}");
        self.write(&tmp, data)?;
        self.rename(&tmp, name)
    }

    /// Reads `name` as UTF-8, mapping a missing file to `Ok(None)`.
    fn read_string_if_exists(&self, name: &str) -> io::Result<Option<String>> {
        match self.read(name) {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Strips a trailing `\n` or `\r\n` from `line`.
pub(crate) fn trim_line_end(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
}
