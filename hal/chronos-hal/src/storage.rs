//! Flat file storage abstractions
//!
//! Provides a trait over the persistent byte store that holds watch-face
//! packages, manifests and image assets. The store is flat: paths are
//! `/`-prefixed names in a single root directory.

/// How a file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OpenMode {
    /// Open an existing file for reading from the start
    Read,
    /// Create the file, truncating any existing content
    Write,
}

/// Errors from file storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Path does not exist
    NotFound,
    /// Too many open files, or the path is invalid for this filesystem
    Open,
    /// Underlying read failed
    Read,
    /// Underlying write failed
    Write,
    /// Seek beyond end of file or on an unseekable handle
    Seek,
    /// Partition is full
    Full,
    /// Filesystem is corrupted or not mounted
    Corrupted,
}

/// Flat file storage trait
///
/// Mirrors the small subset of a FAT filesystem the firmware uses.
/// Implementations own the open file table; handles are only valid for
/// the storage instance that produced them.
pub trait FileStorage {
    /// Open file handle
    type Handle;

    /// Open a file by path
    ///
    /// # Arguments
    /// * `path` - Absolute path, e.g. `/FA-250.cbn`
    /// * `mode` - [`OpenMode::Write`] creates or truncates
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<Self::Handle, StorageError>;

    /// Read up to `buffer.len()` bytes from the current position
    ///
    /// # Returns
    /// The number of bytes read; `0` at end of file.
    fn read(&mut self, handle: &mut Self::Handle, buffer: &mut [u8]) -> Result<usize, StorageError>;

    /// Write bytes at the current position
    ///
    /// # Returns
    /// The number of bytes actually written, which may be short when the
    /// partition fills up.
    fn write(&mut self, handle: &mut Self::Handle, data: &[u8]) -> Result<usize, StorageError>;

    /// Move the read/write position to an absolute offset
    fn seek(&mut self, handle: &mut Self::Handle, offset: u32) -> Result<(), StorageError>;

    /// Close a handle, committing any buffered writes
    fn close(&mut self, handle: Self::Handle) -> Result<(), StorageError>;

    /// Delete a file by path
    fn remove(&mut self, path: &str) -> Result<(), StorageError>;

    /// Rename a file, replacing any file already at `to`
    fn rename(&mut self, from: &str, to: &str) -> Result<(), StorageError>;

    /// Visit the path of every file in the root directory
    fn for_each_file(&mut self, visit: &mut dyn FnMut(&str)) -> Result<(), StorageError>;

    /// Erase all stored files
    ///
    /// This reformats the whole partition. Use with caution!
    fn format(&mut self) -> Result<(), StorageError>;
}
