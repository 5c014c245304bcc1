//! Package store
//!
//! Durable sink for reassembled chunks. Each session writes one file whose
//! name is derived from the declared total size:
//!
//! ```text
//! "/" + HEX(total) + "-" + DECIMAL(total) + ".cbn"      e.g. /FA-250.cbn
//! ```
//!
//! Two transfers of the same size therefore land on the same path; the
//! second one truncates the first.

use core::fmt::Write as _;

use chronos_hal::{FileStorage, OpenMode, StorageError};

use crate::config::{StoragePath, MANIFEST_EXTENSION, PACKAGE_EXTENSION};

use super::reassembler::ChunkSink;

/// Storage failures while receiving a package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Chunk or close without an open file
    NoSession,
    /// Package file could not be created
    Open(StorageError),
    /// Write call failed
    Write(StorageError),
    /// Write accepted fewer bytes than the chunk holds
    ShortWrite { expected: usize, written: usize },
    /// Close failed; content may not be committed
    Close(StorageError),
    /// Manifest could not be moved to its final name
    Rename(StorageError),
}

/// What a completed package turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PackageKind {
    /// Face manifest, ready for the loader
    Manifest,
    /// Opaque file referenced by a manifest
    Asset,
}

/// A closed package file
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CompletedPackage {
    /// Final storage path
    pub path: StoragePath,
    /// Classification by extension of the final path
    pub kind: PackageKind,
    /// Bytes written
    pub size: u32,
}

/// Derive the storage path for a package of `total_size` bytes
pub fn package_file_name(total_size: u32) -> StoragePath {
    let mut path = StoragePath::new();
    // At most 1 + 8 + 1 + 10 + 4 bytes, always within MAX_PATH_LEN
    let _ = write!(path, "/{:X}-{}{}", total_size, total_size, PACKAGE_EXTENSION);
    path
}

/// Classify a stored file by its extension
pub fn classify(path: &str) -> PackageKind {
    if path.ends_with(MANIFEST_EXTENSION) {
        PackageKind::Manifest
    } else {
        PackageKind::Asset
    }
}

/// Same stem as `path`, with the manifest extension
fn manifest_path(path: &str) -> StoragePath {
    let stem = path.strip_suffix(PACKAGE_EXTENSION).unwrap_or(path);
    let mut renamed = StoragePath::new();
    // The manifest extension is no longer than the package extension
    let _ = write!(renamed, "{}{}", stem, MANIFEST_EXTENSION);
    renamed
}

struct OpenPackage<H> {
    handle: H,
    path: StoragePath,
    written: u32,
    /// First non-whitespace byte of the content
    first_byte: Option<u8>,
}

/// Owner of the package file open for the active transfer
pub struct PackageStore<H> {
    open: Option<OpenPackage<H>>,
}

impl<H> Default for PackageStore<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> PackageStore<H> {
    /// Create a store with no open file
    pub const fn new() -> Self {
        Self { open: None }
    }

    /// Check if a package file is open
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Bytes written to the open file
    pub fn written(&self) -> Option<u32> {
        self.open.as_ref().map(|p| p.written)
    }

    /// Create (or truncate) the file for a `total_size`-byte package
    pub fn begin_session<S>(&mut self, storage: &mut S, total_size: u32) -> Result<StoragePath, StoreError>
    where
        S: FileStorage<Handle = H>,
    {
        self.abort_session(storage);

        let path = package_file_name(total_size);
        let handle = storage.open(&path, OpenMode::Write).map_err(StoreError::Open)?;
        debug!("Opened {} for writing", path.as_str());

        self.open = Some(OpenPackage {
            handle,
            path: path.clone(),
            written: 0,
            first_byte: None,
        });
        Ok(path)
    }

    /// Append one complete chunk to the open file
    pub fn flush_chunk<S>(&mut self, storage: &mut S, data: &[u8]) -> Result<(), StoreError>
    where
        S: FileStorage<Handle = H>,
    {
        let open = self.open.as_mut().ok_or(StoreError::NoSession)?;

        let written = storage.write(&mut open.handle, data).map_err(StoreError::Write)?;
        if written != data.len() {
            return Err(StoreError::ShortWrite {
                expected: data.len(),
                written,
            });
        }

        if open.first_byte.is_none() {
            open.first_byte = data.iter().copied().find(|b| !b.is_ascii_whitespace());
        }
        open.written += written as u32;
        trace!("Flushed {} bytes to {}", written, open.path.as_str());
        Ok(())
    }

    /// Close the file after the last chunk and classify it
    ///
    /// With `promote_manifests`, content starting with `{` is renamed to
    /// the manifest extension before classification. A file that fails
    /// to close or rename is deleted.
    pub fn end_session<S>(&mut self, storage: &mut S, promote_manifests: bool) -> Result<CompletedPackage, StoreError>
    where
        S: FileStorage<Handle = H>,
    {
        let open = self.open.take().ok_or(StoreError::NoSession)?;
        if let Err(e) = storage.close(open.handle) {
            discard(storage, &open.path);
            return Err(StoreError::Close(e));
        }

        let mut path = open.path;
        if promote_manifests && open.first_byte == Some(b'{') {
            let renamed = manifest_path(&path);
            if let Err(e) = storage.rename(&path, &renamed) {
                discard(storage, &path);
                return Err(StoreError::Rename(e));
            }
            debug!("Promoted {} to {}", path.as_str(), renamed.as_str());
            path = renamed;
        }

        let kind = classify(&path);
        info!("Stored {} ({} bytes, {:?})", path.as_str(), open.written, kind);
        Ok(CompletedPackage {
            path,
            kind,
            size: open.written,
        })
    }

    /// Close and delete a partially written file
    pub fn abort_session<S>(&mut self, storage: &mut S)
    where
        S: FileStorage<Handle = H>,
    {
        let Some(open) = self.open.take() else {
            return;
        };
        if storage.close(open.handle).is_err() {
            warn!("Close failed for partial {}", open.path.as_str());
        }
        discard(storage, &open.path);
    }

    /// Borrow the store and its storage as a [`ChunkSink`]
    pub fn sink<'a, S>(&'a mut self, storage: &'a mut S, promote_manifests: bool) -> StoreSink<'a, S>
    where
        S: FileStorage<Handle = H>,
    {
        StoreSink {
            store: self,
            storage,
            promote_manifests,
        }
    }
}

fn discard<S: FileStorage>(storage: &mut S, path: &str) {
    match storage.remove(path) {
        Ok(()) => debug!("Removed partial {}", path),
        Err(e) => warn!("Remove failed for partial {}: {:?}", path, e),
    }
}

/// [`PackageStore`] paired with its storage for one packet
pub struct StoreSink<'a, S: FileStorage> {
    store: &'a mut PackageStore<S::Handle>,
    storage: &'a mut S,
    promote_manifests: bool,
}

impl<S: FileStorage> ChunkSink for StoreSink<'_, S> {
    fn begin_session(&mut self, total_size: u32) -> Result<StoragePath, StoreError> {
        self.store.begin_session(self.storage, total_size)
    }

    fn flush_chunk(&mut self, data: &[u8]) -> Result<(), StoreError> {
        self.store.flush_chunk(self.storage, data)
    }

    fn end_session(&mut self) -> Result<CompletedPackage, StoreError> {
        self.store.end_session(self.storage, self.promote_manifests)
    }

    fn abort_session(&mut self) {
        self.store.abort_session(self.storage)
    }
}
