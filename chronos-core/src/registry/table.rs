//! Bounded face table
//!
//! Faces live in registration order in a fixed-capacity table. Custom
//! faces also get a slot in a parallel path table; slots are handed out
//! in order and never reused until the device restarts. Deleting a face
//! removes its files but leaves the table as it is: the caller restarts
//! the device, and the next boot scan rebuilds the table from storage.

use heapless::Vec;

use chronos_hal::FileStorage;

use crate::config::{StoragePath, MAX_CUSTOM, MAX_FACES};
use crate::manifest::{ManifestError, ManifestLoader, UnloadReport};

use super::descriptor::{FaceEntry, FaceKind, WatchFaceDescriptor};

/// Registry failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistryError {
    /// Face table is at capacity
    Full,
    /// Custom path table is at capacity
    CustomTableFull,
    /// No face at this index
    NotFound,
    /// Built-in faces cannot be deleted
    NotCustom,
    /// Face files could not be removed
    Unload(ManifestError),
}

/// Fixed-capacity table of registered faces
#[derive(Debug, Default)]
pub struct FaceRegistry {
    faces: Vec<WatchFaceDescriptor, MAX_FACES>,
    custom_paths: Vec<StoragePath, MAX_CUSTOM>,
}

impl FaceRegistry {
    /// Create an empty registry
    pub const fn new() -> Self {
        Self {
            faces: Vec::new(),
            custom_paths: Vec::new(),
        }
    }

    /// Register a face
    ///
    /// Faces with a `source_path` are custom and take the next custom
    /// slot. On error the registry is unchanged.
    pub fn register(&mut self, face: FaceEntry, source_path: Option<StoragePath>) -> Result<usize, RegistryError> {
        if self.faces.is_full() {
            return Err(RegistryError::Full);
        }

        let kind = match source_path {
            None => FaceKind::BuiltIn,
            Some(path) => {
                let index = self.custom_paths.len();
                self.custom_paths
                    .push(path.clone())
                    .map_err(|_| RegistryError::CustomTableFull)?;
                FaceKind::Custom {
                    index: index as u8,
                    path,
                }
            }
        };

        let index = self.faces.len();
        let descriptor = WatchFaceDescriptor::new(face, kind);
        info!("Face {} registered at {}", descriptor.name(), index);
        // Capacity checked above
        let _ = self.faces.push(descriptor);
        Ok(index)
    }

    /// Register a face compiled into the firmware
    pub fn register_builtin(&mut self, face: FaceEntry) -> Result<usize, RegistryError> {
        self.register(face, None)
    }

    /// Face at `index`
    pub fn lookup(&self, index: usize) -> Result<&WatchFaceDescriptor, RegistryError> {
        self.faces.get(index).ok_or(RegistryError::NotFound)
    }

    /// Manifest path in custom slot `index`
    pub fn custom_path(&self, index: u8) -> Option<&str> {
        self.custom_paths.get(index as usize).map(|p| p.as_str())
    }

    /// Check if a face with this manifest path is registered
    pub fn contains_path(&self, path: &str) -> bool {
        self.custom_paths.iter().any(|p| p.as_str() == path)
    }

    /// Index of the face registered from this manifest path
    pub fn find_path(&self, path: &str) -> Option<usize> {
        self.faces.iter().position(|f| f.source_path() == Some(path))
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Number of custom slots handed out
    pub fn custom_len(&self) -> usize {
        self.custom_paths.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatchFaceDescriptor> {
        self.faces.iter()
    }

    /// Delete the files of the custom face at `index`
    ///
    /// The table itself is not compacted; restart the device afterwards.
    pub fn delete<S: FileStorage>(
        &self,
        index: usize,
        loader: &ManifestLoader,
        storage: &mut S,
    ) -> Result<UnloadReport, RegistryError> {
        let face = self.lookup(index)?;
        let path = face.source_path().ok_or(RegistryError::NotCustom)?;
        loader.unload(storage, path).map_err(RegistryError::Unload)
    }
}
