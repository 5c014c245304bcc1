//! Watch-face manifests
//!
//! A manifest is a JSON document describing one custom face:
//!
//! ```json
//! {
//!   "name": "Analog",
//!   "elements": [
//!     { "id": 0, "x": 120, "y": 120, "pvX": 60, "pvY": 60,
//!       "image": "S:/hand.bin", "group": ["hour"] }
//!   ],
//!   "assets": ["/hand.bin"]
//! }
//! ```
//!
//! `elements` is required to install a face, `assets` to uninstall one.
//! Manifests are transient: they are parsed, turned into element
//! placements, and dropped.

pub mod document;
pub mod loader;

pub use document::{AssetList, FaceManifest};
pub use loader::{LoadedFace, ManifestLoader, UnloadReport};

use chronos_hal::StorageError;

use crate::config::StoragePath;

/// Manifest read and parse failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ManifestError {
    /// Manifest file could not be opened or read
    Read(StorageError),
    /// Manifest is larger than the loader accepts
    TooLarge,
    /// Not valid JSON, or a field has the wrong type
    Malformed,
    /// No `elements` key
    MissingElements,
    /// No `assets` key
    MissingAssets,
    /// Path does not fit a storage path once normalised
    PathTooLong,
}

/// Prefix `path` with `/` unless it already has one
pub fn normalize_path(path: &str) -> Result<StoragePath, ManifestError> {
    let mut normalized = StoragePath::new();
    if !path.starts_with('/') {
        normalized.push('/').map_err(|_| ManifestError::PathTooLong)?;
    }
    normalized.push_str(path).map_err(|_| ManifestError::PathTooLong)?;
    Ok(normalized)
}
