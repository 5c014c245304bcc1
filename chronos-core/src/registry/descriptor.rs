//! Watch-face descriptors

use crate::config::{FaceName, StoragePath};
use crate::traits::{PreviewAsset, RenderEntry};

/// Where a face comes from
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaceKind {
    /// Compiled into the firmware
    BuiltIn,
    /// Installed from a manifest
    Custom {
        /// Slot in the custom path table
        index: u8,
        /// Manifest path
        path: StoragePath,
    },
}

/// Face to register; the registry assigns the custom index
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaceEntry {
    pub name: FaceName,
    pub preview: PreviewAsset,
    pub entry: RenderEntry,
}

/// One registered, renderable face
///
/// Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WatchFaceDescriptor {
    name: FaceName,
    preview: PreviewAsset,
    entry: RenderEntry,
    kind: FaceKind,
}

impl WatchFaceDescriptor {
    pub(crate) fn new(face: FaceEntry, kind: FaceKind) -> Self {
        Self {
            name: face.name,
            preview: face.preview,
            entry: face.entry,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn preview(&self) -> PreviewAsset {
        self.preview
    }

    /// Face root the rendering engine shows for this face
    pub fn entry(&self) -> RenderEntry {
        self.entry
    }

    pub fn kind(&self) -> &FaceKind {
        &self.kind
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.kind, FaceKind::Custom { .. })
    }

    /// Slot in the custom path table, for custom faces
    pub fn custom_index(&self) -> Option<u8> {
        match self.kind {
            FaceKind::Custom { index, .. } => Some(index),
            FaceKind::BuiltIn => None,
        }
    }

    /// Manifest path, for custom faces
    pub fn source_path(&self) -> Option<&str> {
        match &self.kind {
            FaceKind::Custom { path, .. } => Some(path.as_str()),
            FaceKind::BuiltIn => None,
        }
    }
}

/// Build a face name, cutting `name` at a character boundary if too long
pub fn face_name(name: &str) -> FaceName {
    let mut out = FaceName::new();
    for c in name.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
