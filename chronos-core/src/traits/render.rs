//! Rendering engine capability
//!
//! The core never touches widget internals. It builds element placements
//! from a manifest and hands them to the engine one at a time; the engine
//! resolves the image reference and returns an opaque handle.

use alloc::string::String;
use heapless::Vec;

use crate::config::MAX_GROUP_TAGS;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque reference to a preview image compiled into the firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PreviewAsset(pub u16);

/// Opaque handle to a face root the rendering engine knows how to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RenderEntry(pub u16);

/// Handle returned for a registered element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ElementHandle(pub u32);

/// Errors reported by the rendering engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RenderError {
    /// Element id is not one the engine can build
    UnknownElement,
    /// Image reference could not be resolved
    ImageUnavailable,
    /// Engine ran out of object memory
    OutOfMemory,
}

/// One element of a custom face, in manifest order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementPlacement {
    /// Element type id understood by the engine
    pub id: i32,
    /// Position on the face
    pub x: i32,
    pub y: i32,
    /// Position in the face preview
    pub preview_x: i32,
    pub preview_y: i32,
    /// Image asset path or built-in image name
    pub image: String,
    /// Tags selecting state variants of the element (capped)
    pub group: Vec<String, MAX_GROUP_TAGS>,
}

/// Rendering engine interface used by the pipeline
pub trait FaceRenderer {
    /// Remove every element from the shared custom-face root
    fn clear_custom_face(&mut self);

    /// Create one element on the custom-face root
    fn register_element(&mut self, element: &ElementPlacement) -> Result<ElementHandle, RenderError>;

    /// Make a face the active screen
    fn show_face(&mut self, entry: RenderEntry);
}
