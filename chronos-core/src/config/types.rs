//! Pipeline configuration
//!
//! Runtime settings with defaults matching the stock firmware. Board
//! crates may load an override from preferences at boot.

use crate::traits::{PreviewAsset, RenderEntry};

use super::limits::{CHUNK_BUFFER_SIZE, MAX_MANIFEST_SIZE, MAX_NAME_LEN, MAX_PATH_LEN};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Absolute path in the flat file store
pub type StoragePath = heapless::String<MAX_PATH_LEN>;

/// Face display name
pub type FaceName = heapless::String<MAX_NAME_LEN>;

/// Pipeline configuration
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PipelineConfig {
    /// Largest chunk a header may announce (≤ [`CHUNK_BUFFER_SIZE`])
    pub max_chunk_size: u16,
    /// Largest manifest accepted by the loader (≤ [`MAX_MANIFEST_SIZE`])
    pub max_manifest_size: u32,
    /// Preview image shown for every custom face
    pub custom_preview: PreviewAsset,
    /// Face root shared by every custom face
    pub custom_entry: RenderEntry,
    /// Rename received manifests to the manifest extension
    pub promote_manifests: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: CHUNK_BUFFER_SIZE as u16,
            max_manifest_size: MAX_MANIFEST_SIZE as u32,
            custom_preview: PreviewAsset(0),
            custom_entry: RenderEntry(0),
            promote_manifests: true,
        }
    }
}

impl PipelineConfig {
    /// Chunk size limit clamped to the buffer capacity
    pub fn chunk_limit(&self) -> usize {
        (self.max_chunk_size as usize).min(CHUNK_BUFFER_SIZE)
    }

    /// Manifest size limit clamped to the loader capacity
    pub fn manifest_limit(&self) -> usize {
        (self.max_manifest_size as usize).min(MAX_MANIFEST_SIZE)
    }
}
