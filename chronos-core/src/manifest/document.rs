//! Manifest document parsing
//!
//! Installing and uninstalling read different parts of the same file, so
//! each has its own view. Unknown keys are ignored by both. Missing
//! element fields default to zero or empty; fields of the wrong type make
//! the whole document malformed.

use alloc::string::String;
use alloc::vec::Vec;

use serde::Deserialize;

use crate::config::MAX_GROUP_TAGS;
use crate::traits::ElementPlacement;

use super::ManifestError;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawElement {
    id: i32,
    x: i32,
    y: i32,
    #[serde(rename = "pvX")]
    preview_x: i32,
    #[serde(rename = "pvY")]
    preview_y: i32,
    image: String,
    group: Vec<String>,
}

impl From<RawElement> for ElementPlacement {
    fn from(raw: RawElement) -> Self {
        let mut group = heapless::Vec::new();
        // Tags past the cap are dropped; order is kept
        for tag in raw.group.into_iter().take(MAX_GROUP_TAGS) {
            let _ = group.push(tag);
        }

        Self {
            id: raw.id,
            x: raw.x,
            y: raw.y,
            preview_x: raw.preview_x,
            preview_y: raw.preview_y,
            image: raw.image,
            group,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawFace {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    elements: Option<Vec<RawElement>>,
}

#[derive(Debug, Deserialize)]
struct RawAssets {
    #[serde(default)]
    assets: Option<Vec<String>>,
}

/// Install view of a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceManifest {
    /// Face display name, if the manifest has one
    pub name: Option<String>,
    /// Element placements in manifest order
    pub elements: Vec<ElementPlacement>,
}

impl FaceManifest {
    /// Parse the install view; fails without an `elements` key
    pub fn parse(bytes: &[u8]) -> Result<Self, ManifestError> {
        let raw: RawFace = parse_json(bytes)?;
        let elements = raw.elements.ok_or(ManifestError::MissingElements)?;

        Ok(Self {
            name: raw.name,
            elements: elements.into_iter().map(ElementPlacement::from).collect(),
        })
    }
}

/// Uninstall view of a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetList {
    /// Asset paths as written in the manifest
    pub assets: Vec<String>,
}

impl AssetList {
    /// Parse the uninstall view; fails without an `assets` key
    pub fn parse(bytes: &[u8]) -> Result<Self, ManifestError> {
        let raw: RawAssets = parse_json(bytes)?;
        let assets = raw.assets.ok_or(ManifestError::MissingAssets)?;
        Ok(Self { assets })
    }
}

fn parse_json<'de, T: Deserialize<'de>>(bytes: &'de [u8]) -> Result<T, ManifestError> {
    serde_json::from_slice(bytes).map_err(|e| {
        warn!("Manifest parse error at {}:{}", e.line(), e.column());
        ManifestError::Malformed
    })
}
