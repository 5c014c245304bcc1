//! Manifest loader
//!
//! Reads a manifest from storage, emits its elements to the rendering
//! engine and registers the face. Everything that can fail is checked
//! before anything is emitted or registered, so a bad manifest leaves the
//! registry and the file system untouched.

use alloc::vec::Vec;

use chronos_hal::{FileStorage, OpenMode};

use crate::config::{FaceName, PipelineConfig};
use crate::registry::{face_name, FaceEntry, FaceRegistry};
use crate::traits::{FaceRenderer, PreviewAsset, RenderEntry};

use super::document::{AssetList, FaceManifest};
use super::{normalize_path, ManifestError};

/// Read buffer size
const READ_CHUNK: usize = 256;

/// Result of installing a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoadedFace {
    /// Registry index, or `None` when the registry was full
    pub index: Option<usize>,
    /// Registered name
    pub name: FaceName,
    /// Elements accepted by the rendering engine
    pub elements: usize,
}

/// Result of deleting a face's files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnloadReport {
    /// Files removed, manifest included
    pub deleted: usize,
    /// Files that could not be removed
    pub failed: usize,
}

/// Turns manifest files into rendered, registered faces
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    max_size: usize,
    custom_preview: PreviewAsset,
    custom_entry: RenderEntry,
}

impl ManifestLoader {
    /// Create a loader from the pipeline configuration
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            max_size: config.manifest_limit(),
            custom_preview: config.custom_preview,
            custom_entry: config.custom_entry,
        }
    }

    /// Read a whole manifest into memory
    pub fn read<S: FileStorage>(&self, storage: &mut S, path: &str) -> Result<Vec<u8>, ManifestError> {
        let mut handle = storage.open(path, OpenMode::Read).map_err(ManifestError::Read)?;
        let result = self.read_all(storage, &mut handle);
        if storage.close(handle).is_err() {
            warn!("Close failed for {}", path);
        }
        result
    }

    fn read_all<S: FileStorage>(&self, storage: &mut S, handle: &mut S::Handle) -> Result<Vec<u8>, ManifestError> {
        let mut contents = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = storage.read(handle, &mut chunk).map_err(ManifestError::Read)?;
            if n == 0 {
                return Ok(contents);
            }
            if contents.len() + n > self.max_size {
                return Err(ManifestError::TooLarge);
            }
            contents.extend_from_slice(&chunk[..n]);
        }
    }

    /// Replace the custom face root with the manifest's elements
    ///
    /// Elements the engine rejects are skipped. Returns the number
    /// accepted.
    pub fn render<R: FaceRenderer>(&self, renderer: &mut R, face: &FaceManifest) -> usize {
        renderer.clear_custom_face();

        let mut accepted = 0;
        for element in &face.elements {
            match renderer.register_element(element) {
                Ok(_) => accepted += 1,
                Err(e) => warn!("Element {} ({}) skipped: {:?}", element.id, element.image.as_str(), e),
            }
        }
        debug!("{} of {} elements rendered", accepted, face.elements.len());
        accepted
    }

    /// Read, parse and render a manifest without registering it
    pub fn show<S, R>(&self, storage: &mut S, renderer: &mut R, path: &str) -> Result<usize, ManifestError>
    where
        S: FileStorage,
        R: FaceRenderer,
    {
        let path = normalize_path(path)?;
        let bytes = self.read(storage, &path)?;
        let face = FaceManifest::parse(&bytes)?;
        Ok(self.render(renderer, &face))
    }

    /// Install a manifest: render its elements and register the face
    ///
    /// A full registry is not an error: the face is rendered but gets no
    /// index, and stays on storage to be picked up on the next boot.
    pub fn load<S, R>(
        &self,
        storage: &mut S,
        renderer: &mut R,
        registry: &mut FaceRegistry,
        path: &str,
    ) -> Result<LoadedFace, ManifestError>
    where
        S: FileStorage,
        R: FaceRenderer,
    {
        let path = normalize_path(path)?;
        let bytes = self.read(storage, &path)?;
        let face = FaceManifest::parse(&bytes)?;
        drop(bytes);

        let name = face_name(face.name.as_deref().unwrap_or(&path));
        info!("Loading {} from {}: {} elements", name.as_str(), path.as_str(), face.elements.len());

        let elements = self.render(renderer, &face);

        // A re-sent manifest of the same size lands on the same path
        if let Some(index) = registry.find_path(&path) {
            return Ok(LoadedFace {
                index: Some(index),
                name,
                elements,
            });
        }

        let entry = FaceEntry {
            name: name.clone(),
            preview: self.custom_preview,
            entry: self.custom_entry,
        };
        let index = match registry.register(entry, Some(path)) {
            Ok(index) => Some(index),
            Err(e) => {
                warn!("{} not registered: {:?}", name.as_str(), e);
                None
            }
        };

        Ok(LoadedFace { index, name, elements })
    }

    /// Delete every asset a manifest lists, then the manifest itself
    ///
    /// Fails without deleting anything if the manifest cannot be read or
    /// has no `assets` key. Individual delete failures are logged and
    /// counted, not returned.
    pub fn unload<S: FileStorage>(&self, storage: &mut S, path: &str) -> Result<UnloadReport, ManifestError> {
        let path = normalize_path(path)?;
        let bytes = self.read(storage, &path)?;
        let list = AssetList::parse(&bytes)?;

        let mut report = UnloadReport::default();
        for asset in &list.assets {
            match normalize_path(asset) {
                Ok(asset_path) => remove_counted(storage, &asset_path, &mut report),
                Err(_) => {
                    warn!("Asset path too long: {}", asset.as_str());
                    report.failed += 1;
                }
            }
        }
        remove_counted(storage, &path, &mut report);

        info!(
            "Unloaded {}: {} deleted, {} failed",
            path.as_str(),
            report.deleted,
            report.failed
        );
        Ok(report)
    }
}

fn remove_counted<S: FileStorage>(storage: &mut S, path: &str, report: &mut UnloadReport) {
    match storage.remove(path) {
        Ok(()) => {
            debug!("Deleted {}", path);
            report.deleted += 1;
        }
        Err(e) => {
            warn!("Delete failed for {}: {:?}", path, e);
            report.failed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_FACES;
    use crate::testing::{MemStorage, RecordingRenderer, StorageOp};
    use chronos_hal::StorageError;

    const FACE: &str = r#"{
        "name": "Analog",
        "elements": [
            {"id": 1, "x": 120, "y": 120, "image": "S:/dial.bin"},
            {"id": 2, "x": 120, "y": 120, "image": "S:/hand.bin", "group": ["hour"]}
        ],
        "assets": ["dial.bin", "/hand.bin"]
    }"#;

    fn loader() -> ManifestLoader {
        ManifestLoader::new(&PipelineConfig::default())
    }

    #[test]
    fn test_load_renders_and_registers() {
        let mut storage = MemStorage::with_file("/analog.jsn", FACE.as_bytes());
        let mut renderer = RecordingRenderer::default();
        let mut registry = FaceRegistry::new();

        let loaded = loader()
            .load(&mut storage, &mut renderer, &mut registry, "analog.jsn")
            .unwrap();

        assert_eq!(loaded.index, Some(0));
        assert_eq!(loaded.name.as_str(), "Analog");
        assert_eq!(loaded.elements, 2);
        assert_eq!(renderer.clears, 1);
        assert_eq!(renderer.elements.len(), 2);
        assert_eq!(renderer.elements[1].group[0], "hour");

        let face = registry.lookup(0).unwrap();
        assert_eq!(face.source_path(), Some("/analog.jsn"));
        assert_eq!(face.custom_index(), Some(0));
    }

    #[test]
    fn test_reload_same_path_keeps_index() {
        let mut storage = MemStorage::with_file("/analog.jsn", FACE.as_bytes());
        let mut renderer = RecordingRenderer::default();
        let mut registry = FaceRegistry::new();

        loader().load(&mut storage, &mut renderer, &mut registry, "/analog.jsn").unwrap();
        let again = loader()
            .load(&mut storage, &mut renderer, &mut registry, "/analog.jsn")
            .unwrap();

        assert_eq!(again.index, Some(0));
        assert_eq!(registry.len(), 1);
        assert_eq!(renderer.clears, 2);
    }

    #[test]
    fn test_load_without_elements_leaves_registry_unchanged() {
        let mut storage = MemStorage::with_file("/bad.jsn", br#"{"name": "Bad", "assets": []}"#);
        let mut renderer = RecordingRenderer::default();
        let mut registry = FaceRegistry::new();

        let result = loader().load(&mut storage, &mut renderer, &mut registry, "/bad.jsn");

        assert_eq!(result, Err(ManifestError::MissingElements));
        assert_eq!(registry.len(), 0);
        assert_eq!(renderer.clears, 0);
        assert!(renderer.elements.is_empty());
    }

    #[test]
    fn test_load_malformed_leaves_registry_unchanged() {
        let mut storage = MemStorage::with_file("/broken.jsn", b"{\"elements\": [");
        let mut renderer = RecordingRenderer::default();
        let mut registry = FaceRegistry::new();

        let result = loader().load(&mut storage, &mut renderer, &mut registry, "/broken.jsn");

        assert_eq!(result, Err(ManifestError::Malformed));
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.custom_len(), 0);
        assert_eq!(renderer.clears, 0);
        assert!(storage.file("/broken.jsn").is_some());
    }

    #[test]
    fn test_load_missing_file() {
        let mut storage = MemStorage::default();
        let mut renderer = RecordingRenderer::default();
        let mut registry = FaceRegistry::new();

        let result = loader().load(&mut storage, &mut renderer, &mut registry, "/none.jsn");
        assert_eq!(result, Err(ManifestError::Read(StorageError::NotFound)));
    }

    #[test]
    fn test_load_into_full_registry_is_soft() {
        let mut storage = MemStorage::with_file("/analog.jsn", FACE.as_bytes());
        let mut renderer = RecordingRenderer::default();
        let mut registry = FaceRegistry::new();
        for i in 0..MAX_FACES {
            registry
                .register(
                    FaceEntry {
                        name: face_name(&alloc::format!("builtin{}", i)),
                        preview: PreviewAsset(0),
                        entry: RenderEntry(1),
                    },
                    None,
                )
                .unwrap();
        }

        let loaded = loader()
            .load(&mut storage, &mut renderer, &mut registry, "/analog.jsn")
            .unwrap();
        assert_eq!(loaded.index, None);
        assert_eq!(registry.len(), MAX_FACES);
    }

    #[test]
    fn test_rejected_elements_are_skipped() {
        let mut storage = MemStorage::with_file("/analog.jsn", FACE.as_bytes());
        let mut renderer = RecordingRenderer {
            reject_id: Some(1),
            ..Default::default()
        };

        let accepted = loader().show(&mut storage, &mut renderer, "/analog.jsn").unwrap();
        assert_eq!(accepted, 1);
        assert_eq!(renderer.elements[0].id, 2);
    }

    #[test]
    fn test_oversized_manifest() {
        let config = PipelineConfig {
            max_manifest_size: 64,
            ..Default::default()
        };
        let mut storage = MemStorage::with_file("/analog.jsn", FACE.as_bytes());

        assert_eq!(
            ManifestLoader::new(&config).read(&mut storage, "/analog.jsn"),
            Err(ManifestError::TooLarge)
        );
    }

    #[test]
    fn test_unload_deletes_assets_then_manifest() {
        let mut storage = MemStorage::with_file("/analog.jsn", FACE.as_bytes());
        storage.insert("/dial.bin", &[1]);
        storage.insert("/hand.bin", &[2]);

        let report = loader().unload(&mut storage, "analog.jsn").unwrap();

        assert_eq!(report, UnloadReport { deleted: 3, failed: 0 });
        assert_eq!(
            storage.removes(),
            ["/dial.bin", "/hand.bin", "/analog.jsn"]
        );
        assert!(storage.is_empty());
    }

    #[test]
    fn test_unload_counts_failed_deletes() {
        // Only one of the assets exists
        let mut storage = MemStorage::with_file("/analog.jsn", FACE.as_bytes());
        storage.insert("/hand.bin", &[2]);

        let report = loader().unload(&mut storage, "/analog.jsn").unwrap();
        assert_eq!(report, UnloadReport { deleted: 2, failed: 1 });
        assert_eq!(storage.removes().len(), 3);
    }

    #[test]
    fn test_unload_without_assets_deletes_nothing() {
        let mut storage = MemStorage::with_file("/face.jsn", br#"{"elements": []}"#);

        assert_eq!(
            loader().unload(&mut storage, "/face.jsn"),
            Err(ManifestError::MissingAssets)
        );
        assert!(!storage.ops.iter().any(|op| matches!(op, StorageOp::Remove(_))));
        assert!(storage.file("/face.jsn").is_some());
    }

    #[test]
    fn test_unload_malformed_deletes_nothing() {
        let mut storage = MemStorage::with_file("/broken.jsn", b"{\"assets\": [\"/dial.bin\"");
        storage.insert("/dial.bin", &[1]);

        assert_eq!(
            loader().unload(&mut storage, "/broken.jsn"),
            Err(ManifestError::Malformed)
        );
        assert!(storage.removes().is_empty());
        assert!(storage.file("/broken.jsn").is_some());
        assert!(storage.file("/dial.bin").is_some());
    }
}
