//! Face pipeline
//!
//! Owns every stage and the collaborators they drive, and keeps the
//! [`State`] in step with what they do. All entry points run on the
//! single control flow that also runs the UI; call
//! [`FacePipeline::ui_tick_allowed`] before each UI tick.

use alloc::vec::Vec;

use chronos_hal::{FileStorage, PacketTx, StorageError};
use chronos_protocol::ChunkAck;

use crate::config::{PipelineConfig, StoragePath, MANIFEST_EXTENSION};
use crate::manifest::{normalize_path, LoadedFace, ManifestError, ManifestLoader, UnloadReport};
use crate::registry::{face_name, FaceEntry, FaceRegistry, RegistryError};
use crate::state::{ErrorKind, Event, State};
use crate::traits::{DeviceControl, FaceRenderer};
use crate::transfer::{
    ChunkReassembler, CompletedPackage, PackageKind, PackageStore, Progress, TransferError, TransferProgress,
};

const ERROR_TITLE: &str = "Error";
const INSTALL_FAILED: &str = "Deserialize failed";
const DELETE_FAILED: &str = "Failed to delete watchface";
const DELETE_TITLE: &str = "Delete";
const DELETE_NOTICE: &str = "The watchface will be deleted from storage, the watch will restart after deletion";

/// Top-level pipeline failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PipelineError {
    /// Transfer aborted
    Transfer(TransferError),
    /// Manifest could not be installed or shown
    Manifest(ManifestError),
    /// Registry lookup or delete failed
    Registry(RegistryError),
    /// Storage-wide operation failed
    Storage(StorageError),
    /// Another operation is in progress, or a restart is pending
    Busy,
}

impl From<TransferError> for PipelineError {
    fn from(e: TransferError) -> Self {
        PipelineError::Transfer(e)
    }
}

impl From<ManifestError> for PipelineError {
    fn from(e: ManifestError) -> Self {
        PipelineError::Manifest(e)
    }
}

impl From<RegistryError> for PipelineError {
    fn from(e: RegistryError) -> Self {
        PipelineError::Registry(e)
    }
}

impl From<StorageError> for PipelineError {
    fn from(e: StorageError) -> Self {
        PipelineError::Storage(e)
    }
}

impl From<&TransferError> for ErrorKind {
    fn from(e: &TransferError) -> Self {
        match e {
            TransferError::Protocol(_) => ErrorKind::Protocol,
            TransferError::Store(_) => ErrorKind::Storage,
            TransferError::Link => ErrorKind::Link,
        }
    }
}

impl From<&ManifestError> for ErrorKind {
    fn from(e: &ManifestError) -> Self {
        match e {
            ManifestError::Read(_) => ErrorKind::Storage,
            _ => ErrorKind::Parse,
        }
    }
}

/// What one packet did
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketOutcome {
    /// Not a transfer packet
    Ignored,
    /// Header or row accepted; no chunk completed
    Accepted,
    /// Chunk flushed and acknowledged
    ChunkAcked(ChunkAck),
    /// Last chunk stored as an asset
    Stored(CompletedPackage),
    /// Last chunk stored as a manifest and installed
    Installed(LoadedFace),
}

/// Watch-face transfer and installation pipeline
pub struct FacePipeline<S: FileStorage, T, R, D> {
    config: PipelineConfig,
    storage: S,
    link: T,
    renderer: R,
    device: D,
    reassembler: ChunkReassembler,
    store: PackageStore<S::Handle>,
    loader: ManifestLoader,
    registry: FaceRegistry,
    state: State,
}

impl<S, T, R, D> FacePipeline<S, T, R, D>
where
    S: FileStorage,
    T: PacketTx,
    R: FaceRenderer,
    D: DeviceControl,
{
    /// Create a pipeline with an empty registry
    pub fn new(config: PipelineConfig, storage: S, link: T, renderer: R, device: D) -> Self {
        Self {
            reassembler: ChunkReassembler::new(config.chunk_limit()),
            store: PackageStore::new(),
            loader: ManifestLoader::new(&config),
            registry: FaceRegistry::new(),
            state: State::Idle,
            config,
            storage,
            link,
            renderer,
            device,
        }
    }

    /// Register a face compiled into the firmware
    ///
    /// Call for every built-in face before [`Self::boot`].
    pub fn register_builtin(&mut self, face: FaceEntry) -> Result<usize, RegistryError> {
        self.registry.register_builtin(face)
    }

    /// Register every manifest in storage as a custom face
    ///
    /// Manifests are not parsed here; a broken one fails when shown.
    /// Returns the number of faces registered.
    pub fn boot(&mut self) -> Result<usize, PipelineError> {
        let mut manifests: Vec<StoragePath> = Vec::new();
        self.storage.for_each_file(&mut |name| {
            if !name.ends_with(MANIFEST_EXTENSION) {
                return;
            }
            match normalize_path(name) {
                Ok(path) => manifests.push(path),
                Err(_) => warn!("Skipping {}: path too long", name),
            }
        })?;

        let mut registered = 0;
        for path in manifests {
            if self.registry.contains_path(&path) {
                continue;
            }
            let entry = FaceEntry {
                name: face_name(&path),
                preview: self.config.custom_preview,
                entry: self.config.custom_entry,
            };
            match self.registry.register(entry, Some(path)) {
                Ok(_) => registered += 1,
                Err(e) => warn!("Custom face not registered: {:?}", e),
            }
        }

        info!("Boot scan: {} custom faces, {} total", registered, self.registry.len());
        Ok(registered)
    }

    /// Feed one raw packet from the link
    pub fn on_packet(&mut self, bytes: &[u8]) -> Result<PacketOutcome, PipelineError> {
        if matches!(self.state, State::Installing | State::Deleting | State::RestartPending) {
            return Err(PipelineError::Busy);
        }

        let result = {
            let mut sink = self.store.sink(&mut self.storage, self.config.promote_manifests);
            self.reassembler.on_packet(bytes, &mut sink, &mut self.link)
        };

        let progress = match result {
            Ok(progress) => progress,
            Err(e) => {
                self.dispatch(Event::ErrorDetected(ErrorKind::from(&e)));
                return Err(e.into());
            }
        };

        match progress {
            Progress::Ignored { .. } => Ok(PacketOutcome::Ignored),
            Progress::SessionStarted { .. } => {
                self.dispatch(Event::TransferStarted);
                Ok(PacketOutcome::Accepted)
            }
            Progress::ChunkStarted { .. } | Progress::Data { .. } => Ok(PacketOutcome::Accepted),
            Progress::ChunkAcked(ack) => Ok(PacketOutcome::ChunkAcked(ack)),
            Progress::Complete(package) => {
                self.dispatch(Event::TransferComplete);
                match package.kind {
                    PackageKind::Manifest => self.install(&package.path).map(PacketOutcome::Installed),
                    PackageKind::Asset => Ok(PacketOutcome::Stored(package)),
                }
            }
        }
    }

    /// Render and register a stored manifest
    pub fn install(&mut self, path: &str) -> Result<LoadedFace, PipelineError> {
        if self.state.is_busy() || self.state == State::RestartPending {
            return Err(PipelineError::Busy);
        }

        self.dispatch(Event::InstallStarted);
        match self
            .loader
            .load(&mut self.storage, &mut self.renderer, &mut self.registry, path)
        {
            Ok(face) => {
                self.dispatch(Event::InstallComplete);
                Ok(face)
            }
            Err(e) => {
                error!("Install of {} failed: {:?}", path, e);
                self.dispatch(Event::ErrorDetected(ErrorKind::from(&e)));
                self.device.show_dialog(ERROR_TITLE, INSTALL_FAILED);
                Err(e.into())
            }
        }
    }

    /// Make the face at `index` the active screen
    ///
    /// Custom faces are rebuilt from their manifest first. Refused once a
    /// restart is pending, as the registry may name deleted files.
    pub fn show_face(&mut self, index: usize) -> Result<(), PipelineError> {
        if self.state.is_busy() || self.state == State::RestartPending {
            return Err(PipelineError::Busy);
        }

        let face = self.registry.lookup(index)?;
        let entry = face.entry();
        if let Some(path) = face.source_path() {
            if let Err(e) = self.loader.show(&mut self.storage, &mut self.renderer, path) {
                error!("Face {} failed to load: {:?}", index, e);
                self.device.show_dialog(ERROR_TITLE, INSTALL_FAILED);
                return Err(e.into());
            }
        }

        debug!("Showing face {}", index);
        self.renderer.show_face(entry);
        Ok(())
    }

    /// Delete a custom face's files and restart
    ///
    /// The registry is left stale; the restart rebuilds it.
    pub fn delete_face(&mut self, index: usize) -> Result<UnloadReport, PipelineError> {
        if self.state.is_busy() || self.state == State::RestartPending {
            return Err(PipelineError::Busy);
        }
        if !self.registry.lookup(index)?.is_custom() {
            return Err(RegistryError::NotCustom.into());
        }

        self.dispatch(Event::DeleteRequested);
        self.device.show_dialog(DELETE_TITLE, DELETE_NOTICE);

        match self.registry.delete(index, &self.loader, &mut self.storage) {
            Ok(report) => {
                self.dispatch(Event::DeleteComplete);
                info!("Face {} deleted, restarting", index);
                self.device.request_restart();
                Ok(report)
            }
            Err(e) => {
                error!("Delete of face {} failed: {:?}", index, e);
                let kind = match &e {
                    RegistryError::Unload(m) => ErrorKind::from(m),
                    _ => ErrorKind::Storage,
                };
                self.dispatch(Event::ErrorDetected(kind));
                self.device.show_dialog(ERROR_TITLE, DELETE_FAILED);
                Err(e.into())
            }
        }
    }

    /// Erase storage and restart
    pub fn factory_reset(&mut self) -> Result<(), PipelineError> {
        warn!("Reset request, formatting storage");
        {
            let mut sink = self.store.sink(&mut self.storage, self.config.promote_manifests);
            self.reassembler.abort(&mut sink);
        }
        self.storage.format()?;

        self.dispatch(Event::ResetRequested);
        self.device.request_restart();
        Ok(())
    }

    /// Dismiss the current error
    pub fn acknowledge_error(&mut self) {
        self.dispatch(Event::AcknowledgeError);
    }

    /// Progress of the active transfer
    pub fn progress(&self) -> Option<TransferProgress> {
        self.reassembler.progress()
    }

    /// Check if the periodic UI tick may run
    pub fn ui_tick_allowed(&self) -> bool {
        self.state.ui_tick_allowed()
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn registry(&self) -> &FaceRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn link(&self) -> &T {
        &self.link
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    fn dispatch(&mut self, event: Event) {
        let next = self.state.transition(event);
        if next != self.state {
            debug!("State {:?} -> {:?} on {:?}", self.state, next, event);
        }
        self.state = next;
    }
}
