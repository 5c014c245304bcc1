//! Test doubles for the hardware and engine traits

use std::collections::BTreeMap;

use chronos_hal::{FileStorage, OpenMode, PacketTx, StorageError};

use crate::traits::{DeviceControl, ElementHandle, ElementPlacement, FaceRenderer, RenderEntry, RenderError};

/// Storage call, in the order it was made
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    Open(String, OpenMode),
    Write(String, usize),
    Close(String),
    Remove(String),
    Rename(String, String),
    Format,
}

#[derive(Debug)]
pub struct MemHandle {
    path: String,
    pos: usize,
}

/// Flat in-memory file store
///
/// Paths are stored with a leading `/`; listing yields bare names, as a
/// FAT root directory does.
#[derive(Debug, Default)]
pub struct MemStorage {
    pub files: BTreeMap<String, Vec<u8>>,
    pub ops: Vec<StorageOp>,
    /// Accept at most this many bytes per write call
    pub write_limit: Option<usize>,
    /// Fail every write call
    pub fail_writes: bool,
    /// Fail every rename call
    pub fail_renames: bool,
}

fn key(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

impl MemStorage {
    pub fn with_file(path: &str, contents: &[u8]) -> Self {
        let mut storage = Self::default();
        storage.insert(path, contents);
        storage
    }

    pub fn insert(&mut self, path: &str, contents: &[u8]) {
        self.files.insert(key(path), contents.to_vec());
    }

    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Paths passed to `remove`, in call order
    pub fn removes(&self) -> Vec<String> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                StorageOp::Remove(path) => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    /// Sizes of the write calls made to `path`
    pub fn writes_to(&self, path: &str) -> Vec<usize> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                StorageOp::Write(p, len) if p == path => Some(*len),
                _ => None,
            })
            .collect()
    }

    pub fn closes(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, StorageOp::Close(_))).count()
    }
}

impl FileStorage for MemStorage {
    type Handle = MemHandle;

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<MemHandle, StorageError> {
        self.ops.push(StorageOp::Open(path.to_string(), mode));
        match mode {
            OpenMode::Read if !self.files.contains_key(path) => return Err(StorageError::NotFound),
            OpenMode::Read => {}
            OpenMode::Write => {
                self.files.insert(path.to_string(), Vec::new());
            }
        }
        Ok(MemHandle {
            path: path.to_string(),
            pos: 0,
        })
    }

    fn read(&mut self, handle: &mut MemHandle, buffer: &mut [u8]) -> Result<usize, StorageError> {
        let file = self.files.get(&handle.path).ok_or(StorageError::Read)?;
        let n = buffer.len().min(file.len().saturating_sub(handle.pos));
        buffer[..n].copy_from_slice(&file[handle.pos..handle.pos + n]);
        handle.pos += n;
        Ok(n)
    }

    fn write(&mut self, handle: &mut MemHandle, data: &[u8]) -> Result<usize, StorageError> {
        if self.fail_writes {
            return Err(StorageError::Write);
        }
        let n = self.write_limit.map_or(data.len(), |limit| data.len().min(limit));
        let file = self.files.get_mut(&handle.path).ok_or(StorageError::Write)?;
        let end = handle.pos + n;
        if file.len() < end {
            file.resize(end, 0);
        }
        file[handle.pos..end].copy_from_slice(&data[..n]);
        handle.pos = end;
        self.ops.push(StorageOp::Write(handle.path.clone(), n));
        Ok(n)
    }

    fn seek(&mut self, handle: &mut MemHandle, offset: u32) -> Result<(), StorageError> {
        let len = self.files.get(&handle.path).map_or(0, Vec::len);
        if offset as usize > len {
            return Err(StorageError::Seek);
        }
        handle.pos = offset as usize;
        Ok(())
    }

    fn close(&mut self, handle: MemHandle) -> Result<(), StorageError> {
        self.ops.push(StorageOp::Close(handle.path));
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<(), StorageError> {
        self.ops.push(StorageOp::Remove(path.to_string()));
        self.files.remove(path).map(|_| ()).ok_or(StorageError::NotFound)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), StorageError> {
        self.ops.push(StorageOp::Rename(from.to_string(), to.to_string()));
        if self.fail_renames {
            return Err(StorageError::Write);
        }
        let contents = self.files.remove(from).ok_or(StorageError::NotFound)?;
        self.files.insert(to.to_string(), contents);
        Ok(())
    }

    fn for_each_file(&mut self, visit: &mut dyn FnMut(&str)) -> Result<(), StorageError> {
        for path in self.files.keys() {
            visit(path.trim_start_matches('/'));
        }
        Ok(())
    }

    fn format(&mut self) -> Result<(), StorageError> {
        self.ops.push(StorageOp::Format);
        self.files.clear();
        Ok(())
    }
}

/// Link that records every packet sent
#[derive(Debug, Default)]
pub struct RecordingLink {
    pub sent: Vec<Vec<u8>>,
    pub fail: bool,
}

impl PacketTx for RecordingLink {
    type Error = ();

    fn send(&mut self, packet: &[u8]) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.sent.push(packet.to_vec());
        Ok(())
    }
}

/// Renderer that records placements and shown faces
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub clears: usize,
    pub elements: Vec<ElementPlacement>,
    pub shown: Vec<RenderEntry>,
    /// Reject elements with this id
    pub reject_id: Option<i32>,
}

impl FaceRenderer for RecordingRenderer {
    fn clear_custom_face(&mut self) {
        self.clears += 1;
        self.elements.clear();
    }

    fn register_element(&mut self, element: &ElementPlacement) -> Result<ElementHandle, RenderError> {
        if self.reject_id == Some(element.id) {
            return Err(RenderError::UnknownElement);
        }
        self.elements.push(element.clone());
        Ok(ElementHandle(self.elements.len() as u32))
    }

    fn show_face(&mut self, entry: RenderEntry) {
        self.shown.push(entry);
    }
}

/// Device that records dialogs and restart requests
#[derive(Debug, Default)]
pub struct RecordingDevice {
    pub dialogs: Vec<(String, String)>,
    pub restarts: usize,
}

impl DeviceControl for RecordingDevice {
    fn show_dialog(&mut self, title: &str, message: &str) {
        self.dialogs.push((title.to_string(), message.to_string()));
    }

    fn request_restart(&mut self) {
        self.restarts += 1;
    }
}
