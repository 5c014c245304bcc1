//! Double chunk buffer
//!
//! Two fixed buffers used alternately: incoming rows land in the active
//! one while the other holds the chunk being written to storage.

use crate::config::CHUNK_BUFFER_SIZE;

/// Two alternating chunk buffers selected by a single index
pub struct ChunkBuffers {
    buffers: [[u8; CHUNK_BUFFER_SIZE]; 2],
    active: usize,
}

impl Default for ChunkBuffers {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkBuffers {
    /// Create zeroed buffers with buffer 0 active
    pub const fn new() -> Self {
        Self {
            buffers: [[0; CHUNK_BUFFER_SIZE]; 2],
            active: 0,
        }
    }

    /// Index (0 or 1) of the buffer currently accepting rows
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Copy `data` into the active buffer at `offset`
    ///
    /// Returns `false` without copying if it would not fit.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> bool {
        let Some(end) = offset.checked_add(data.len()) else {
            return false;
        };
        if end > CHUNK_BUFFER_SIZE {
            return false;
        }
        self.buffers[self.active][offset..end].copy_from_slice(data);
        true
    }

    /// Retire the active buffer and hand its first `len` bytes to `flush`
    ///
    /// The other buffer becomes active before `flush` runs. The filled
    /// buffer is only reachable through the shared slice for the duration
    /// of the call, so nothing can write into it while it is flushing.
    pub fn swap_and_flush<R>(&mut self, len: usize, flush: impl FnOnce(&[u8]) -> R) -> R {
        let filled = self.active;
        self.active ^= 1;
        let len = len.min(CHUNK_BUFFER_SIZE);
        flush(&self.buffers[filled][..len])
    }
}
