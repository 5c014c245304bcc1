//! Transfer session state
//!
//! One session exists per file being received. It is created by the
//! position-0 header and ends when the last chunk has been flushed and
//! acknowledged, or when any error aborts it.
//!
//! A header for the chunk acknowledged last means the sender never saw
//! that acknowledgement. The chunk is replayed: its rows are counted but
//! not stored again, and the acknowledgement is repeated once it is full.

use chronos_protocol::{ChunkAck, ChunkHeader};

use crate::config::StoragePath;

use super::reassembler::ProtocolError;

/// Progress of the active transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferProgress {
    /// Payload bytes received so far
    pub received: u32,
    /// Declared file size
    pub total: u32,
}

/// Counters and metadata of the file being received
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferSession {
    /// Declared file size, fixed by the position-0 header
    total_size: u32,
    /// Bytes expected in the current chunk
    chunk_size: u16,
    /// Position of the current chunk; after an ack, the next expected one
    chunk_position: u16,
    /// Current chunk is the final one
    is_last_chunk: bool,
    /// Bytes received into the current chunk
    bytes_in_chunk: u16,
    /// Bytes received over the whole session
    bytes_total: u32,
    /// Bytes of acknowledged chunks; a retried chunk rolls back to this
    committed_total: u32,
    /// Size of the chunk acknowledged last, 0 before the first ack
    acked_size: u16,
    /// Current chunk repeats the one acknowledged last
    replaying: bool,
    /// Storage path derived from the total size
    target_file_name: StoragePath,
}

impl TransferSession {
    /// Start a session from a position-0 header
    pub(crate) fn start(header: &ChunkHeader, target_file_name: StoragePath) -> Result<Self, ProtocolError> {
        let mut session = Self {
            total_size: header.total_size,
            chunk_size: 0,
            chunk_position: 0,
            is_last_chunk: false,
            bytes_in_chunk: 0,
            bytes_total: 0,
            committed_total: 0,
            acked_size: 0,
            replaying: false,
            target_file_name,
        };
        session.begin_chunk(header)?;
        Ok(session)
    }

    /// Accept the header of the next chunk, or a repeat of the current one
    ///
    /// A repeated position is a sender retry and restarts the chunk. The
    /// position before it, with the size last acknowledged, is a replay.
    pub(crate) fn begin_chunk(&mut self, header: &ChunkHeader) -> Result<(), ProtocolError> {
        if self.repeats_acked_chunk(header) {
            self.chunk_size = header.chunk_size;
            self.is_last_chunk = false;
            self.bytes_in_chunk = 0;
            self.bytes_total = self.committed_total;
            self.replaying = true;
            return Ok(());
        }
        if header.position != self.chunk_position {
            return Err(ProtocolError::OutOfOrder {
                expected: self.chunk_position,
                got: header.position,
            });
        }
        if header.total_size != self.total_size {
            return Err(ProtocolError::TotalSizeChanged);
        }

        let end = self.committed_total as u64 + header.chunk_size as u64;
        if end > self.total_size as u64 {
            return Err(ProtocolError::ExceedsTotal);
        }
        if header.last && end != self.total_size as u64 {
            return Err(ProtocolError::SizeMismatch);
        }

        self.chunk_size = header.chunk_size;
        self.is_last_chunk = header.last;
        self.bytes_in_chunk = 0;
        self.bytes_total = self.committed_total;
        self.replaying = false;
        Ok(())
    }

    fn repeats_acked_chunk(&self, header: &ChunkHeader) -> bool {
        self.acked_size != 0
            && header.position == self.chunk_position.wrapping_sub(1)
            && header.chunk_size == self.acked_size
            && header.total_size == self.total_size
            && !header.last
    }

    /// Record `len` payload bytes received into the current chunk
    pub(crate) fn record(&mut self, len: u16) {
        self.bytes_in_chunk += len;
        if !self.replaying {
            self.bytes_total += len as u32;
        }
    }

    /// Close the current chunk and build its acknowledgement
    ///
    /// Closing a replayed chunk repeats the acknowledgement already sent.
    pub(crate) fn advance(&mut self) -> ChunkAck {
        if self.replaying {
            self.replaying = false;
        } else {
            self.chunk_position = self.chunk_position.wrapping_add(1);
            self.committed_total = self.bytes_total;
            self.acked_size = self.chunk_size;
        }
        ChunkAck {
            position: self.chunk_position,
            last: self.is_last_chunk,
        }
    }

    /// Declared file size
    pub fn total_size(&self) -> u32 {
        self.total_size
    }

    /// Bytes expected in the current chunk
    pub fn chunk_size(&self) -> u16 {
        self.chunk_size
    }

    /// Current chunk was already stored and acknowledged
    pub fn is_replaying(&self) -> bool {
        self.replaying
    }

    /// Current (or, after an ack, next expected) chunk position
    pub fn chunk_position(&self) -> u16 {
        self.chunk_position
    }

    /// Current chunk is the final one
    pub fn is_last_chunk(&self) -> bool {
        self.is_last_chunk
    }

    /// Bytes received into the current chunk
    pub fn bytes_in_chunk(&self) -> u16 {
        self.bytes_in_chunk
    }

    /// Bytes received over the whole session
    pub fn bytes_total(&self) -> u32 {
        self.bytes_total
    }

    /// Room left in the current chunk
    pub fn remaining_in_chunk(&self) -> u16 {
        self.chunk_size - self.bytes_in_chunk
    }

    /// Current chunk has received exactly `chunk_size` bytes
    pub fn is_chunk_full(&self) -> bool {
        self.bytes_in_chunk == self.chunk_size
    }

    /// Storage path of the file being written
    pub fn target_file_name(&self) -> &str {
        &self.target_file_name
    }

    /// Snapshot of overall progress
    pub fn progress(&self) -> TransferProgress {
        TransferProgress {
            received: self.bytes_total,
            total: self.total_size,
        }
    }
}
