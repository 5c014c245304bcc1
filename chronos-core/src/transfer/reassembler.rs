//! Chunk reassembler
//!
//! Stateful interpreter for incoming transfer packets. Headers open or
//! advance the [`TransferSession`]; data rows fill the active chunk
//! buffer. A full chunk is flushed to the [`ChunkSink`] and, once the
//! flush succeeds, acknowledged on the link. The acknowledgement is the
//! only flow control, so a chunk that fails anywhere is never acked and
//! the sender stalls until it restarts the transfer.

use chronos_hal::PacketTx;
use chronos_protocol::{ChunkAck, ChunkHeader, DataRow, Packet, PacketError};

use crate::config::{StoragePath, CHUNK_BUFFER_SIZE};

use super::buffers::ChunkBuffers;
use super::session::{TransferProgress, TransferSession};
use super::store::{CompletedPackage, StoreError};

/// Sequencing and bounds violations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// Packet could not be decoded
    Packet(PacketError),
    /// Data row or non-zero header without an active session
    NoSession,
    /// Header position is not the one expected next
    OutOfOrder { expected: u16, got: u16 },
    /// Header announced a zero-byte chunk
    ZeroChunkSize,
    /// Header announced a chunk larger than the chunk buffer
    ChunkTooLarge { size: u16 },
    /// Header total size differs from the session's
    TotalSizeChanged,
    /// Chunk would run past the declared total size
    ExceedsTotal,
    /// Last chunk does not end exactly at the declared total size
    SizeMismatch,
    /// Data row would overflow the current chunk
    ChunkOverflow,
}

impl From<PacketError> for ProtocolError {
    fn from(e: PacketError) -> Self {
        ProtocolError::Packet(e)
    }
}

/// Everything that can abort a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferError {
    /// Malformed or out-of-sequence packet
    Protocol(ProtocolError),
    /// Package file could not be opened, written or closed
    Store(StoreError),
    /// Acknowledgement could not be sent
    Link,
}

impl From<ProtocolError> for TransferError {
    fn from(e: ProtocolError) -> Self {
        TransferError::Protocol(e)
    }
}

impl From<StoreError> for TransferError {
    fn from(e: StoreError) -> Self {
        TransferError::Store(e)
    }
}

/// Destination for reassembled chunks
///
/// Implemented by the package store; test code uses in-memory sinks.
pub trait ChunkSink {
    /// Open the destination for a new file and return its path
    fn begin_session(&mut self, total_size: u32) -> Result<StoragePath, StoreError>;

    /// Append one complete chunk
    fn flush_chunk(&mut self, data: &[u8]) -> Result<(), StoreError>;

    /// Close the destination after the last chunk
    fn end_session(&mut self) -> Result<CompletedPackage, StoreError>;

    /// Drop a partially received file
    fn abort_session(&mut self);
}

/// Result of one accepted packet
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Progress {
    /// Position-0 header opened a new session
    SessionStarted { total_size: u32 },
    /// Header for the next chunk accepted
    ChunkStarted { position: u16 },
    /// Row stored; chunk not yet full
    Data { bytes_in_chunk: u16 },
    /// Chunk flushed and acknowledged
    ChunkAcked(ChunkAck),
    /// Last chunk flushed, the file closed, then acknowledged
    Complete(CompletedPackage),
    /// Not a transfer command
    Ignored { tag: u8 },
}

/// Packet interpreter owning the transfer session and chunk buffers
pub struct ChunkReassembler {
    session: Option<TransferSession>,
    buffers: ChunkBuffers,
    max_chunk_size: usize,
}

impl ChunkReassembler {
    /// Create a reassembler accepting chunks up to `max_chunk_size` bytes
    ///
    /// The limit is clamped to the chunk buffer size.
    pub fn new(max_chunk_size: usize) -> Self {
        Self {
            session: None,
            buffers: ChunkBuffers::new(),
            max_chunk_size: max_chunk_size.min(CHUNK_BUFFER_SIZE),
        }
    }

    /// The open session, if a transfer is in progress
    pub fn session(&self) -> Option<&TransferSession> {
        self.session.as_ref()
    }

    /// Check if a transfer is in progress
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Progress of the open session
    pub fn progress(&self) -> Option<TransferProgress> {
        self.session.as_ref().map(TransferSession::progress)
    }

    /// Index of the chunk buffer currently accepting rows
    pub fn active_buffer(&self) -> usize {
        self.buffers.active_index()
    }

    /// Drop the open session and the partial file
    pub fn abort(&mut self, sink: &mut impl ChunkSink) {
        if let Some(session) = self.session.take() {
            warn!(
                "Transfer of {} aborted at chunk {}",
                session.target_file_name(),
                session.chunk_position()
            );
        }
        sink.abort_session();
    }

    /// Interpret one raw packet from the link
    ///
    /// Any error aborts the open session; no acknowledgement is sent for
    /// the chunk in progress.
    pub fn on_packet<K, T>(&mut self, bytes: &[u8], sink: &mut K, link: &mut T) -> Result<Progress, TransferError>
    where
        K: ChunkSink,
        T: PacketTx,
    {
        let result = match Packet::parse(bytes) {
            Ok(Packet::Header(header)) => self.on_header(&header, sink),
            Ok(Packet::Data(row)) => self.on_data(row, sink, link),
            Ok(Packet::Other(tag)) => Ok(Progress::Ignored { tag }),
            Err(e) => Err(ProtocolError::from(e).into()),
        };

        if let Err(e) = &result {
            warn!("Transfer error: {:?}", e);
            self.abort(sink);
        }
        result
    }

    fn on_header(&mut self, header: &ChunkHeader, sink: &mut impl ChunkSink) -> Result<Progress, TransferError> {
        if header.chunk_size == 0 {
            return Err(ProtocolError::ZeroChunkSize.into());
        }
        if header.chunk_size as usize > self.max_chunk_size {
            return Err(ProtocolError::ChunkTooLarge {
                size: header.chunk_size,
            }
            .into());
        }

        if header.position == 0 {
            if self.session.is_some() {
                self.abort(sink);
            }
            let file_name = sink.begin_session(header.total_size)?;
            let session = TransferSession::start(header, file_name)?;
            info!(
                "Transfer started: {} ({} bytes)",
                session.target_file_name(),
                header.total_size
            );
            self.session = Some(session);
            return Ok(Progress::SessionStarted {
                total_size: header.total_size,
            });
        }

        let session = self.session.as_mut().ok_or(ProtocolError::NoSession)?;
        session.begin_chunk(header)?;
        trace!("Chunk {} header: {} bytes", header.position, header.chunk_size);
        Ok(Progress::ChunkStarted {
            position: header.position,
        })
    }

    fn on_data<K, T>(&mut self, row: DataRow<'_>, sink: &mut K, link: &mut T) -> Result<Progress, TransferError>
    where
        K: ChunkSink,
        T: PacketTx,
    {
        let session = self.session.as_mut().ok_or(ProtocolError::NoSession)?;

        let len = row.payload.len();
        if session.is_chunk_full() || len > session.remaining_in_chunk() as usize {
            return Err(ProtocolError::ChunkOverflow.into());
        }
        // A replayed chunk is already on storage
        let replaying = session.is_replaying();
        if !replaying && !self.buffers.write(session.bytes_in_chunk() as usize, row.payload) {
            return Err(ProtocolError::ChunkOverflow.into());
        }
        session.record(len as u16);

        if !session.is_chunk_full() {
            return Ok(Progress::Data {
                bytes_in_chunk: session.bytes_in_chunk(),
            });
        }

        if replaying {
            let ack = session.advance();
            debug!("Repeated chunk complete, ack position {} again", ack.position);
            link.send(&ack.to_bytes()).map_err(|_| TransferError::Link)?;
            return Ok(Progress::ChunkAcked(ack));
        }

        // Chunk complete: write it out, then acknowledge
        let chunk_len = session.chunk_size() as usize;
        self.buffers
            .swap_and_flush(chunk_len, |filled| sink.flush_chunk(filled))?;

        let ack = session.advance();
        debug!("Chunk complete, ack position {} last {}", ack.position, ack.last);

        if !ack.last {
            link.send(&ack.to_bytes()).map_err(|_| TransferError::Link)?;
            return Ok(Progress::ChunkAcked(ack));
        }

        // The file is closed before the sender is told it is complete
        let package = sink.end_session()?;
        self.session = None;
        link.send(&ack.to_bytes()).map_err(|_| TransferError::Link)?;
        info!("Transfer complete: {} ({} bytes)", package.path.as_str(), package.size);
        Ok(Progress::Complete(package))
    }
}
