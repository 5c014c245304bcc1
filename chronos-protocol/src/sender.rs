//! Phone-side package sender
//!
//! Splits a file into chunk headers and data rows and paces them with
//! stop-and-wait flow control: after the last row of a chunk the sender
//! stalls until [`PackageSender::on_ack`] accepts the matching
//! acknowledgement. Used by host tooling and by the pipeline tests to
//! drive the watch side exactly as the companion app does.

use crate::ack::ChunkAck;
use crate::packet::{ChunkHeader, DataRow, PacketError, MAX_ROW_PAYLOAD};

/// What the sender wants to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendStep {
    /// A packet of this many bytes was written to the buffer
    Packet(usize),
    /// Current chunk fully sent; waiting for its acknowledgement
    AwaitAck,
    /// Every chunk has been acknowledged
    Done,
}

/// Stop-and-wait sender for one file
#[derive(Debug, Clone)]
pub struct PackageSender<'a> {
    data: &'a [u8],
    chunk_size: usize,
    row_payload: usize,
    /// Position of the chunk in flight
    position: u16,
    /// Offset of the chunk in flight within `data`
    chunk_start: usize,
    /// Bytes of the chunk in flight already sent as rows
    chunk_sent: usize,
    header_sent: bool,
    awaiting_ack: bool,
    done: bool,
}

impl<'a> PackageSender<'a> {
    /// Create a sender for `data`
    ///
    /// - `chunk_size`: bytes per chunk (the receiver's buffer size caps this)
    /// - `row_payload`: payload bytes per data row (bounded by the link MTU)
    pub fn new(data: &'a [u8], chunk_size: u16, row_payload: u16) -> Result<Self, PacketError> {
        if data.is_empty() || chunk_size == 0 || row_payload == 0 {
            return Err(PacketError::InvalidLength);
        }
        if u32::try_from(data.len()).is_err() {
            return Err(PacketError::InvalidLength);
        }
        if row_payload as usize > MAX_ROW_PAYLOAD {
            return Err(PacketError::PayloadTooLarge);
        }
        // The final acknowledgement carries the chunk count
        let chunks = data.len().div_ceil(chunk_size as usize);
        if chunks > u16::MAX as usize {
            return Err(PacketError::InvalidLength);
        }

        Ok(Self {
            data,
            chunk_size: chunk_size as usize,
            row_payload: row_payload as usize,
            position: 0,
            chunk_start: 0,
            chunk_sent: 0,
            header_sent: false,
            awaiting_ack: false,
            done: false,
        })
    }

    /// Position of the chunk currently in flight
    pub fn position(&self) -> u16 {
        self.position
    }

    /// Check whether every chunk has been acknowledged
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Check whether the sender is stalled on an acknowledgement
    pub fn is_awaiting_ack(&self) -> bool {
        self.awaiting_ack
    }

    fn chunk_len(&self) -> usize {
        self.chunk_size.min(self.data.len() - self.chunk_start)
    }

    fn is_last_chunk(&self) -> bool {
        self.chunk_start + self.chunk_len() == self.data.len()
    }

    /// Produce the next packet into `buffer`
    pub fn next_packet(&mut self, buffer: &mut [u8]) -> Result<SendStep, PacketError> {
        if self.done {
            return Ok(SendStep::Done);
        }
        if self.awaiting_ack {
            return Ok(SendStep::AwaitAck);
        }

        let chunk_len = self.chunk_len();

        if !self.header_sent {
            let header = ChunkHeader {
                chunk_size: chunk_len as u16,
                position: self.position,
                last: self.is_last_chunk(),
                total_size: self.data.len() as u32,
            };
            let len = header.encode(buffer)?;
            self.header_sent = true;
            self.chunk_sent = 0;
            return Ok(SendStep::Packet(len));
        }

        let start = self.chunk_start + self.chunk_sent;
        let take = (chunk_len - self.chunk_sent).min(self.row_payload);
        let len = DataRow::encode(&self.data[start..start + take], buffer)?;

        self.chunk_sent += take;
        if self.chunk_sent == chunk_len {
            self.awaiting_ack = true;
        }

        Ok(SendStep::Packet(len))
    }

    /// Accept an acknowledgement for the chunk in flight
    ///
    /// The acknowledgement must name the next position; anything else is
    /// rejected and leaves the sender stalled.
    pub fn on_ack(&mut self, ack: ChunkAck) -> Result<(), PacketError> {
        if !self.awaiting_ack || ack.position != self.position.wrapping_add(1) {
            return Err(PacketError::UnexpectedAck);
        }

        let last = self.is_last_chunk();
        self.chunk_start += self.chunk_len();
        self.position = self.position.wrapping_add(1);
        self.awaiting_ack = false;
        self.header_sent = false;
        self.chunk_sent = 0;
        self.done = last;

        Ok(())
    }

    /// Resend the chunk in flight from its header
    ///
    /// Call after an acknowledgement timeout. The watch repeats the
    /// acknowledgement of a chunk it already stored, so this also covers
    /// a lost acknowledgement. The final acknowledgement is sent after
    /// the file is closed; if that one is lost, [`Self::restart`].
    pub fn retry_chunk(&mut self) {
        if self.done {
            return;
        }
        self.awaiting_ack = false;
        self.header_sent = false;
        self.chunk_sent = 0;
    }

    /// Restart the whole file from position 0
    pub fn restart(&mut self) {
        self.position = 0;
        self.chunk_start = 0;
        self.chunk_sent = 0;
        self.header_sent = false;
        self.awaiting_ack = false;
        self.done = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Packet;

    #[test]
    fn test_single_chunk_transfer() {
        let data = [7u8; 10];
        let mut sender = PackageSender::new(&data, 16, 4).unwrap();
        let mut buf = [0u8; 32];

        // Header
        let SendStep::Packet(len) = sender.next_packet(&mut buf).unwrap() else {
            panic!("expected header");
        };
        let Packet::Header(header) = Packet::parse(&buf[..len]).unwrap() else {
            panic!("expected header packet");
        };
        assert_eq!(header.chunk_size, 10);
        assert_eq!(header.position, 0);
        assert!(header.last);
        assert_eq!(header.total_size, 10);

        // Rows of 4, 4, 2
        let mut row_sizes = heapless::Vec::<usize, 4>::new();
        while let SendStep::Packet(len) = sender.next_packet(&mut buf).unwrap() {
            let Packet::Data(row) = Packet::parse(&buf[..len]).unwrap() else {
                panic!("expected data row");
            };
            row_sizes.push(row.payload.len()).unwrap();
        }
        assert_eq!(&row_sizes[..], &[4, 4, 2]);
        assert!(sender.is_awaiting_ack());

        sender.on_ack(ChunkAck { position: 1, last: true }).unwrap();
        assert!(sender.is_done());
        assert_eq!(sender.next_packet(&mut buf), Ok(SendStep::Done));
    }

    #[test]
    fn test_stalls_until_ack() {
        let data = [1u8; 8];
        let mut sender = PackageSender::new(&data, 4, 4).unwrap();
        let mut buf = [0u8; 16];

        assert!(matches!(sender.next_packet(&mut buf), Ok(SendStep::Packet(_))));
        assert!(matches!(sender.next_packet(&mut buf), Ok(SendStep::Packet(_))));
        assert_eq!(sender.next_packet(&mut buf), Ok(SendStep::AwaitAck));
        assert_eq!(sender.next_packet(&mut buf), Ok(SendStep::AwaitAck));

        // Wrong position is refused
        assert_eq!(
            sender.on_ack(ChunkAck { position: 2, last: false }),
            Err(PacketError::UnexpectedAck)
        );
        sender.on_ack(ChunkAck { position: 1, last: false }).unwrap();
        assert_eq!(sender.position(), 1);
        assert!(!sender.is_done());
    }

    #[test]
    fn test_retry_resends_header() {
        let data = [1u8; 8];
        let mut sender = PackageSender::new(&data, 4, 4).unwrap();
        let mut buf = [0u8; 16];

        sender.next_packet(&mut buf).unwrap();
        sender.next_packet(&mut buf).unwrap();
        sender.retry_chunk();

        let SendStep::Packet(len) = sender.next_packet(&mut buf).unwrap() else {
            panic!("expected header");
        };
        assert_eq!(buf[0], crate::TAG_CHUNK_HEADER);
        assert_eq!(ChunkHeader::decode(&buf[..len]).unwrap().position, 0);
    }

    #[test]
    fn test_rejects_invalid_sizes() {
        assert_eq!(PackageSender::new(&[], 4, 4).unwrap_err(), PacketError::InvalidLength);
        assert_eq!(PackageSender::new(&[1], 0, 4).unwrap_err(), PacketError::InvalidLength);
        assert_eq!(PackageSender::new(&[1], 4, 0).unwrap_err(), PacketError::InvalidLength);
    }
}
