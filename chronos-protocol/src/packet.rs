//! Packet encoding and decoding for the package transfer protocol.
//!
//! Chunk header (phone → watch):
//! - TAG (1 byte): 0xB0
//! - CHUNK SIZE (2 bytes, big-endian): bytes in this chunk
//! - POSITION (2 bytes, big-endian): chunk index, 0 starts a new transfer
//! - RESERVED (2 bytes)
//! - LAST (1 byte): 1 when this is the final chunk
//! - TOTAL SIZE (4 bytes, big-endian): size of the whole file
//!
//! Data row (phone → watch):
//! - TAG (1 byte): 0xAF
//! - ROW LENGTH (2 bytes, big-endian): payload length + 5
//! - RESERVED (2 bytes)
//! - PAYLOAD (ROW LENGTH - 5 bytes)

/// Chunk header tag (also used by the acknowledgement)
pub const TAG_CHUNK_HEADER: u8 = 0xB0;

/// Chunk data row tag
pub const TAG_CHUNK_DATA: u8 = 0xAF;

/// Complete header packet size
pub const HEADER_LEN: usize = 12;

/// Fixed row header counted by the ROW LENGTH field (tag, length, reserved)
pub const ROW_HEADER_LEN: usize = 5;

/// Largest payload a single row can describe
pub const MAX_ROW_PAYLOAD: usize = u16::MAX as usize - ROW_HEADER_LEN;

/// Errors that can occur during packet parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Zero-length packet
    Empty,
    /// Packet is shorter than its fixed fields or its declared row length
    Truncated,
    /// ROW LENGTH is smaller than the row header it includes
    RowTooShort,
    /// Packet has the wrong tag or sub-command for the requested decode
    UnexpectedTag,
    /// Payload exceeds what a row can describe
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
    /// Chunk or row size of zero, or a file too large to describe
    InvalidLength,
    /// Acknowledgement does not match the chunk in flight
    UnexpectedAck,
}

/// Chunk header metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChunkHeader {
    /// Bytes expected in this chunk
    pub chunk_size: u16,
    /// 0-based chunk sequence index
    pub position: u16,
    /// Final chunk of the file
    pub last: bool,
    /// Size of the whole file
    pub total_size: u32,
}

impl ChunkHeader {
    /// Decode a header packet, tag included
    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        match bytes.first() {
            None => return Err(PacketError::Empty),
            Some(&TAG_CHUNK_HEADER) => {}
            Some(_) => return Err(PacketError::UnexpectedTag),
        }
        if bytes.len() < HEADER_LEN {
            return Err(PacketError::Truncated);
        }

        Ok(Self {
            chunk_size: u16::from_be_bytes([bytes[1], bytes[2]]),
            position: u16::from_be_bytes([bytes[3], bytes[4]]),
            // bytes 5 and 6 are reserved
            last: bytes[7] == 1,
            total_size: u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        })
    }

    /// Encode this header into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, PacketError> {
        if buffer.len() < HEADER_LEN {
            return Err(PacketError::BufferTooSmall);
        }

        buffer[0] = TAG_CHUNK_HEADER;
        buffer[1..3].copy_from_slice(&self.chunk_size.to_be_bytes());
        buffer[3..5].copy_from_slice(&self.position.to_be_bytes());
        buffer[5] = 0;
        buffer[6] = 0;
        buffer[7] = u8::from(self.last);
        buffer[8..12].copy_from_slice(&self.total_size.to_be_bytes());

        Ok(HEADER_LEN)
    }
}

/// One row of chunk data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataRow<'a> {
    /// Row payload (ROW LENGTH - 5 bytes)
    pub payload: &'a [u8],
}

impl<'a> DataRow<'a> {
    /// Decode a data row packet, tag included
    ///
    /// Bytes past the declared row length are ignored.
    pub fn decode(bytes: &'a [u8]) -> Result<Self, PacketError> {
        match bytes.first() {
            None => return Err(PacketError::Empty),
            Some(&TAG_CHUNK_DATA) => {}
            Some(_) => return Err(PacketError::UnexpectedTag),
        }
        if bytes.len() < ROW_HEADER_LEN {
            return Err(PacketError::Truncated);
        }

        let row_len = u16::from_be_bytes([bytes[1], bytes[2]]) as usize;
        if row_len < ROW_HEADER_LEN {
            return Err(PacketError::RowTooShort);
        }
        if bytes.len() < row_len {
            return Err(PacketError::Truncated);
        }

        Ok(Self {
            payload: &bytes[ROW_HEADER_LEN..row_len],
        })
    }

    /// Encode a row carrying `payload` into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(payload: &[u8], buffer: &mut [u8]) -> Result<usize, PacketError> {
        if payload.len() > MAX_ROW_PAYLOAD {
            return Err(PacketError::PayloadTooLarge);
        }
        let row_len = ROW_HEADER_LEN + payload.len();
        if buffer.len() < row_len {
            return Err(PacketError::BufferTooSmall);
        }

        buffer[0] = TAG_CHUNK_DATA;
        buffer[1..3].copy_from_slice(&(row_len as u16).to_be_bytes());
        buffer[3] = 0;
        buffer[4] = 0;
        buffer[ROW_HEADER_LEN..row_len].copy_from_slice(payload);

        Ok(row_len)
    }
}

/// A decoded incoming packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Packet<'a> {
    /// Chunk metadata
    Header(ChunkHeader),
    /// Chunk payload row
    Data(DataRow<'a>),
    /// Any other command; the raw link carries more than transfers
    Other(u8),
}

impl<'a> Packet<'a> {
    /// Dispatch on the command tag and decode the packet
    pub fn parse(bytes: &'a [u8]) -> Result<Self, PacketError> {
        match bytes.first() {
            None => Err(PacketError::Empty),
            Some(&TAG_CHUNK_HEADER) => ChunkHeader::decode(bytes).map(Packet::Header),
            Some(&TAG_CHUNK_DATA) => DataRow::decode(bytes).map(Packet::Data),
            Some(&tag) => Ok(Packet::Other(tag)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_decode() {
        // chunkSize=100, pos=0, last=0, total=250
        let bytes = [0xB0, 0x00, 0x64, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFA];
        let header = ChunkHeader::decode(&bytes).unwrap();

        assert_eq!(header.chunk_size, 100);
        assert_eq!(header.position, 0);
        assert!(!header.last);
        assert_eq!(header.total_size, 250);
    }

    #[test]
    fn test_header_last_flag_only_one() {
        let mut bytes = [0xB0, 0, 1, 0, 3, 0, 0, 1, 0, 0, 1, 0];
        assert!(ChunkHeader::decode(&bytes).unwrap().last);

        bytes[7] = 2;
        assert!(!ChunkHeader::decode(&bytes).unwrap().last);
    }

    #[test]
    fn test_header_big_endian_fields() {
        let bytes = [0xB0, 0x04, 0x00, 0x01, 0x02, 0xEE, 0xEE, 0x00, 0x01, 0x02, 0x03, 0x04];
        let header = ChunkHeader::decode(&bytes).unwrap();

        assert_eq!(header.chunk_size, 1024);
        assert_eq!(header.position, 258);
        assert_eq!(header.total_size, 0x0102_0304);
    }

    #[test]
    fn test_header_truncated() {
        let bytes = [0xB0, 0x00, 0x64, 0x00];
        assert_eq!(ChunkHeader::decode(&bytes), Err(PacketError::Truncated));
    }

    #[test]
    fn test_header_encode() {
        let header = ChunkHeader {
            chunk_size: 512,
            position: 7,
            last: true,
            total_size: 70_000,
        };
        let mut buffer = [0xFFu8; 16];
        let len = header.encode(&mut buffer).unwrap();

        assert_eq!(len, HEADER_LEN);
        assert_eq!(&buffer[..HEADER_LEN], &[0xB0, 0x02, 0x00, 0x00, 0x07, 0, 0, 1, 0x00, 0x01, 0x11, 0x70]);
        assert_eq!(ChunkHeader::decode(&buffer[..len]).unwrap(), header);
    }

    #[test]
    fn test_row_decode_subtracts_row_header() {
        let bytes = [0xAF, 0x00, 0x08, 0x00, 0x00, b'a', b'b', b'c'];
        let row = DataRow::decode(&bytes).unwrap();
        assert_eq!(row.payload, b"abc");
    }

    #[test]
    fn test_row_ignores_trailing_bytes() {
        let bytes = [0xAF, 0x00, 0x06, 0x00, 0x00, 0x11, 0x22, 0x33];
        let row = DataRow::decode(&bytes).unwrap();
        assert_eq!(row.payload, &[0x11]);
    }

    #[test]
    fn test_row_too_short() {
        let bytes = [0xAF, 0x00, 0x04, 0x00, 0x00];
        assert_eq!(DataRow::decode(&bytes), Err(PacketError::RowTooShort));
    }

    #[test]
    fn test_row_truncated_payload() {
        let bytes = [0xAF, 0x00, 0x0A, 0x00, 0x00, 1, 2];
        assert_eq!(DataRow::decode(&bytes), Err(PacketError::Truncated));
    }

    #[test]
    fn test_row_empty_payload() {
        let bytes = [0xAF, 0x00, 0x05, 0x00, 0x00];
        assert!(DataRow::decode(&bytes).unwrap().payload.is_empty());
    }

    #[test]
    fn test_row_encode_buffer_too_small() {
        let mut buffer = [0u8; 6];
        assert_eq!(DataRow::encode(&[1, 2, 3], &mut buffer), Err(PacketError::BufferTooSmall));
    }

    #[test]
    fn test_parse_dispatch() {
        let header = [0xB0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 1];
        let row = [0xAF, 0, 6, 0, 0, 42];

        assert!(matches!(Packet::parse(&header), Ok(Packet::Header(_))));
        assert!(matches!(Packet::parse(&row), Ok(Packet::Data(DataRow { payload: &[42] }))));
        assert_eq!(Packet::parse(&[0xAB, 0x00]), Ok(Packet::Other(0xAB)));
        assert_eq!(Packet::parse(&[]), Err(PacketError::Empty));
    }
}
