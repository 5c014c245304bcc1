//! Chunk acknowledgement (watch → phone)
//!
//! Sent once per completed chunk; it is the only flow-control signal.
//!
//! ```text
//! [0xB0][0x02][POSITION_HI][POSITION_LO][LAST]
//! ```
//!
//! POSITION is the index of the next chunk the watch expects.

use crate::packet::{PacketError, TAG_CHUNK_HEADER};

/// Acknowledgement packet size
pub const ACK_LEN: usize = 5;

/// Sub-command byte identifying a chunk acknowledgement
pub const ACK_CHUNK_RECEIVED: u8 = 0x02;

/// Acknowledgement of a completed chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChunkAck {
    /// Next expected chunk position
    pub position: u16,
    /// Echo of the completed chunk's last flag
    pub last: bool,
}

impl ChunkAck {
    /// Encode into the fixed wire layout
    pub fn to_bytes(&self) -> [u8; ACK_LEN] {
        let [hi, lo] = self.position.to_be_bytes();
        [TAG_CHUNK_HEADER, ACK_CHUNK_RECEIVED, hi, lo, u8::from(self.last)]
    }

    /// Decode an acknowledgement (phone side)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.is_empty() {
            return Err(PacketError::Empty);
        }
        if bytes.len() < ACK_LEN {
            return Err(PacketError::Truncated);
        }
        if bytes[0] != TAG_CHUNK_HEADER || bytes[1] != ACK_CHUNK_RECEIVED {
            return Err(PacketError::UnexpectedTag);
        }

        Ok(Self {
            position: u16::from_be_bytes([bytes[2], bytes[3]]),
            last: bytes[4] == 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_layout() {
        let ack = ChunkAck {
            position: 1,
            last: false,
        };
        assert_eq!(ack.to_bytes(), [0xB0, 0x02, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_ack_last_and_high_position() {
        let ack = ChunkAck {
            position: 0x0134,
            last: true,
        };
        let bytes = ack.to_bytes();
        assert_eq!(bytes, [0xB0, 0x02, 0x01, 0x34, 0x01]);
        assert_eq!(ChunkAck::from_bytes(&bytes), Ok(ack));
    }

    #[test]
    fn test_ack_rejects_header_packet() {
        // A chunk header shares the tag but not the sub-command
        let header = [0xB0, 0x00, 0x64, 0x00, 0x00];
        assert_eq!(ChunkAck::from_bytes(&header), Err(PacketError::UnexpectedTag));
    }
}
