//! Watch-Face Package Transfer Protocol
//!
//! This crate defines the packet format the companion phone app uses to
//! push a watch-face package to the watch over BLE. The link MTU is small,
//! so a file is split into numbered chunks, and each chunk into rows:
//!
//! ```text
//! phone                                   watch
//!   │ ── 0xB0 header {size, pos=0, total} ──▶ │
//!   │ ── 0xAF row ──────────────────────────▶ │
//!   │ ── 0xAF row ──────────────────────────▶ │  chunk full
//!   │ ◀──────────────── 0xB0 0x02 ack pos=1 ─ │
//!   │ ── 0xB0 header {size, pos=1, total} ──▶ │
//!   │            ...                          │
//! ```
//!
//! Flow control is stop-and-wait: the phone never sends the next header
//! before the acknowledgement for the current chunk arrives.

#![no_std]
#![deny(unsafe_code)]

pub mod ack;
pub mod packet;
pub mod sender;

pub use ack::{ChunkAck, ACK_LEN};
pub use packet::{ChunkHeader, DataRow, Packet, PacketError, TAG_CHUNK_DATA, TAG_CHUNK_HEADER};
pub use sender::{PackageSender, SendStep};
