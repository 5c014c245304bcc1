//! Chronos Hardware Abstraction Layer
//!
//! This crate defines the traits the watch-face pipeline needs from the
//! board: a flat file store on the internal flash partition, and the link
//! that carries outgoing packets back to the phone. Chip-specific HALs
//! (ESP32-C3, ESP32-S3) implement them; host tests use in-memory doubles.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (chronos-core pipeline)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  chronos-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │   FAT flash   │       │  BLE notify   │
//! │   partition   │       │ characteristic│
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`storage::FileStorage`] - Flat named-file storage
//! - [`link::PacketTx`] - Outgoing packet transport

#![no_std]
#![deny(unsafe_code)]

pub mod link;
pub mod storage;

// Re-export key traits at crate root for convenience
pub use link::PacketTx;
pub use storage::{FileStorage, OpenMode, StorageError};
