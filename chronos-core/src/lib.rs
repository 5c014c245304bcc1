//! Board-agnostic core logic for the watch-face pipeline
//!
//! This crate contains everything between the radio callback and the
//! rendering engine that does not depend on specific hardware:
//!
//! - Chunk reassembly with double-buffered, acknowledged chunk flushes
//! - Package store that names, writes and classifies received files
//! - Manifest loading into element placements for the rendering engine
//! - Bounded registry of built-in and custom watch faces
//! - Pipeline state machine and the wiring that ties it together
//!
//! ```text
//! link ─▶ ChunkReassembler ─▶ PackageStore ─▶ ManifestLoader ─▶ FaceRegistry
//!              │ ack                                   │
//!              ▼                                       ▼
//!            link                               FaceRenderer
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

// Must come first so the logging macros are visible to every module
#[macro_use]
mod fmt;

pub mod config;
pub mod manifest;
pub mod pipeline;
pub mod registry;
pub mod state;
pub mod traits;
pub mod transfer;

#[cfg(test)]
mod testing;

pub use pipeline::{FacePipeline, PacketOutcome, PipelineError};
