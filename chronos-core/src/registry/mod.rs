//! Face registry
//!
//! Bounded table of installed faces, built-in and custom.

pub mod descriptor;
pub mod table;

pub use descriptor::{face_name, FaceEntry, FaceKind, WatchFaceDescriptor};
pub use table::{FaceRegistry, RegistryError};
