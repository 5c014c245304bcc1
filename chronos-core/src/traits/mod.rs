//! Capability traits
//!
//! These traits define the interface between the pipeline and the parts
//! of the firmware it drives but does not own: the rendering engine and
//! the device itself (dialogs, restart).

pub mod device;
pub mod render;

pub use device::DeviceControl;
pub use render::{ElementHandle, ElementPlacement, FaceRenderer, PreviewAsset, RenderEntry, RenderError};
