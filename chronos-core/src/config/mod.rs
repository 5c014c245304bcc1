//! Configuration
//!
//! Build-time capacities and the runtime pipeline configuration.

pub mod limits;
pub mod types;

pub use limits::*;
pub use types::*;
