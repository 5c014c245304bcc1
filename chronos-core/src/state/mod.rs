//! Pipeline state machine
//!
//! A single state drives what the pipeline accepts and whether the UI
//! tick may run.

pub mod events;
pub mod machine;

pub use events::Event;
pub use machine::{ErrorKind, State};
