//! State machine definition
//!
//! Transfers, installs and deletes are mutually exclusive; the UI tick is
//! suspended while the chunk buffers and the package file are in use.

use super::events::Event;

/// Pipeline states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Waiting for a transfer or a user request
    Idle,
    /// Transfer session open
    Receiving,
    /// Completed manifest being rendered and registered
    Installing,
    /// Custom face files being removed
    Deleting,
    /// Storage changed under the registry; waiting for the restart
    RestartPending,
    /// Last operation failed; dialog shown
    Error(ErrorKind),
}

/// What failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorKind {
    /// Malformed or out-of-sequence packet
    Protocol,
    /// Storage open, write, close or remove failed
    Storage,
    /// Manifest could not be parsed
    Parse,
    /// Acknowledgement could not be sent
    Link,
}

impl State {
    /// Check if the periodic UI tick may run
    pub fn ui_tick_allowed(&self) -> bool {
        !matches!(self, State::Receiving)
    }

    /// Check if an operation is in progress
    pub fn is_busy(&self) -> bool {
        matches!(self, State::Receiving | State::Installing | State::Deleting)
    }

    /// Check if this is an error state
    pub fn is_error(&self) -> bool {
        matches!(self, State::Error(_))
    }

    /// Process an event and return the next state
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use State::*;

        match (self, event) {
            // Nothing leaves RestartPending but the restart itself
            (RestartPending, _) => RestartPending,

            (_, ResetRequested) => RestartPending,

            // Idle transitions
            (Idle, TransferStarted) => Receiving,
            (Idle, InstallStarted) => Installing,
            (Idle, DeleteRequested) => Deleting,

            // Receiving transitions; a new position-0 header restarts
            (Receiving, TransferStarted) => Receiving,
            (Receiving, TransferComplete) => Idle,
            (Receiving, ErrorDetected(kind)) => Error(kind),

            // Installing transitions
            (Installing, InstallComplete) => Idle,
            (Installing, ErrorDetected(kind)) => Error(kind),

            // Deleting transitions
            (Deleting, DeleteComplete) => RestartPending,
            (Deleting, ErrorDetected(kind)) => Error(kind),

            // Error transitions; the sender may retry without waiting
            (Error(_), AcknowledgeError) => Idle,
            (Error(_), TransferStarted) => Receiving,
            (Error(_), InstallStarted) => Installing,
            (Error(_), DeleteRequested) => Deleting,

            // Default: stay in current state
            _ => self,
        }
    }
}
