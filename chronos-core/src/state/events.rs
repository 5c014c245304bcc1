//! Events that trigger state transitions

use super::machine::ErrorKind;

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    // Transfer events
    /// Position-0 header opened a session
    TransferStarted,
    /// Last chunk flushed and acknowledged
    TransferComplete,

    // Install events
    /// Completed manifest handed to the loader
    InstallStarted,
    /// Manifest rendered and registered
    InstallComplete,

    // Face management events
    /// User asked to delete a custom face
    DeleteRequested,
    /// Face files removed; the registry is now stale
    DeleteComplete,
    /// User asked to wipe storage
    ResetRequested,

    // Failure events
    /// Transfer, install or delete failed
    ErrorDetected(ErrorKind),
    /// User dismissed the error dialog
    AcknowledgeError,
}

impl Event {
    /// Check if this event is user-initiated
    pub fn is_user_event(&self) -> bool {
        matches!(
            self,
            Event::DeleteRequested | Event::ResetRequested | Event::AcknowledgeError
        )
    }
}
