//! Device control trait

/// Device-level side effects the pipeline may request
///
/// Both calls are fire-and-forget: a dialog is shown on top of whatever
/// screen is active, and a restart request never returns on hardware.
pub trait DeviceControl {
    /// Show a modal message dialog
    fn show_dialog(&mut self, title: &str, message: &str);

    /// Restart the device
    fn request_restart(&mut self);
}
