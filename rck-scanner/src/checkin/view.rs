//! Presentation boundary
//!
//! The check-in path renders through [`CheckinView`]. Every call that
//! happens after a suspension point is gated on [`CheckinView::is_mounted`]
//! by the caller: a submission that completes after the runner left the
//! scanner screen still updates the state machine, but draws nothing.

use rck_common::api::CheckinReceipt;
use rck_common::events::{CameraStatus, NavigationTarget};

/// Shown for payloads that fail the token grammar
pub const FORMAT_ERROR_MESSAGE: &str =
    "Invalid QR code.\nPlease scan the QR code posted at a check-in point.";

/// Shown when manual entry is submitted empty
pub const EMPTY_MANUAL_INPUT_MESSAGE: &str = "Please enter a QR payload";

/// Shown when an uploaded image has no readable code
pub const NO_QR_IN_IMAGE_MESSAGE: &str = "No QR code found in image";

/// Scanner screen as seen by the pipeline
pub trait CheckinView: Send + Sync {
    /// Whether the scanner screen is still on display
    fn is_mounted(&self) -> bool;

    /// Update the camera status indicator
    fn set_camera_status(&self, status: CameraStatus, message: &str);

    /// Show or hide the "checking in" spinner
    fn show_submitting(&self, visible: bool);

    /// Result overlay: payload rejected by the validator
    fn show_format_error(&self, message: &str);

    /// Result overlay: BIB number and runner name
    fn show_success(&self, receipt: &CheckinReceipt);

    /// Result overlay: server (or transport) message, verbatim
    fn show_failure(&self, message: &str);

    /// Hide the result overlay
    fn clear_result(&self);

    /// Transient warning toast
    fn show_warning(&self, message: &str);

    /// Transient info toast
    fn show_notice(&self, _message: &str) {}

    /// Leave the scanner screen
    fn navigate(&self, target: &NavigationTarget);
}

/// View that renders nothing; used when running headless
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedView;

impl CheckinView for DetachedView {
    fn is_mounted(&self) -> bool {
        false
    }
    fn set_camera_status(&self, _status: CameraStatus, _message: &str) {}
    fn show_submitting(&self, _visible: bool) {}
    fn show_format_error(&self, _message: &str) {}
    fn show_success(&self, _receipt: &CheckinReceipt) {}
    fn show_failure(&self, _message: &str) {}
    fn clear_result(&self) {}
    fn show_warning(&self, _message: &str) {}
    fn navigate(&self, _target: &NavigationTarget) {}
}
