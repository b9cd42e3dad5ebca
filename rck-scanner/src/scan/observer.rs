//! Scan loop listener interface

use crate::error::CameraError;

/// Receives scan loop output
///
/// Callbacks run on the scan loop task and must not block; anything slow
/// is spawned.
pub trait ScanObserver: Send + Sync {
    /// A non-empty decode result; the loop is already paused
    fn on_decode_result(&self, payload: String);

    /// Camera acquisition failed after all retries
    fn on_camera_error(&self, error: &CameraError);

    /// A cycle is about to run (frame available or not)
    fn on_cycle_tick(&self) {}
}
