//! Camera capability boundary
//!
//! The host environment supplies camera access through [`CameraBackend`].
//! A granted [`CameraStream`] owns its media tracks and the video sink they
//! are attached to; only the [`CameraResourceManager`](super::CameraResourceManager)
//! ever holds one.

use crate::error::CameraError;
use crate::scan::frame::FrameBuffer;
use async_trait::async_trait;
use rck_common::config::{FacingMode, ScannerConfig};

/// Video-only capture request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConstraints {
    /// Preferred camera direction; `None` lets the host pick its default
    pub facing_mode: Option<FacingMode>,
    /// Nominal width hint (ideal, not exact)
    pub ideal_width: u32,
    /// Nominal height hint (ideal, not exact)
    pub ideal_height: u32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self::from(&ScannerConfig::default())
    }
}

impl From<&ScannerConfig> for CaptureConstraints {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            facing_mode: Some(config.facing_mode),
            ideal_width: config.ideal_width,
            ideal_height: config.ideal_height,
        }
    }
}

impl CaptureConstraints {
    /// Same request without a facing mode (desktop cameras)
    pub fn without_facing_mode(&self) -> Self {
        Self {
            facing_mode: None,
            ..self.clone()
        }
    }
}

/// Host camera capability
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Whether the host exposes camera capture at all
    fn is_supported(&self) -> bool {
        true
    }

    /// Request a stream matching `constraints`
    async fn open(
        &self,
        constraints: &CaptureConstraints,
    ) -> std::result::Result<Box<dyn CameraStream>, CameraError>;
}

/// A granted capture stream bound to its video sink
#[async_trait]
pub trait CameraStream: Send {
    /// Start playback on the sink; some hosts reject the first attempt
    async fn start(&mut self) -> std::result::Result<(), CameraError>;

    /// Whether the sink has buffered enough data for a full frame
    fn has_enough_data(&self) -> bool;

    /// Native resolution of the current frame (0x0 before the first frame)
    fn frame_size(&self) -> (u32, u32);

    /// Copy the current frame into `buffer`, already sized to `frame_size()`
    ///
    /// Returns false if no frame could be copied.
    fn read_frame(&mut self, buffer: &mut FrameBuffer) -> bool;

    /// Stop every media track and detach the sink; must be idempotent
    fn stop(&mut self);

    /// Whether the video track exposes a torch
    fn supports_torch(&self) -> bool {
        false
    }

    /// Switch the torch on or off
    async fn set_torch(&mut self, _on: bool) -> std::result::Result<(), CameraError> {
        Err(CameraError::UnsupportedConstraints)
    }
}

/// Backend for hosts without any camera capability
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCameraBackend;

#[async_trait]
impl CameraBackend for NoCameraBackend {
    fn is_supported(&self) -> bool {
        false
    }

    async fn open(
        &self,
        _constraints: &CaptureConstraints,
    ) -> std::result::Result<Box<dyn CameraStream>, CameraError> {
        Err(CameraError::NoCamera)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraints_from_config() {
        let constraints = CaptureConstraints::default();
        assert_eq!(constraints.facing_mode, Some(FacingMode::Environment));
        assert_eq!((constraints.ideal_width, constraints.ideal_height), (1280, 720));

        let relaxed = constraints.without_facing_mode();
        assert_eq!(relaxed.facing_mode, None);
        assert_eq!(relaxed.ideal_width, 1280);
    }

    #[tokio::test]
    async fn test_no_camera_backend() {
        let backend = NoCameraBackend;
        assert!(!backend.is_supported());
        let result = backend.open(&CaptureConstraints::default()).await;
        assert!(matches!(result, Err(CameraError::NoCamera)));
    }
}
