//! Error types for rck-scanner
//!
//! Camera and submission failures are typed so each layer can turn them into
//! a user-facing string at its own boundary. Decode misses are not errors and
//! have no variant here.

use thiserror::Error;

/// Camera acquisition failure kinds
///
/// Each kind maps to a distinct user-facing message via [`CameraError::user_message`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// User or host denied camera permission
    #[error("camera permission denied")]
    PermissionDenied,

    /// No video input device present
    #[error("no camera found")]
    NoCamera,

    /// Device exists but another application holds it
    #[error("camera is busy")]
    CameraBusy,

    /// Requested facing mode / resolution cannot be satisfied
    #[error("unsupported camera constraints")]
    UnsupportedConstraints,

    /// Host refuses camera access outside a secure context
    #[error("insecure context")]
    InsecureContext,

    /// Anything the host reports that is not classified above
    #[error("camera error: {0}")]
    Unknown(String),
}

impl CameraError {
    /// Classify a host-reported error by its name
    ///
    /// Names follow the media-capture error names hosts report
    /// (`NotAllowedError`, `NotFoundError`, ...).
    pub fn from_host_error(name: &str, message: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" => CameraError::PermissionDenied,
            "NotFoundError" | "DevicesNotFoundError" => CameraError::NoCamera,
            "NotReadableError" | "TrackStartError" | "AbortError" => CameraError::CameraBusy,
            "OverconstrainedError" | "ConstraintNotSatisfiedError" => {
                CameraError::UnsupportedConstraints
            }
            "SecurityError" => CameraError::InsecureContext,
            _ if message.is_empty() => CameraError::Unknown(name.to_string()),
            _ => CameraError::Unknown(message.to_string()),
        }
    }

    /// Message shown in the camera status line
    pub fn user_message(&self) -> String {
        match self {
            CameraError::PermissionDenied => {
                "Camera access was not allowed. Please enable camera permission in Settings."
                    .to_string()
            }
            CameraError::NoCamera => "No camera was found on this device.".to_string(),
            CameraError::CameraBusy => {
                "The camera is being used by another application.".to_string()
            }
            CameraError::UnsupportedConstraints => {
                "The requested camera resolution is not supported.".to_string()
            }
            CameraError::InsecureContext => {
                "Camera access requires a secure (HTTPS) connection.".to_string()
            }
            CameraError::Unknown(detail) => format!("Camera error: {}", detail),
        }
    }
}

/// Check-in submission failure
///
/// `Display` output is what the runner sees; business rejections carry the
/// server message verbatim.
#[derive(Error, Debug)]
pub enum SubmissionError {
    /// Server processed the request and refused it ("already checked in", ...)
    #[error("{0}")]
    Rejected(String),

    /// Non-2xx transport response
    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    /// Request never completed
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response could not be interpreted
    #[error("Unexpected response: {0}")]
    Malformed(String),

    /// No runner session token configured
    #[error("No LINE token")]
    MissingToken,
}

/// Main error type for rck-scanner
#[derive(Error, Debug)]
pub enum Error {
    /// Camera acquisition failed after all retries
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    /// Host has no camera capability at all
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    /// Check-in submission failed
    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    /// Still image could not be read
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Frame buffer shape mismatch
    #[error("Frame error: {0}")]
    Frame(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors from the shared library
    #[error(transparent)]
    Common(#[from] rck_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using rck-scanner Error
pub type Result<T> = std::result::Result<T, Error>;
