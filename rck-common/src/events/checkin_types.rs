//! Check-in pipeline type definitions
//!
//! Supporting types for the check-in state machine, camera status indicator
//! and scan suppression.

use serde::{Deserialize, Serialize};

/// Check-in orchestrator state
///
/// `Scanning → Validating → Submitting → (Success | Failure) → Scanning`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckinState {
    /// Waiting for a payload (camera loop may be running)
    Scanning,
    /// Payload received, grammar check in progress
    Validating,
    /// Exactly one request in flight to the check-in boundary
    Submitting,
    /// Boundary accepted the check-in
    Success,
    /// Boundary rejected the check-in or the request failed
    Failure,
}

impl std::fmt::Display for CheckinState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckinState::Scanning => write!(f, "scanning"),
            CheckinState::Validating => write!(f, "validating"),
            CheckinState::Submitting => write!(f, "submitting"),
            CheckinState::Success => write!(f, "success"),
            CheckinState::Failure => write!(f, "failure"),
        }
    }
}

/// Camera status indicator shown next to the viewfinder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraStatus {
    /// Requesting permission / opening the stream
    Loading,
    /// Stream live, frames flowing
    Active,
    /// Reading a QR code from an uploaded image
    Scanning,
    /// Camera unusable; manual entry and upload remain available
    Error,
}

impl std::fmt::Display for CameraStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraStatus::Loading => write!(f, "loading"),
            CameraStatus::Active => write!(f, "active"),
            CameraStatus::Scanning => write!(f, "scanning"),
            CameraStatus::Error => write!(f, "error"),
        }
    }
}

/// Why a decode result was not forwarded to the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    /// Any payload inside the blanket cooldown
    Cooldown,
    /// Same payload inside the longer same-payload window
    SamePayload,
    /// A check-in attempt is already in transit
    Busy,
}

impl std::fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuppressReason::Cooldown => write!(f, "cooldown"),
            SuppressReason::SamePayload => write!(f, "same_payload"),
            SuppressReason::Busy => write!(f, "busy"),
        }
    }
}

/// Where a payload entered the check-in path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadSource {
    /// Live camera scan loop
    Camera,
    /// Typed or pasted by the user
    Manual,
    /// Single-shot decode of an uploaded still image
    Upload,
}

impl std::fmt::Display for PayloadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadSource::Camera => write!(f, "camera"),
            PayloadSource::Manual => write!(f, "manual"),
            PayloadSource::Upload => write!(f, "upload"),
        }
    }
}

/// View to show once a check-in succeeded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum NavigationTarget {
    /// BIB card of the registration the scan was started from
    RegistrationDetail { registration_id: String },
    /// The runner's registration list
    RegistrationList,
}

impl std::fmt::Display for NavigationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NavigationTarget::RegistrationDetail { registration_id } => {
                write!(f, "registration {}", registration_id)
            }
            NavigationTarget::RegistrationList => write!(f, "registration list"),
        }
    }
}
