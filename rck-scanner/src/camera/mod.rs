//! Camera capability boundary and resource management

pub mod backend;
pub mod manager;
pub mod replay;

pub use backend::{CameraBackend, CameraStream, CaptureConstraints, NoCameraBackend};
pub use manager::{AcquirePolicy, CameraResourceManager, FrameGrab, SessionInfo};
pub use replay::DirectoryReplayCamera;
