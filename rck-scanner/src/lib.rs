//! # RCK Check-in Scanner Library (rck-scanner)
//!
//! On-device QR check-in pipeline for event runners.
//!
//! **Purpose:** Own the camera, decode frames paced by the display refresh,
//! debounce repeated scans, validate checkpoint tokens and submit exactly
//! one check-in at a time to the registration API.
//!
//! **Architecture:** One cooperative tokio task per scan loop; components
//! shared via `Arc`, camera state behind a single async mutex.

pub mod camera;
pub mod checkin;
pub mod decoder;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod scan;
pub mod state;

pub use error::{CameraError, Error, Result, SubmissionError};
pub use pipeline::{CheckinPipeline, PipelineDeps, UploadOutcome};
pub use state::SharedState;
