//! Camera resource manager
//!
//! Owns the lifetime of exactly one camera stream at a time.
//!
//! - `acquire()` always releases the previous session first, then retries a
//!   failed open a fixed number of times before surfacing a typed error.
//! - `pause()` fully releases the stream when the host goes to background;
//!   `resume_after_pause()` re-acquires from scratch. A stream that survived
//!   backgrounding is never trusted.
//! - Frame reads go through `grab_frame()`; nothing else touches the session.
//!
//! All state sits behind one async mutex that is held for the whole
//! acquisition, so two acquisitions can never overlap.

use super::backend::{CameraBackend, CameraStream, CaptureConstraints};
use crate::error::CameraError;
use crate::scan::frame::FrameBuffer;
use rck_common::config::{FacingMode, PipelineTuning};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

/// Retry policy for camera acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquirePolicy {
    /// Additional attempts after the first failure
    pub retries: u32,
    /// Delay before each retry
    pub retry_delay: Duration,
    /// Delay before retrying a sink that refused to start
    pub play_retry_delay: Duration,
}

impl Default for AcquirePolicy {
    fn default() -> Self {
        Self::from(&PipelineTuning::default())
    }
}

impl From<&PipelineTuning> for AcquirePolicy {
    fn from(tuning: &PipelineTuning) -> Self {
        Self {
            retries: tuning.acquire_retries,
            retry_delay: tuning.acquire_retry_delay(),
            play_retry_delay: tuning.play_retry_delay(),
        }
    }
}

/// Summary of a freshly acquired session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Attempts it took (1 = first try)
    pub attempts: u32,
    /// Facing mode actually requested for the granted stream
    pub facing_mode: Option<FacingMode>,
}

/// Result of one frame read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameGrab {
    /// Frame copied into the buffer
    Captured,
    /// Session exists but no full frame is available (or acquisition in progress)
    NotReady,
    /// No live session
    NoSession,
}

struct CameraSession {
    stream: Box<dyn CameraStream>,
    active: bool,
    facing_mode: Option<FacingMode>,
    acquired_at: Instant,
    torch_on: bool,
}

#[derive(Default)]
struct ManagerState {
    session: Option<CameraSession>,
    /// Retries consumed by the current/last acquisition; reset on success
    retry_count: u32,
    /// Released because the host went to background
    suspended: bool,
}

/// Camera resource manager
pub struct CameraResourceManager {
    backend: Arc<dyn CameraBackend>,
    constraints: CaptureConstraints,
    policy: AcquirePolicy,
    state: Mutex<ManagerState>,
    acquisitions: AtomicU64,
    releases: AtomicU64,
}

impl std::fmt::Debug for CameraResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraResourceManager")
            .field("constraints", &self.constraints)
            .field("policy", &self.policy)
            .field("acquisitions", &self.acquisitions.load(Ordering::Relaxed))
            .field("releases", &self.releases.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl CameraResourceManager {
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        constraints: CaptureConstraints,
        policy: AcquirePolicy,
    ) -> Self {
        Self {
            backend,
            constraints,
            policy,
            state: Mutex::new(ManagerState::default()),
            acquisitions: AtomicU64::new(0),
            releases: AtomicU64::new(0),
        }
    }

    /// Whether the host exposes camera capture at all
    pub fn is_supported(&self) -> bool {
        self.backend.is_supported()
    }

    /// Acquire a live stream, releasing any previous session first
    ///
    /// Tries once plus `policy.retries` more times, sleeping
    /// `policy.retry_delay` before each retry. A constraint rejection drops
    /// the facing mode for the remaining attempts. The last error is
    /// returned once attempts are exhausted.
    pub async fn acquire(&self) -> Result<SessionInfo, CameraError> {
        let mut state = self.state.lock().await;
        self.release_locked(&mut state, "re-acquire");

        let mut constraints = self.constraints.clone();
        let max_attempts = self.policy.retries + 1;
        let mut last_error = CameraError::Unknown("camera was never requested".to_string());

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                state.retry_count = attempt - 1;
                sleep(self.policy.retry_delay).await;
            }

            match self.open_and_start(&constraints).await {
                Ok(stream) => {
                    state.session = Some(CameraSession {
                        stream,
                        active: true,
                        facing_mode: constraints.facing_mode,
                        acquired_at: Instant::now(),
                        torch_on: false,
                    });
                    state.retry_count = 0;
                    state.suspended = false;
                    self.acquisitions.fetch_add(1, Ordering::Relaxed);
                    info!(
                        "Camera acquired on attempt {}/{} (facing mode: {})",
                        attempt,
                        max_attempts,
                        constraints
                            .facing_mode
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| "default".to_string())
                    );
                    return Ok(SessionInfo {
                        attempts: attempt,
                        facing_mode: constraints.facing_mode,
                    });
                }
                Err(err) => {
                    warn!(
                        "Camera acquisition attempt {}/{} failed: {}",
                        attempt, max_attempts, err
                    );
                    if err == CameraError::UnsupportedConstraints && constraints.facing_mode.is_some() {
                        debug!("Dropping facing mode constraint for remaining attempts");
                        constraints = constraints.without_facing_mode();
                    }
                    last_error = err;
                }
            }
        }

        error!(
            "Camera acquisition failed after {} attempts: {}",
            max_attempts, last_error
        );
        Err(last_error)
    }

    async fn open_and_start(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraError> {
        let mut stream = self.backend.open(constraints).await?;

        if let Err(first) = stream.start().await {
            warn!(
                "Video sink refused to start ({}), retrying in {:?}",
                first, self.policy.play_retry_delay
            );
            sleep(self.policy.play_retry_delay).await;
            if let Err(second) = stream.start().await {
                stream.stop();
                return Err(second);
            }
        }

        Ok(stream)
    }

    /// Stop every track of the current session and detach the sink
    ///
    /// Idempotent: returns false when there was nothing to release.
    pub async fn release(&self) -> bool {
        let mut state = self.state.lock().await;
        self.release_locked(&mut state, "release")
    }

    fn release_locked(&self, state: &mut ManagerState, reason: &str) -> bool {
        match state.session.take() {
            Some(mut session) => {
                session.active = false;
                session.stream.stop();
                self.releases.fetch_add(1, Ordering::Relaxed);
                info!(
                    "Camera released ({}) after {:?}",
                    reason,
                    session.acquired_at.elapsed()
                );
                true
            }
            None => false,
        }
    }

    /// Host went to background: release the stream entirely
    pub async fn pause(&self) -> bool {
        let mut state = self.state.lock().await;
        state.suspended = true;
        self.release_locked(&mut state, "host hidden")
    }

    /// Host came back to foreground: acquire a brand new stream
    pub async fn resume_after_pause(&self) -> Result<SessionInfo, CameraError> {
        info!("Host visible again, re-acquiring camera");
        self.acquire().await
    }

    /// Copy the current frame into `buffer`, resized to native resolution
    ///
    /// Never waits: while an acquisition holds the session lock the cycle
    /// just reports `NotReady`.
    pub fn grab_frame(&self, buffer: &mut FrameBuffer) -> FrameGrab {
        let Ok(mut state) = self.state.try_lock() else {
            return FrameGrab::NotReady;
        };
        let Some(session) = state.session.as_mut() else {
            return FrameGrab::NoSession;
        };
        if !session.active {
            return FrameGrab::NoSession;
        }
        if !session.stream.has_enough_data() {
            return FrameGrab::NotReady;
        }

        let (width, height) = session.stream.frame_size();
        if width == 0 || height == 0 {
            return FrameGrab::NotReady;
        }
        buffer.resize(width, height);

        if session.stream.read_frame(buffer) {
            FrameGrab::Captured
        } else {
            FrameGrab::NotReady
        }
    }

    pub async fn has_session(&self) -> bool {
        self.state.lock().await.session.is_some()
    }

    pub async fn is_suspended(&self) -> bool {
        self.state.lock().await.suspended
    }

    /// Retries consumed by the in-progress or most recent failed acquisition
    pub async fn retry_count(&self) -> u32 {
        self.state.lock().await.retry_count
    }

    /// Facing mode requested for the live session
    pub async fn facing_mode(&self) -> Option<FacingMode> {
        self.state
            .lock()
            .await
            .session
            .as_ref()
            .and_then(|s| s.facing_mode)
    }

    /// Sessions successfully acquired over the manager's lifetime
    pub fn acquisition_count(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    /// Sessions released over the manager's lifetime
    pub fn release_count(&self) -> u64 {
        self.releases.load(Ordering::Relaxed)
    }

    pub async fn torch_supported(&self) -> bool {
        self.state
            .lock()
            .await
            .session
            .as_ref()
            .map(|s| s.stream.supports_torch())
            .unwrap_or(false)
    }

    pub async fn torch_on(&self) -> bool {
        self.state
            .lock()
            .await
            .session
            .as_ref()
            .map(|s| s.torch_on)
            .unwrap_or(false)
    }

    /// Switch the torch; on failure the torch is considered off
    pub async fn set_torch(&self, on: bool) -> Result<(), CameraError> {
        let mut state = self.state.lock().await;
        let session = state
            .session
            .as_mut()
            .ok_or_else(|| CameraError::Unknown("no active camera session".to_string()))?;

        if !session.stream.supports_torch() {
            session.torch_on = false;
            return Err(CameraError::UnsupportedConstraints);
        }

        match session.stream.set_torch(on).await {
            Ok(()) => {
                session.torch_on = on;
                debug!("Torch {}", if on { "on" } else { "off" });
                Ok(())
            }
            Err(err) => {
                session.torch_on = false;
                warn!("Torch change rejected: {}", err);
                Err(err)
            }
        }
    }
}

impl Drop for CameraResourceManager {
    fn drop(&mut self) {
        if let Some(session) = self.state.get_mut().session.as_mut() {
            session.stream.stop();
        }
    }
}
