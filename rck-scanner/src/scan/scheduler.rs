//! Scan loop scheduler
//!
//! One cooperative task that, per display frame, pulls the current camera
//! frame and runs the decoder on it. States:
//!
//! ```text
//! Idle -> Running -> (Paused <-> Running) -> Stopped
//! ```
//!
//! The first non-empty decode result flips the loop to `Paused` before it is
//! handed to the observer, so the same visual code is never decoded twice
//! while a result is in transit. Nothing restarts the loop except
//! [`ScanLoopScheduler::resume`].

use super::clock::FrameClock;
use super::frame::FrameBuffer;
use super::observer::ScanObserver;
use crate::camera::{CameraResourceManager, FrameGrab};
use crate::decoder::DecoderAdapter;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Scheduler lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Paused,
    /// Terminal
    Stopped,
}

/// Externally visible cycle flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanCycleState {
    pub running: bool,
    pub paused: bool,
}

impl From<LoopState> for ScanCycleState {
    fn from(state: LoopState) -> Self {
        match state {
            LoopState::Idle | LoopState::Stopped => Self::default(),
            LoopState::Running => Self {
                running: true,
                paused: false,
            },
            LoopState::Paused => Self {
                running: true,
                paused: true,
            },
        }
    }
}

/// Loop counters for diagnostics
#[derive(Debug, Default)]
pub struct LoopStats {
    /// Frame ticks processed while running
    pub cycles: AtomicU64,
    /// Decoder invocations
    pub decodes: AtomicU64,
    /// Non-empty results delivered
    pub results: AtomicU64,
}

/// Frame-paced decode loop
pub struct ScanLoopScheduler {
    camera: Arc<CameraResourceManager>,
    decoder: DecoderAdapter,
    state: Arc<watch::Sender<LoopState>>,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
    stats: Arc<LoopStats>,
}

impl std::fmt::Debug for ScanLoopScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanLoopScheduler")
            .field("state", &self.state())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl ScanLoopScheduler {
    pub fn new(camera: Arc<CameraResourceManager>, decoder: DecoderAdapter) -> Self {
        let (tx, _rx) = watch::channel(LoopState::Idle);
        Self {
            camera,
            decoder,
            state: Arc::new(tx),
            task: std::sync::Mutex::new(None),
            stats: Arc::new(LoopStats::default()),
        }
    }

    /// Start (or restart from `Paused`) the loop
    ///
    /// Spawns the loop task on first call. Fails once stopped.
    pub fn start(&self, clock: Box<dyn FrameClock>, observer: Arc<dyn ScanObserver>) -> Result<()> {
        if self.state() == LoopState::Stopped {
            return Err(Error::InvalidState("scan loop already stopped".to_string()));
        }

        let mut task = self
            .task
            .lock()
            .map_err(|_| Error::InvalidState("scan loop task lock poisoned".to_string()))?;

        if task.as_ref().map_or(true, |handle| handle.is_finished()) {
            let ctx = LoopContext {
                camera: Arc::clone(&self.camera),
                decoder: self.decoder.clone(),
                state: Arc::clone(&self.state),
                stats: Arc::clone(&self.stats),
            };
            let rx = self.state.subscribe();
            *task = Some(tokio::spawn(ctx.run(clock, observer, rx)));
            info!("Scan loop started");
        } else {
            debug!("Scan loop task already present, switching to running");
        }

        self.state.send_replace(LoopState::Running);
        Ok(())
    }

    /// Stop scheduling cycles; returns true if the loop was running
    pub fn pause(&self) -> bool {
        let paused = self.state.send_if_modified(|state| {
            if *state == LoopState::Running {
                *state = LoopState::Paused;
                true
            } else {
                false
            }
        });
        if paused {
            debug!("Scan loop paused");
        }
        paused
    }

    /// Schedule cycles again; returns true if the loop was paused
    pub fn resume(&self) -> bool {
        let resumed = self.state.send_if_modified(|state| {
            if *state == LoopState::Paused {
                *state = LoopState::Running;
                true
            } else {
                false
            }
        });
        if resumed {
            debug!("Scan loop resumed");
        }
        resumed
    }

    /// Terminate the loop for good
    pub fn stop(&self) {
        let previous = self.state.send_replace(LoopState::Stopped);
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
        if previous != LoopState::Stopped {
            info!(
                "Scan loop stopped after {} cycles ({} decodes, {} results)",
                self.stats.cycles.load(Ordering::Relaxed),
                self.stats.decodes.load(Ordering::Relaxed),
                self.stats.results.load(Ordering::Relaxed)
            );
        }
    }

    pub fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    pub fn cycle_state(&self) -> ScanCycleState {
        self.state().into()
    }

    pub fn is_paused(&self) -> bool {
        self.state() == LoopState::Paused
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    /// Watch state changes (tests and status displays)
    pub fn subscribe(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }
}

impl Drop for ScanLoopScheduler {
    fn drop(&mut self) {
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}

struct LoopContext {
    camera: Arc<CameraResourceManager>,
    decoder: DecoderAdapter,
    state: Arc<watch::Sender<LoopState>>,
    stats: Arc<LoopStats>,
}

impl LoopContext {
    fn is_running(&self) -> bool {
        *self.state.borrow() == LoopState::Running
    }

    async fn run(
        self,
        mut clock: Box<dyn FrameClock>,
        observer: Arc<dyn ScanObserver>,
        mut rx: watch::Receiver<LoopState>,
    ) {
        let mut buffer = FrameBuffer::new();

        loop {
            // Park until running; a paused loop schedules nothing.
            loop {
                match *rx.borrow_and_update() {
                    LoopState::Running => break,
                    LoopState::Stopped => return,
                    LoopState::Idle | LoopState::Paused => {}
                }
                if rx.changed().await.is_err() {
                    return;
                }
            }

            clock.next_frame().await;

            if !self.is_running() {
                continue;
            }
            self.stats.cycles.fetch_add(1, Ordering::Relaxed);
            observer.on_cycle_tick();

            match self.camera.grab_frame(&mut buffer) {
                FrameGrab::Captured => {}
                FrameGrab::NotReady | FrameGrab::NoSession => {
                    trace!("No frame this cycle");
                    continue;
                }
            }

            // No suspension point between this check and the decode.
            if !self.is_running() {
                continue;
            }
            self.stats.decodes.fetch_add(1, Ordering::Relaxed);
            let Some(payload) = self.decoder.decode(&buffer) else {
                continue;
            };

            let claimed = self.state.send_if_modified(|state| {
                if *state == LoopState::Running {
                    *state = LoopState::Paused;
                    true
                } else {
                    false
                }
            });
            if claimed {
                self.stats.results.fetch_add(1, Ordering::Relaxed);
                debug!("Decode result, scan loop paused");
                observer.on_decode_result(payload);
            }
        }
    }
}
