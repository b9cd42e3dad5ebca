//! Scripted camera backend
//!
//! Counts live streams so tests can check the one-session invariant, and
//! fails opens / sink starts on demand.

use super::Journal;
use async_trait::async_trait;
use rck_scanner::camera::{CameraBackend, CameraStream, CaptureConstraints};
use rck_scanner::scan::FrameBuffer;
use rck_scanner::CameraError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct FakeCamera {
    supported: bool,
    torch: bool,
    frame_size: (u32, u32),
    open_delay: Duration,
    open_failures: Mutex<VecDeque<CameraError>>,
    start_failures: Arc<Mutex<VecDeque<CameraError>>>,
    opens: AtomicUsize,
    live: Arc<AtomicUsize>,
    max_live: Arc<AtomicUsize>,
    seen: Mutex<Vec<CaptureConstraints>>,
    journal: Journal,
}

impl FakeCamera {
    pub fn new() -> Self {
        Self {
            supported: true,
            torch: false,
            frame_size: (8, 8),
            open_delay: Duration::ZERO,
            open_failures: Mutex::new(VecDeque::new()),
            start_failures: Arc::new(Mutex::new(VecDeque::new())),
            opens: AtomicUsize::new(0),
            live: Arc::new(AtomicUsize::new(0)),
            max_live: Arc::new(AtomicUsize::new(0)),
            seen: Mutex::new(Vec::new()),
            journal: Journal::default(),
        }
    }

    /// Fail the next opens with these errors, in order
    pub fn failing_opens(self, errors: Vec<CameraError>) -> Self {
        *self.open_failures.lock().unwrap() = errors.into();
        self
    }

    /// Fail the next sink starts with these errors, in order
    pub fn failing_starts(self, errors: Vec<CameraError>) -> Self {
        *self.start_failures.lock().unwrap() = errors.into();
        self
    }

    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }

    pub fn with_torch(mut self) -> Self {
        self.torch = true;
        self
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn live_streams(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live_streams(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn constraints_seen(&self) -> Vec<CaptureConstraints> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl CameraBackend for FakeCamera {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn open(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(constraints.clone());

        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }

        let scripted = self.open_failures.lock().unwrap().pop_front();
        if let Some(err) = scripted {
            return Err(err);
        }

        let now_live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(now_live, Ordering::SeqCst);
        self.journal.push("camera:open");

        Ok(Box::new(FakeStream {
            live: Arc::clone(&self.live),
            start_failures: Arc::clone(&self.start_failures),
            frame_size: self.frame_size,
            torch: self.torch,
            playing: false,
            stopped: false,
            journal: self.journal.clone(),
        }))
    }
}

struct FakeStream {
    live: Arc<AtomicUsize>,
    start_failures: Arc<Mutex<VecDeque<CameraError>>>,
    frame_size: (u32, u32),
    torch: bool,
    playing: bool,
    stopped: bool,
    journal: Journal,
}

#[async_trait]
impl CameraStream for FakeStream {
    async fn start(&mut self) -> Result<(), CameraError> {
        if self.stopped {
            return Err(CameraError::Unknown("stopped".to_string()));
        }
        let scripted = self.start_failures.lock().unwrap().pop_front();
        if let Some(err) = scripted {
            return Err(err);
        }
        self.playing = true;
        Ok(())
    }

    fn has_enough_data(&self) -> bool {
        self.playing && !self.stopped
    }

    fn frame_size(&self) -> (u32, u32) {
        self.frame_size
    }

    fn read_frame(&mut self, buffer: &mut FrameBuffer) -> bool {
        buffer.pixels_mut().fill(255);
        true
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.playing = false;
            self.live.fetch_sub(1, Ordering::SeqCst);
            self.journal.push("camera:stop");
        }
    }

    fn supports_torch(&self) -> bool {
        self.torch
    }

    async fn set_torch(&mut self, _on: bool) -> Result<(), CameraError> {
        if self.torch {
            Ok(())
        } else {
            Err(CameraError::UnsupportedConstraints)
        }
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.stop();
    }
}
