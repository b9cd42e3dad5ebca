//! Shared scanner state
//!
//! State read by every pipeline component: the camera status indicator, the
//! event broadcaster, and a few counters.
//!
//! The camera status lives behind a `std::sync::RwLock` because it is
//! updated from the scan loop's synchronous observer callbacks.

use rck_common::events::{CameraStatus, CheckinEvent, EventBus, SuppressReason};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

/// Default event channel capacity
pub const EVENT_CAPACITY: usize = 100;

/// Camera status indicator plus its status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraIndicator {
    pub status: CameraStatus,
    pub message: String,
}

impl Default for CameraIndicator {
    fn default() -> Self {
        Self {
            status: CameraStatus::Loading,
            message: String::new(),
        }
    }
}

/// Shared state accessible by all components
pub struct SharedState {
    camera: RwLock<CameraIndicator>,

    /// Event broadcaster
    events: EventBus,

    /// Decode results dropped by the debouncer or busy guard
    suppressed_total: AtomicU64,
}

impl SharedState {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            camera: RwLock::new(CameraIndicator::default()),
            events: EventBus::new(capacity),
            suppressed_total: AtomicU64::new(0),
        }
    }

    /// Broadcast an event; no listeners is fine
    pub fn broadcast_event(&self, event: CheckinEvent) {
        debug!("Event: {}", event.name());
        self.events.emit_lossy(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CheckinEvent> {
        self.events.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    pub fn camera_indicator(&self) -> CameraIndicator {
        self.camera
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn camera_status(&self) -> CameraStatus {
        self.camera_indicator().status
    }

    /// Update the indicator; returns false (and emits nothing) if unchanged
    pub fn set_camera_status(&self, status: CameraStatus, message: impl Into<String>) -> bool {
        let message = message.into();
        {
            let mut guard = self
                .camera
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if guard.status == status && guard.message == message {
                return false;
            }
            guard.status = status;
            guard.message = message.clone();
        }

        self.broadcast_event(CheckinEvent::CameraStatusChanged {
            status,
            message,
            timestamp: rck_common::time::now(),
        });
        true
    }

    /// Count and announce a suppressed decode result
    pub fn record_suppressed(&self, reason: SuppressReason) {
        self.suppressed_total.fetch_add(1, Ordering::Relaxed);
        self.broadcast_event(CheckinEvent::DecodeSuppressed {
            reason,
            timestamp: rck_common::time::now(),
        });
    }

    pub fn suppressed_total(&self) -> u64 {
        self.suppressed_total.load(Ordering::Relaxed)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
