//! Event types for the RCK event system
//!
//! Provides shared event definitions and EventBus for the check-in pipeline.

mod checkin_types;

pub use checkin_types::{CameraStatus, CheckinState, NavigationTarget, PayloadSource, SuppressReason};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Check-in pipeline events
///
/// Broadcast via [`EventBus`]; serializable so a status display can relay
/// them. Payload text is only ever carried in sanitized form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CheckinEvent {
    /// Camera status indicator changed
    CameraStatusChanged {
        status: CameraStatus,
        /// User-facing status line
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Scan loop stopped scheduling cycles (result in transit or host hidden)
    ScanPaused {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Scan loop scheduling cycles again
    ScanResumed {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A decode result was dropped before reaching the orchestrator
    DecodeSuppressed {
        reason: SuppressReason,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Orchestrator state transition
    CheckinStateChanged {
        old_state: CheckinState,
        new_state: CheckinState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Payload failed the token grammar
    FormatRejected {
        source: PayloadSource,
        /// Sanitized payload, safe to display
        sanitized: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Check-in boundary accepted the attempt
    CheckinSucceeded {
        attempt_id: Uuid,
        bib_number: String,
        first_name: String,
        last_name: String,
        checkin_at: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Check-in boundary rejected the attempt or the request failed
    CheckinFailed {
        attempt_id: Uuid,
        /// Server-provided (or transport) message, shown verbatim
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Orchestrator left the scanner view after a successful check-in
    NavigationRequested {
        target: NavigationTarget,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl CheckinEvent {
    /// Short event name for log lines
    pub fn name(&self) -> &'static str {
        match self {
            CheckinEvent::CameraStatusChanged { .. } => "CameraStatusChanged",
            CheckinEvent::ScanPaused { .. } => "ScanPaused",
            CheckinEvent::ScanResumed { .. } => "ScanResumed",
            CheckinEvent::DecodeSuppressed { .. } => "DecodeSuppressed",
            CheckinEvent::CheckinStateChanged { .. } => "CheckinStateChanged",
            CheckinEvent::FormatRejected { .. } => "FormatRejected",
            CheckinEvent::CheckinSucceeded { .. } => "CheckinSucceeded",
            CheckinEvent::CheckinFailed { .. } => "CheckinFailed",
            CheckinEvent::NavigationRequested { .. } => "NavigationRequested",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// One-to-many event broadcaster
///
/// Wraps `tokio::sync::broadcast`. Slow subscribers lose the oldest events
/// once `capacity` is exceeded; emitters never block.
///
/// # Examples
///
/// ```
/// use rck_common::events::{CheckinEvent, EventBus};
///
/// let event_bus = EventBus::new(16);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(CheckinEvent::ScanPaused { timestamp: chrono::Utc::now() });
/// assert!(matches!(rx.try_recv(), Ok(CheckinEvent::ScanPaused { .. })));
/// ```
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<CheckinEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<CheckinEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: CheckinEvent,
    ) -> Result<usize, broadcast::error::SendError<CheckinEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: CheckinEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
