//! Scan debouncer
//!
//! A stationary camera pointed at one printed code decodes it many times a
//! second. The debouncer gates those repeats before they reach the
//! orchestrator:
//!
//! 1. Anything within `cooldown` of the last accepted payload is suppressed.
//! 2. The same payload as last time is suppressed for the longer
//!    `same_payload_window`.
//! 3. Otherwise the payload is accepted and remembered.
//!
//! Only accepted payloads update the window.

use rck_common::config::PipelineTuning;
use rck_common::events::SuppressReason;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Last accepted payload and when it was accepted
#[derive(Debug, Clone, Default)]
pub struct DebounceWindow {
    pub last_payload: Option<String>,
    pub last_accepted_at: Option<Instant>,
}

/// Outcome of one debounce check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceDecision {
    Accept,
    Suppress(SuppressReason),
}

impl DebounceDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, DebounceDecision::Accept)
    }
}

/// Cooldown / same-payload gate for decode results
#[derive(Debug, Clone)]
pub struct ScanDebouncer {
    cooldown: Duration,
    same_payload_window: Duration,
    window: DebounceWindow,
}

impl ScanDebouncer {
    pub fn new(cooldown: Duration, same_payload_window: Duration) -> Self {
        Self {
            cooldown,
            same_payload_window,
            window: DebounceWindow::default(),
        }
    }

    pub fn from_tuning(tuning: &PipelineTuning) -> Self {
        Self::new(tuning.scan_cooldown(), tuning.same_payload_window())
    }

    /// `true` = forward the payload, `false` = suppress it
    pub fn accept(&mut self, payload: &str) -> bool {
        self.check(payload).is_accept()
    }

    /// Evaluate `payload` now
    pub fn check(&mut self, payload: &str) -> DebounceDecision {
        self.check_at(payload, Instant::now())
    }

    /// Evaluate `payload` as of `now`
    pub fn check_at(&mut self, payload: &str, now: Instant) -> DebounceDecision {
        if let Some(last) = self.window.last_accepted_at {
            let elapsed = now.saturating_duration_since(last);

            if elapsed < self.cooldown {
                debug!("Decode suppressed: {:?} since last accept (cooldown)", elapsed);
                return DebounceDecision::Suppress(SuppressReason::Cooldown);
            }

            if self.window.last_payload.as_deref() == Some(payload)
                && elapsed < self.same_payload_window
            {
                debug!("Decode suppressed: same payload after {:?}", elapsed);
                return DebounceDecision::Suppress(SuppressReason::SamePayload);
            }
        }

        self.window.last_payload = Some(payload.to_string());
        self.window.last_accepted_at = Some(now);
        DebounceDecision::Accept
    }

    /// Forget the last accepted payload
    pub fn reset(&mut self) {
        self.window = DebounceWindow::default();
    }

    /// Forget `payload` if it is still the remembered one
    ///
    /// For an accepted payload that was dropped downstream without being
    /// submitted; returns whether the window was cleared.
    pub fn forget(&mut self, payload: &str) -> bool {
        if self.window.last_payload.as_deref() == Some(payload) {
            self.reset();
            true
        } else {
            false
        }
    }

    pub fn window(&self) -> &DebounceWindow {
        &self.window
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}
