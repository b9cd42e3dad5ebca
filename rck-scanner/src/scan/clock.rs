//! Per-frame scheduling source
//!
//! Decode cycles are paced by the host display's refresh, never by a
//! free-running timer of their own: each cycle awaits the next frame tick,
//! which also yields to every other task between cycles.

use async_trait::async_trait;
use rck_common::time::frame_period;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Source of per-frame callbacks
#[async_trait]
pub trait FrameClock: Send {
    /// Resolve at the next display frame
    async fn next_frame(&mut self);
}

/// Frame clock locked to the host refresh rate
///
/// Missed frames are skipped rather than burst, matching how a display
/// drops callbacks for a page that fell behind.
#[derive(Debug)]
pub struct DisplayRefreshClock {
    ticker: Interval,
}

impl DisplayRefreshClock {
    pub fn new(refresh_hz: u32) -> Self {
        let mut ticker = interval(frame_period(refresh_hz));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { ticker }
    }
}

#[async_trait]
impl FrameClock for DisplayRefreshClock {
    async fn next_frame(&mut self) {
        self.ticker.tick().await;
    }
}
