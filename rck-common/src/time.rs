//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

/// Frame period for a display refresh rate, in whole microseconds
///
/// A zero rate is treated as 1 Hz; the period is never shorter than 1 µs.
pub fn frame_period(refresh_hz: u32) -> std::time::Duration {
    let micros = 1_000_000 / u64::from(refresh_hz.max(1));
    std::time::Duration::from_micros(micros.max(1))
}
