//! Frame scanning: per-frame clock, decode loop, debouncing

pub mod clock;
pub mod debounce;
pub mod frame;
pub mod observer;
pub mod scheduler;

pub use clock::{DisplayRefreshClock, FrameClock};
pub use debounce::{DebounceDecision, DebounceWindow, ScanDebouncer};
pub use frame::FrameBuffer;
pub use observer::ScanObserver;
pub use scheduler::{LoopState, LoopStats, ScanCycleState, ScanLoopScheduler};
