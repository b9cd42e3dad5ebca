//! Check-in path: attempt model, submission boundary, presentation, orchestrator

pub mod attempt;
pub mod client;
pub mod orchestrator;
pub mod view;

pub use attempt::{AttemptOutcome, CheckinAttempt};
pub use client::{CheckinClient, HttpCheckinClient};
pub use orchestrator::{CheckinOrchestrator, CheckinOutcome, OrchestratorTiming, ScanControl};
pub use view::{CheckinView, DetachedView};
