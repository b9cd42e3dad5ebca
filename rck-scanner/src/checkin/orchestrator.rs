//! Check-in orchestrator
//!
//! Drives one attempt at a time through
//!
//! ```text
//! Scanning -> Validating -> Submitting -> (Success | Failure) -> Scanning
//! ```
//!
//! A busy flag covers the whole attempt, holds included, so a second payload
//! arriving meanwhile is dropped outright. Together with the scan loop's
//! pause-on-result this gives at most one in-flight submission.
//!
//! After a success the orchestrator releases the camera, navigates away and
//! marks itself completed; later payloads are ignored.

use super::attempt::CheckinAttempt;
use super::client::CheckinClient;
use super::view::{CheckinView, FORMAT_ERROR_MESSAGE};
use crate::history::ScanHistory;
use crate::state::SharedState;
use async_trait::async_trait;
use rck_common::api::CheckinReceipt;
use rck_common::config::PipelineTuning;
use rck_common::events::{
    CheckinEvent, CheckinState, NavigationTarget, PayloadSource, SuppressReason,
};
use rck_common::PayloadValidator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Scan-side hooks the orchestrator drives
#[async_trait]
pub trait ScanControl: Send + Sync {
    /// Let the scan loop schedule decode cycles again
    async fn resume_scanning(&self);

    /// Fully release the camera before leaving the scanner
    async fn release_camera(&self);
}

/// Display intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorTiming {
    pub format_error_hold: Duration,
    pub result_hold: Duration,
}

impl Default for OrchestratorTiming {
    fn default() -> Self {
        Self::from(&PipelineTuning::default())
    }
}

impl From<&PipelineTuning> for OrchestratorTiming {
    fn from(tuning: &PipelineTuning) -> Self {
        Self {
            format_error_hold: tuning.format_error_hold(),
            result_hold: tuning.result_hold(),
        }
    }
}

/// How `handle_payload` resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckinOutcome {
    /// Busy or already completed; nothing happened
    Ignored,
    /// Payload failed the token grammar
    FormatRejected,
    Succeeded(CheckinReceipt),
    /// Message shown to the runner
    Failed(String),
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Check-in state machine
pub struct CheckinOrchestrator {
    client: Arc<dyn CheckinClient>,
    view: Arc<dyn CheckinView>,
    scan: Arc<dyn ScanControl>,
    shared: Arc<SharedState>,
    history: Arc<ScanHistory>,
    timing: OrchestratorTiming,
    /// Registration the scanner was opened from, if any
    registration_id: Option<String>,
    state: RwLock<CheckinState>,
    busy: AtomicBool,
    completed: watch::Sender<Option<NavigationTarget>>,
}

impl CheckinOrchestrator {
    pub fn new(
        client: Arc<dyn CheckinClient>,
        view: Arc<dyn CheckinView>,
        scan: Arc<dyn ScanControl>,
        shared: Arc<SharedState>,
        history: Arc<ScanHistory>,
        timing: OrchestratorTiming,
        registration_id: Option<String>,
    ) -> Self {
        let (completed, _rx) = watch::channel(None);
        Self {
            client,
            view,
            scan,
            shared,
            history,
            timing,
            registration_id,
            state: RwLock::new(CheckinState::Scanning),
            busy: AtomicBool::new(false),
            completed,
        }
    }

    pub async fn state(&self) -> CheckinState {
        *self.state.read().await
    }

    /// Whether an attempt (holds included) is in progress
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Whether a successful check-in already navigated away
    pub fn is_completed(&self) -> bool {
        self.completed.borrow().is_some()
    }

    /// Resolves to the navigation target once a check-in succeeded
    pub fn completion(&self) -> watch::Receiver<Option<NavigationTarget>> {
        self.completed.subscribe()
    }

    /// Entry point for every payload source
    ///
    /// Camera results arrive here after the debouncer; manual entry and
    /// image upload come straight in. Returns once the attempt, including
    /// its display hold, is finished.
    pub async fn handle_payload(&self, payload: &str, source: PayloadSource) -> CheckinOutcome {
        if self.is_completed() {
            debug!("Check-in already completed, ignoring {} payload", source);
            return CheckinOutcome::Ignored;
        }

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Already processing a check-in, dropping {} payload", source);
            self.shared.record_suppressed(SuppressReason::Busy);
            return CheckinOutcome::Ignored;
        }
        let _busy = BusyGuard(&self.busy);

        self.transition(CheckinState::Validating).await;

        match PayloadValidator::parse(payload) {
            Some(token) => {
                let attempt = CheckinAttempt::new(payload, token, source);
                self.submit(attempt).await
            }
            None => self.reject_format(payload, source).await,
        }
    }

    async fn reject_format(&self, payload: &str, source: PayloadSource) -> CheckinOutcome {
        let sanitized = PayloadValidator::sanitize(payload);
        warn!("Rejected {} payload with invalid format: '{}'", source, sanitized);

        self.shared.broadcast_event(CheckinEvent::FormatRejected {
            source,
            sanitized,
            timestamp: rck_common::time::now(),
        });
        if self.view.is_mounted() {
            self.view.show_format_error(FORMAT_ERROR_MESSAGE);
        }

        sleep(self.timing.format_error_hold).await;

        if self.view.is_mounted() {
            self.view.clear_result();
        }
        self.transition(CheckinState::Scanning).await;
        self.scan.resume_scanning().await;
        CheckinOutcome::FormatRejected
    }

    async fn submit(&self, mut attempt: CheckinAttempt) -> CheckinOutcome {
        self.transition(CheckinState::Submitting).await;
        info!(
            "Submitting {} check-in {} ({})",
            attempt.source,
            attempt.id,
            attempt.sanitized_payload()
        );
        if self.view.is_mounted() {
            self.view.show_submitting(true);
        }

        let result = self.client.submit(&attempt.payload).await;

        if self.view.is_mounted() {
            self.view.show_submitting(false);
        }

        match result {
            Ok(receipt) => {
                attempt.succeed(receipt.clone());
                self.succeed(attempt, receipt).await
            }
            Err(err) => {
                let message = err.to_string();
                attempt.fail(message.clone());
                self.fail(attempt, message).await
            }
        }
    }

    async fn succeed(&self, attempt: CheckinAttempt, receipt: CheckinReceipt) -> CheckinOutcome {
        self.transition(CheckinState::Success).await;
        info!(
            "Check-in {} succeeded: BIB {} ({})",
            attempt.id,
            receipt.bib_number,
            receipt.full_name()
        );

        self.shared.broadcast_event(CheckinEvent::CheckinSucceeded {
            attempt_id: attempt.id,
            bib_number: receipt.bib_number.clone(),
            first_name: receipt.first_name.clone(),
            last_name: receipt.last_name.clone(),
            checkin_at: receipt.checkin_timestamp.clone(),
            timestamp: rck_common::time::now(),
        });
        if self.view.is_mounted() {
            self.view.show_success(&receipt);
        }
        self.history.record(attempt).await;

        sleep(self.timing.result_hold).await;

        self.scan.release_camera().await;

        let target = match &self.registration_id {
            Some(id) => NavigationTarget::RegistrationDetail {
                registration_id: id.clone(),
            },
            None => NavigationTarget::RegistrationList,
        };
        info!("Leaving scanner for {}", target);
        self.shared.broadcast_event(CheckinEvent::NavigationRequested {
            target: target.clone(),
            timestamp: rck_common::time::now(),
        });
        if self.view.is_mounted() {
            self.view.navigate(&target);
        }
        self.completed.send_replace(Some(target));

        CheckinOutcome::Succeeded(receipt)
    }

    async fn fail(&self, attempt: CheckinAttempt, message: String) -> CheckinOutcome {
        self.transition(CheckinState::Failure).await;
        error!("Check-in {} failed: {}", attempt.id, message);

        self.shared.broadcast_event(CheckinEvent::CheckinFailed {
            attempt_id: attempt.id,
            message: message.clone(),
            timestamp: rck_common::time::now(),
        });
        if self.view.is_mounted() {
            self.view.show_failure(&message);
        }
        self.history.record(attempt).await;

        sleep(self.timing.result_hold).await;

        if self.view.is_mounted() {
            self.view.clear_result();
        }
        self.transition(CheckinState::Scanning).await;
        self.scan.resume_scanning().await;

        CheckinOutcome::Failed(message)
    }

    async fn transition(&self, new_state: CheckinState) {
        let old_state = {
            let mut state = self.state.write().await;
            std::mem::replace(&mut *state, new_state)
        };
        if old_state == new_state {
            return;
        }

        debug!("Check-in state {} -> {}", old_state, new_state);
        self.shared.broadcast_event(CheckinEvent::CheckinStateChanged {
            old_state,
            new_state,
            timestamp: rck_common::time::now(),
        });
    }
}
