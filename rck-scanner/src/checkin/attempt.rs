//! A single check-in attempt

use rck_common::api::CheckinReceipt;
use rck_common::events::PayloadSource;
use rck_common::{CheckpointToken, PayloadValidator};
use uuid::Uuid;

/// Attempt outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Pending,
    Success,
    Failure,
}

/// One validated payload on its way through the check-in boundary
///
/// Created when the orchestrator accepts a payload; never persisted. Only
/// the terminal copy is kept, in the in-memory scan history.
#[derive(Debug, Clone)]
pub struct CheckinAttempt {
    pub id: Uuid,
    /// Raw payload exactly as submitted
    pub payload: String,
    pub token: CheckpointToken,
    pub source: PayloadSource,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    pub outcome: AttemptOutcome,
    pub receipt: Option<CheckinReceipt>,
    /// Failure message shown to the runner
    pub message: Option<String>,
}

impl CheckinAttempt {
    pub fn new(payload: impl Into<String>, token: CheckpointToken, source: PayloadSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload: payload.into(),
            token,
            source,
            submitted_at: rck_common::time::now(),
            outcome: AttemptOutcome::Pending,
            receipt: None,
            message: None,
        }
    }

    pub fn succeed(&mut self, receipt: CheckinReceipt) {
        self.outcome = AttemptOutcome::Success;
        self.receipt = Some(receipt);
        self.message = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.outcome = AttemptOutcome::Failure;
        self.receipt = None;
        self.message = Some(message.into());
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome != AttemptOutcome::Pending
    }

    /// Payload safe for logs and displays
    pub fn sanitized_payload(&self) -> String {
        PayloadValidator::sanitize(&self.payload)
    }
}
