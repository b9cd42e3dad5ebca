//! Check-in submission boundary
//!
//! [`CheckinClient`] takes the raw validated payload and returns either a
//! receipt or a [`SubmissionError`] whose `Display` is the message shown to
//! the runner. There is no automatic retry; a failed submission needs a
//! fresh scan.

use crate::error::SubmissionError;
use async_trait::async_trait;
use rck_common::api::{ApiResponse, CheckinReceipt, CheckinRequest, CheckinResponseData};
use rck_common::PayloadValidator;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("rck-scanner/", env!("CARGO_PKG_VERSION"));

/// Route selector for the self check-in endpoint
pub const CHECKIN_ROUTE: &str = "checkins";

/// Fallback message when the server rejects without saying why
pub const DEFAULT_REJECTION: &str = "Check-in failed";

/// External check-in boundary
#[async_trait]
pub trait CheckinClient: Send + Sync {
    /// Submit one payload; exactly one request per call
    async fn submit(&self, payload: &str) -> Result<CheckinReceipt, SubmissionError>;
}

/// Check-in client for the registration web API
///
/// No request timeout is configured: a slow submission keeps the
/// orchestrator in `Submitting` for as long as the transport allows.
pub struct HttpCheckinClient {
    http_client: reqwest::Client,
    base_url: String,
    line_token: Option<String>,
}

impl std::fmt::Debug for HttpCheckinClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCheckinClient")
            .field("base_url", &self.base_url)
            .field("has_token", &self.line_token.is_some())
            .finish()
    }
}

impl HttpCheckinClient {
    pub fn new(
        base_url: impl Into<String>,
        line_token: Option<String>,
    ) -> Result<Self, SubmissionError> {
        let http_client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            line_token: line_token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Turn a response envelope into a receipt or a runner-facing failure
pub fn interpret_envelope(
    envelope: ApiResponse<CheckinResponseData>,
) -> Result<CheckinReceipt, SubmissionError> {
    if !envelope.success {
        let message = envelope
            .error
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION.to_string());
        return Err(SubmissionError::Rejected(message));
    }

    envelope
        .data
        .map(CheckinReceipt::from)
        .ok_or_else(|| SubmissionError::Malformed("success response without data".to_string()))
}

#[async_trait]
impl CheckinClient for HttpCheckinClient {
    async fn submit(&self, payload: &str) -> Result<CheckinReceipt, SubmissionError> {
        let line_token = self
            .line_token
            .as_deref()
            .ok_or(SubmissionError::MissingToken)?;

        let body = CheckinRequest {
            qr_payload: payload.to_string(),
            line_token: line_token.to_string(),
        };

        debug!(
            "Submitting check-in {} to {}",
            PayloadValidator::sanitize(payload),
            self.base_url
        );

        let response = self
            .http_client
            .post(&self.base_url)
            .query(&[("path", CHECKIN_ROUTE)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Check-in request returned HTTP {}", status.as_u16());
            return Err(SubmissionError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let envelope: ApiResponse<CheckinResponseData> = response
            .json()
            .await
            .map_err(|e| SubmissionError::Malformed(e.to_string()))?;

        let receipt = interpret_envelope(envelope)?;
        info!("Check-in accepted for BIB {}", receipt.bib_number);
        Ok(receipt)
    }
}
