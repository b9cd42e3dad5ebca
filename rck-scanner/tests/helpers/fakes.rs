//! Scripted decoder, check-in client, view and scan observer

use super::Journal;
use async_trait::async_trait;
use rck_common::api::CheckinReceipt;
use rck_common::events::{CameraStatus, NavigationTarget};
use rck_scanner::checkin::{CheckinClient, CheckinView};
use rck_scanner::decoder::QrDecoder;
use rck_scanner::scan::{FrameBuffer, ScanObserver};
use rck_scanner::{CameraError, SubmissionError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ========================================
// Decoder
// ========================================

/// Decoder returning scripted results, then a fixed fallback
pub struct ScriptedDecoder {
    script: Mutex<VecDeque<Option<String>>>,
    fallback: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedDecoder {
    pub fn always(payload: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(payload.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn once(payload: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::from([Some(payload.to_string())])),
            fallback: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn never() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl QrDecoder for ScriptedDecoder {
    fn decode(&self, _frame: &FrameBuffer) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

// ========================================
// Check-in client
// ========================================

pub fn receipt(bib: &str) -> CheckinReceipt {
    CheckinReceipt {
        bib_number: bib.to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        checkin_timestamp: "2026-03-01T06:12:00Z".to_string(),
    }
}

/// Check-in boundary with a fixed answer
pub struct FakeClient {
    answer: Result<CheckinReceipt, String>,
    delay: Duration,
    calls: AtomicUsize,
    payloads: Mutex<Vec<String>>,
}

impl FakeClient {
    pub fn succeeding(bib: &str) -> Self {
        Self::answering(Ok(receipt(bib)))
    }

    pub fn rejecting(message: &str) -> Self {
        Self::answering(Err(message.to_string()))
    }

    fn answering(answer: Result<CheckinReceipt, String>) -> Self {
        Self {
            answer,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
        }
    }

    /// Take this long to answer each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<String> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl CheckinClient for FakeClient {
    async fn submit(&self, payload: &str) -> Result<CheckinReceipt, SubmissionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap().push(payload.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.answer.clone().map_err(SubmissionError::Rejected)
    }
}

// ========================================
// View
// ========================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCall {
    CameraStatus(CameraStatus, String),
    Submitting(bool),
    FormatError(String),
    Success(String),
    Failure(String),
    Cleared,
    Warning(String),
    Notice(String),
    Navigate(NavigationTarget),
}

/// View that records every call while mounted
pub struct RecordingView {
    mounted: AtomicBool,
    calls: Mutex<Vec<ViewCall>>,
    journal: Journal,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::with_journal(Journal::default())
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            mounted: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
            journal,
        }
    }

    /// Runner left the scanner screen
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ViewCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn contains(&self, call: &ViewCall) -> bool {
        self.calls.lock().unwrap().contains(call)
    }

    fn record(&self, call: ViewCall) {
        assert!(
            self.is_mounted(),
            "view drawn after unmount: {:?}",
            call
        );
        if let ViewCall::Navigate(_) = call {
            self.journal.push("view:navigate");
        }
        self.calls.lock().unwrap().push(call);
    }
}

impl CheckinView for RecordingView {
    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    fn set_camera_status(&self, status: CameraStatus, message: &str) {
        self.record(ViewCall::CameraStatus(status, message.to_string()));
    }

    fn show_submitting(&self, visible: bool) {
        self.record(ViewCall::Submitting(visible));
    }

    fn show_format_error(&self, message: &str) {
        self.record(ViewCall::FormatError(message.to_string()));
    }

    fn show_success(&self, receipt: &CheckinReceipt) {
        self.record(ViewCall::Success(receipt.bib_number.clone()));
    }

    fn show_failure(&self, message: &str) {
        self.record(ViewCall::Failure(message.to_string()));
    }

    fn clear_result(&self) {
        self.record(ViewCall::Cleared);
    }

    fn show_warning(&self, message: &str) {
        self.record(ViewCall::Warning(message.to_string()));
    }

    fn show_notice(&self, message: &str) {
        self.record(ViewCall::Notice(message.to_string()));
    }

    fn navigate(&self, target: &NavigationTarget) {
        self.record(ViewCall::Navigate(target.clone()));
    }
}

// ========================================
// Scan observer
// ========================================

/// Observer that records results and never resumes the loop itself
#[derive(Default)]
pub struct RecordingObserver {
    results: Mutex<Vec<String>>,
    errors: Mutex<Vec<CameraError>>,
    ticks: AtomicUsize,
}

impl RecordingObserver {
    pub fn results(&self) -> Vec<String> {
        self.results.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<CameraError> {
        self.errors.lock().unwrap().clone()
    }

    pub fn ticks(&self) -> usize {
        self.ticks.load(Ordering::SeqCst)
    }
}

impl ScanObserver for RecordingObserver {
    fn on_decode_result(&self, payload: String) {
        self.results.lock().unwrap().push(payload);
    }

    fn on_camera_error(&self, error: &CameraError) {
        self.errors.lock().unwrap().push(error.clone());
    }

    fn on_cycle_tick(&self) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }
}
