//! Check-in pipeline assembly
//!
//! Wires the camera manager, scan loop, debouncer and orchestrator:
//!
//! ```text
//! camera -> scan loop -> decoder -> debouncer -> validator -> orchestrator -> client
//! ```
//!
//! Manual entry and image upload enter at the orchestrator and never touch
//! the camera, loop or debouncer. Host lifecycle signals arrive through
//! [`CheckinPipeline::on_hidden`] / [`CheckinPipeline::on_visible`].

use crate::camera::{AcquirePolicy, CameraBackend, CameraResourceManager, CaptureConstraints};
use crate::checkin::view::{EMPTY_MANUAL_INPUT_MESSAGE, NO_QR_IN_IMAGE_MESSAGE};
use crate::checkin::{
    CheckinClient, CheckinOrchestrator, CheckinOutcome, CheckinView, OrchestratorTiming,
    ScanControl,
};
use crate::decoder::{DecoderAdapter, QrDecoder};
use crate::error::{CameraError, Error, Result};
use crate::history::ScanHistory;
use crate::scan::{
    DebounceDecision, FrameClock, LoopState, ScanDebouncer, ScanLoopScheduler, ScanObserver,
};
use crate::state::SharedState;
use async_trait::async_trait;
use rck_common::config::{PipelineTuning, TomlConfig};
use rck_common::events::{
    CameraStatus, CheckinEvent, NavigationTarget, PayloadSource,
};
use rck_common::PayloadValidator;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

pub const CAMERA_UNSUPPORTED_MESSAGE: &str = "This device does not support camera access";
pub const CAMERA_LOADING_MESSAGE: &str = "Requesting camera access...";
pub const CAMERA_READY_MESSAGE: &str = "Camera ready. Please scan the QR code";
pub const READING_IMAGE_MESSAGE: &str = "Reading QR code from image...";
pub const MANUAL_FALLBACK_HINT: &str = "Use manual QR entry instead";

/// Characters of an uploaded code echoed back in the notice
const UPLOAD_ECHO_LEN: usize = 30;

/// Collaborators supplied by the host
pub struct PipelineDeps {
    pub backend: Arc<dyn CameraBackend>,
    pub decoder: Arc<dyn QrDecoder>,
    pub client: Arc<dyn CheckinClient>,
    pub view: Arc<dyn CheckinView>,
    /// Registration the scanner was opened from
    pub registration_id: Option<String>,
}

/// Result of the image-upload fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Image decoded but contained no QR code
    NoCode,
    /// A code was found and went through the check-in path
    Processed(CheckinOutcome),
}

fn update_camera_status(
    shared: &SharedState,
    view: &dyn CheckinView,
    status: CameraStatus,
    message: &str,
) {
    if shared.set_camera_status(status, message) && view.is_mounted() {
        view.set_camera_status(status, message);
    }
}

/// Orchestrator's handle on the scan side
struct ScanLink {
    camera: Arc<CameraResourceManager>,
    scheduler: Arc<ScanLoopScheduler>,
    shared: Arc<SharedState>,
}

#[async_trait]
impl ScanControl for ScanLink {
    async fn resume_scanning(&self) {
        // A backgrounded host resumes through `on_visible` with a fresh stream.
        if self.camera.is_suspended().await {
            debug!("Host hidden, leaving scan loop paused");
            return;
        }
        if self.scheduler.resume() {
            self.shared.broadcast_event(CheckinEvent::ScanResumed {
                timestamp: rck_common::time::now(),
            });
        }
    }

    async fn release_camera(&self) {
        self.scheduler.stop();
        self.camera.release().await;
    }
}

/// Scan loop listener: debounce, then hand off to the orchestrator
struct CameraScanObserver {
    debouncer: Arc<Mutex<ScanDebouncer>>,
    orchestrator: Arc<CheckinOrchestrator>,
    link: Arc<ScanLink>,
    view: Arc<dyn CheckinView>,
    shared: Arc<SharedState>,
}

impl CameraScanObserver {
    fn schedule_resume(&self, delay: Duration) {
        let link = Arc::clone(&self.link);
        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // A busy attempt resumes the loop itself once its hold ends.
            if orchestrator.is_busy() || orchestrator.is_completed() {
                return;
            }
            link.resume_scanning().await;
        });
    }
}

impl ScanObserver for CameraScanObserver {
    fn on_decode_result(&self, payload: String) {
        self.shared.broadcast_event(CheckinEvent::ScanPaused {
            timestamp: rck_common::time::now(),
        });

        let (decision, cooldown) = {
            let mut debouncer = self
                .debouncer
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            (debouncer.check(&payload), debouncer.cooldown())
        };

        match decision {
            DebounceDecision::Accept => {
                debug!(
                    "Forwarding scanned payload '{}'",
                    PayloadValidator::sanitize(&payload)
                );
                let orchestrator = Arc::clone(&self.orchestrator);
                let debouncer = Arc::clone(&self.debouncer);
                tokio::spawn(async move {
                    let outcome = orchestrator
                        .handle_payload(&payload, PayloadSource::Camera)
                        .await;
                    // Dropped unsubmitted (busy): don't hold it to the same-payload window.
                    if outcome == CheckinOutcome::Ignored {
                        let mut debouncer = debouncer
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                        debouncer.forget(&payload);
                    }
                });
            }
            DebounceDecision::Suppress(reason) => {
                self.shared.record_suppressed(reason);
                self.schedule_resume(cooldown);
            }
        }
    }

    fn on_camera_error(&self, error: &CameraError) {
        let message = error.user_message();
        error!("Camera unavailable: {}", error);
        update_camera_status(&self.shared, self.view.as_ref(), CameraStatus::Error, &message);
        if self.view.is_mounted() {
            self.view.show_warning(&message);
        }
    }

    fn on_cycle_tick(&self) {
        if self.shared.camera_status() == CameraStatus::Loading {
            update_camera_status(
                &self.shared,
                self.view.as_ref(),
                CameraStatus::Active,
                CAMERA_READY_MESSAGE,
            );
        }
    }
}

/// The assembled check-in pipeline
pub struct CheckinPipeline {
    camera: Arc<CameraResourceManager>,
    scheduler: Arc<ScanLoopScheduler>,
    decoder: DecoderAdapter,
    orchestrator: Arc<CheckinOrchestrator>,
    observer: Arc<CameraScanObserver>,
    view: Arc<dyn CheckinView>,
    shared: Arc<SharedState>,
    history: Arc<ScanHistory>,
    tuning: PipelineTuning,
}

impl CheckinPipeline {
    /// Assemble a pipeline; fails if the tuning parameters are inconsistent
    pub fn new(config: &TomlConfig, deps: PipelineDeps) -> Result<Self> {
        config.tuning.validate()?;
        let tuning = config.tuning.clone();

        let shared = Arc::new(SharedState::new());
        let history = Arc::new(ScanHistory::new(tuning.history_capacity));
        let decoder = DecoderAdapter::new(deps.decoder);

        let camera = Arc::new(CameraResourceManager::new(
            deps.backend,
            CaptureConstraints::from(&config.scanner),
            AcquirePolicy::from(&tuning),
        ));
        let scheduler = Arc::new(ScanLoopScheduler::new(
            Arc::clone(&camera),
            decoder.clone(),
        ));

        let link = Arc::new(ScanLink {
            camera: Arc::clone(&camera),
            scheduler: Arc::clone(&scheduler),
            shared: Arc::clone(&shared),
        });

        let orchestrator = Arc::new(CheckinOrchestrator::new(
            deps.client,
            Arc::clone(&deps.view),
            Arc::clone(&link) as Arc<dyn ScanControl>,
            Arc::clone(&shared),
            Arc::clone(&history),
            OrchestratorTiming::from(&tuning),
            deps.registration_id,
        ));

        let observer = Arc::new(CameraScanObserver {
            debouncer: Arc::new(Mutex::new(ScanDebouncer::from_tuning(&tuning))),
            orchestrator: Arc::clone(&orchestrator),
            link,
            view: Arc::clone(&deps.view),
            shared: Arc::clone(&shared),
        });

        Ok(Self {
            camera,
            scheduler,
            decoder,
            orchestrator,
            observer,
            view: deps.view,
            shared,
            history,
            tuning,
        })
    }

    /// Acquire the camera and start the scan loop
    ///
    /// On failure the loop never starts and manual entry / upload remain
    /// usable.
    pub async fn start(&self, clock: Box<dyn FrameClock>) -> Result<()> {
        if !self.camera.is_supported() {
            warn!("Camera capture not supported on this host");
            self.set_camera_status(CameraStatus::Error, CAMERA_UNSUPPORTED_MESSAGE);
            if self.view.is_mounted() {
                self.view.show_warning(MANUAL_FALLBACK_HINT);
            }
            return Err(Error::CameraUnavailable(CAMERA_UNSUPPORTED_MESSAGE.to_string()));
        }

        self.set_camera_status(CameraStatus::Loading, CAMERA_LOADING_MESSAGE);

        match self.camera.acquire().await {
            Ok(session) => {
                info!("Scanner started after {} attempt(s)", session.attempts);
            }
            Err(err) => {
                self.observer.on_camera_error(&err);
                return Err(err.into());
            }
        }

        self.scheduler
            .start(clock, Arc::clone(&self.observer) as Arc<dyn ScanObserver>)?;
        self.shared.broadcast_event(CheckinEvent::ScanResumed {
            timestamp: rck_common::time::now(),
        });
        Ok(())
    }

    /// Host went to background: pause the loop and release the camera
    pub async fn on_hidden(&self) {
        info!("Host hidden, releasing camera");
        if self.scheduler.pause() {
            self.shared.broadcast_event(CheckinEvent::ScanPaused {
                timestamp: rck_common::time::now(),
            });
        }
        self.camera.pause().await;
    }

    /// Host back in foreground: re-acquire and resume scanning
    ///
    /// The loop stays paused while an attempt is in progress; the attempt
    /// resumes it when its hold ends. Only a pipeline hidden while its loop
    /// was live re-acquires: after `stop()` or a failed `start()` nothing
    /// would ever scan or release the stream.
    pub async fn on_visible(&self) -> Result<()> {
        if self.orchestrator.is_completed() {
            debug!("Check-in completed, not re-acquiring camera");
            return Ok(());
        }
        let loop_live = matches!(
            self.scheduler.state(),
            LoopState::Running | LoopState::Paused
        );
        if !loop_live || !self.camera.is_suspended().await {
            debug!(
                "Scan loop {:?}, camera not suspended by the host; nothing to re-acquire",
                self.scheduler.state()
            );
            return Ok(());
        }
        if !self.camera.is_supported() {
            return Err(Error::CameraUnavailable(CAMERA_UNSUPPORTED_MESSAGE.to_string()));
        }

        self.set_camera_status(CameraStatus::Loading, CAMERA_LOADING_MESSAGE);
        if let Err(err) = self.camera.resume_after_pause().await {
            self.observer.on_camera_error(&err);
            return Err(err.into());
        }

        if !self.orchestrator.is_busy() && self.scheduler.resume() {
            self.shared.broadcast_event(CheckinEvent::ScanResumed {
                timestamp: rck_common::time::now(),
            });
        }
        Ok(())
    }

    /// Stop scanning for good and release the camera
    pub async fn stop(&self) {
        self.scheduler.stop();
        self.camera.release().await;
        info!("Check-in pipeline stopped");
    }

    /// Manual entry fallback
    ///
    /// Input is trimmed; empty input only warns.
    pub async fn submit_manual(&self, input: &str) -> CheckinOutcome {
        let payload = input.trim();
        if payload.is_empty() {
            if self.view.is_mounted() {
                self.view.show_warning(EMPTY_MANUAL_INPUT_MESSAGE);
            }
            return CheckinOutcome::Ignored;
        }
        self.orchestrator
            .handle_payload(payload, PayloadSource::Manual)
            .await
    }

    /// Image-upload fallback: single-shot decode, no loop, no debounce
    pub async fn submit_image(&self, path: &Path) -> Result<UploadOutcome> {
        self.set_camera_status(CameraStatus::Scanning, READING_IMAGE_MESSAGE);

        let decoder = self.decoder.clone();
        let owned: PathBuf = path.to_path_buf();
        let decoded = tokio::task::spawn_blocking(move || decoder.decode_image_file(&owned))
            .await
            .map_err(|e| Error::InvalidState(format!("image decode task failed: {}", e)))?;

        let payload = match decoded {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                warn!("No QR code found in {}", path.display());
                self.report_upload_miss();
                return Ok(UploadOutcome::NoCode);
            }
            Err(err) => {
                warn!("Could not read image {}: {}", path.display(), err);
                self.report_upload_miss();
                return Err(err);
            }
        };

        if self.view.is_mounted() {
            let echo: String = PayloadValidator::sanitize(&payload)
                .chars()
                .take(UPLOAD_ECHO_LEN)
                .collect();
            self.view.show_notice(&format!("QR found: {}...", echo));
        }

        let outcome = self
            .orchestrator
            .handle_payload(&payload, PayloadSource::Upload)
            .await;
        Ok(UploadOutcome::Processed(outcome))
    }

    fn report_upload_miss(&self) {
        if self.view.is_mounted() {
            self.view.show_warning(NO_QR_IN_IMAGE_MESSAGE);
        }
        self.set_camera_status(CameraStatus::Error, NO_QR_IN_IMAGE_MESSAGE);
    }

    fn set_camera_status(&self, status: CameraStatus, message: &str) {
        update_camera_status(&self.shared, self.view.as_ref(), status, message);
    }

    /// Switch the torch of the live camera
    pub async fn set_torch(&self, on: bool) -> Result<()> {
        self.camera.set_torch(on).await.map_err(Error::from)
    }

    /// Resolves once a check-in succeeded and the pipeline navigated away
    pub async fn wait_for_completion(&self) -> Option<NavigationTarget> {
        let mut rx = self.orchestrator.completion();
        let target = rx.wait_for(|target| target.is_some()).await.ok()?;
        target.clone()
    }

    pub fn completion(&self) -> watch::Receiver<Option<NavigationTarget>> {
        self.orchestrator.completion()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CheckinEvent> {
        self.shared.subscribe_events()
    }

    pub fn camera(&self) -> &Arc<CameraResourceManager> {
        &self.camera
    }

    pub fn scheduler(&self) -> &Arc<ScanLoopScheduler> {
        &self.scheduler
    }

    pub fn orchestrator(&self) -> &Arc<CheckinOrchestrator> {
        &self.orchestrator
    }

    pub fn history(&self) -> &Arc<ScanHistory> {
        &self.history
    }

    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    pub fn tuning(&self) -> &PipelineTuning {
        &self.tuning
    }
}
