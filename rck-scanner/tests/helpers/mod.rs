//! Test helper modules for rck-scanner integration tests
//!
//! Provides scripted stand-ins for every host collaborator:
//! - FakeCamera: camera backend counting live streams
//! - ScriptedDecoder, FakeClient: decode and check-in boundaries
//! - RecordingView, RecordingObserver: capture what the pipeline renders

#![allow(dead_code)]

pub mod fake_camera;
pub mod fakes;

pub use fake_camera::FakeCamera;
pub use fakes::{receipt, FakeClient, RecordingObserver, RecordingView, ScriptedDecoder, ViewCall};

use rck_common::config::TomlConfig;
use rck_scanner::scan::DisplayRefreshClock;
use rck_scanner::{CheckinPipeline, PipelineDeps};
use std::sync::{Arc, Mutex};

pub const VALID_PAYLOAD: &str =
    "CHKPT:11111111-1111-1111-1111-111111111111:22222222-2222-2222-2222-222222222222:deadbeef";

pub const OTHER_PAYLOAD: &str =
    "CHKPT:11111111-1111-1111-1111-111111111111:33333333-3333-3333-3333-333333333333:cafef00d";

/// Ordered log shared between fakes, for cross-component ordering checks
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: &str) {
        self.0.lock().unwrap().push(entry.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// A pipeline plus handles on all of its fakes
pub struct Harness {
    pub pipeline: CheckinPipeline,
    pub camera: Arc<FakeCamera>,
    pub decoder: Arc<ScriptedDecoder>,
    pub client: Arc<FakeClient>,
    pub view: Arc<RecordingView>,
}

impl Harness {
    pub fn new(
        camera: FakeCamera,
        decoder: ScriptedDecoder,
        client: FakeClient,
        view: RecordingView,
        registration_id: Option<&str>,
    ) -> Self {
        let camera = Arc::new(camera);
        let decoder = Arc::new(decoder);
        let client = Arc::new(client);
        let view = Arc::new(view);

        let deps = PipelineDeps {
            backend: camera.clone(),
            decoder: decoder.clone(),
            client: client.clone(),
            view: view.clone(),
            registration_id: registration_id.map(str::to_string),
        };
        let pipeline = CheckinPipeline::new(&TomlConfig::default(), deps)
            .expect("default config is valid");

        Self {
            pipeline,
            camera,
            decoder,
            client,
            view,
        }
    }

    /// Start the pipeline on a 60 Hz display clock
    pub async fn start(&self) -> rck_scanner::Result<()> {
        self.pipeline
            .start(Box::new(DisplayRefreshClock::new(60)))
            .await
    }
}
