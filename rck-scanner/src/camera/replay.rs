//! Directory replay camera
//!
//! Feeds the image files of a directory to the pipeline as if they were live
//! video frames, looping forever. Used by the kiosk binary on machines where
//! the real camera is driven by an external capture tool that drops
//! snapshots into a folder, and for bench-testing printed checkpoint codes.

use super::backend::{CameraBackend, CameraStream, CaptureConstraints};
use crate::decoder::load_still_image;
use crate::error::CameraError;
use crate::scan::frame::FrameBuffer;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp"];

/// Camera backend replaying still images from a directory
#[derive(Debug, Clone)]
pub struct DirectoryReplayCamera {
    dir: PathBuf,
}

impl DirectoryReplayCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl CameraBackend for DirectoryReplayCamera {
    fn is_supported(&self) -> bool {
        self.dir.is_dir()
    }

    async fn open(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraError> {
        if let Some(mode) = constraints.facing_mode {
            debug!("Replay camera has no facing modes, ignoring '{}'", mode);
        }

        let dir = self.dir.clone();
        let frames = tokio::task::spawn_blocking(move || load_frames(&dir))
            .await
            .map_err(|e| CameraError::Unknown(format!("frame loader failed: {}", e)))??;

        info!(
            "Replay camera opened {} with {} frame(s)",
            self.dir.display(),
            frames.len()
        );
        Ok(Box::new(ReplayStream {
            frames,
            cursor: 0,
            playing: false,
            stopped: false,
        }))
    }
}

fn load_frames(dir: &Path) -> Result<Vec<FrameBuffer>, CameraError> {
    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CameraError::NoCamera,
        std::io::ErrorKind::PermissionDenied => CameraError::PermissionDenied,
        _ => CameraError::Unknown(e.to_string()),
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let frames: Vec<FrameBuffer> = paths
        .iter()
        .filter_map(|path| match load_still_image(path) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("Skipping unreadable frame {}: {}", path.display(), e);
                None
            }
        })
        .collect();

    if frames.is_empty() {
        return Err(CameraError::NoCamera);
    }
    Ok(frames)
}

struct ReplayStream {
    frames: Vec<FrameBuffer>,
    cursor: usize,
    playing: bool,
    stopped: bool,
}

#[async_trait]
impl CameraStream for ReplayStream {
    async fn start(&mut self) -> Result<(), CameraError> {
        if self.stopped {
            return Err(CameraError::Unknown("stream already stopped".to_string()));
        }
        self.playing = true;
        Ok(())
    }

    fn has_enough_data(&self) -> bool {
        self.playing && !self.stopped
    }

    fn frame_size(&self) -> (u32, u32) {
        self.frames
            .get(self.cursor)
            .map(|f| (f.width(), f.height()))
            .unwrap_or((0, 0))
    }

    fn read_frame(&mut self, buffer: &mut FrameBuffer) -> bool {
        let Some(frame) = self.frames.get(self.cursor) else {
            return false;
        };
        if buffer.pixels().len() != frame.pixels().len() {
            return false;
        }
        buffer.pixels_mut().copy_from_slice(frame.pixels());
        self.cursor = (self.cursor + 1) % self.frames.len();
        true
    }

    fn stop(&mut self) {
        if !self.stopped {
            debug!("Replay stream stopped");
        }
        self.playing = false;
        self.stopped = true;
    }
}
