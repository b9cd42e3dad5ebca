//! Image decoder adapter
//!
//! Wraps a QR decoding capability (bitmap → text) behind [`QrDecoder`] and
//! guarantees the pipeline contract: malformed or QR-free input yields
//! `None`, never a failure. Decoder panics are caught and logged.
//!
//! [`RqrrDecoder`] is the production capability; tests supply scripted ones.

use crate::error::Result;
use crate::scan::frame::FrameBuffer;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// QR decoding capability
///
/// Implementations may return `None` freely; they should not panic, but the
/// adapter tolerates it.
pub trait QrDecoder: Send + Sync {
    /// Extract the text of the first QR code found in `frame`
    fn decode(&self, frame: &FrameBuffer) -> Option<String>;
}

/// Pipeline-facing adapter around a [`QrDecoder`]
#[derive(Clone)]
pub struct DecoderAdapter {
    inner: Arc<dyn QrDecoder>,
}

impl std::fmt::Debug for DecoderAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderAdapter").finish_non_exhaustive()
    }
}

impl DecoderAdapter {
    pub fn new(inner: Arc<dyn QrDecoder>) -> Self {
        Self { inner }
    }

    /// Decode one frame synchronously
    ///
    /// Returns `None` for empty frames, empty results, and decoder panics.
    pub fn decode(&self, frame: &FrameBuffer) -> Option<String> {
        if frame.is_empty() {
            return None;
        }

        match panic::catch_unwind(AssertUnwindSafe(|| self.inner.decode(frame))) {
            Ok(Some(text)) if !text.is_empty() => Some(text),
            Ok(_) => None,
            Err(_) => {
                warn!(
                    "QR decoder panicked on {}x{} frame, treating as no result",
                    frame.width(),
                    frame.height()
                );
                None
            }
        }
    }

    /// Single-shot decode of a still image file (upload fallback)
    ///
    /// Unreadable files are an error; a readable image without a QR code
    /// is `Ok(None)`.
    pub fn decode_image_file(&self, path: &Path) -> Result<Option<String>> {
        let frame = load_still_image(path)?;
        debug!(
            "Decoding uploaded image {} ({}x{})",
            path.display(),
            frame.width(),
            frame.height()
        );
        Ok(self.decode(&frame))
    }
}

/// Load a still image (PNG, JPEG, ...) into an RGBA frame buffer
pub fn load_still_image(path: &Path) -> Result<FrameBuffer> {
    let rgba = image::open(path)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    FrameBuffer::from_rgba(width, height, rgba.into_raw())
}

/// Decode image bytes already in memory
pub fn load_still_image_bytes(bytes: &[u8]) -> Result<FrameBuffer> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    FrameBuffer::from_rgba(width, height, rgba.into_raw())
}

/// QR decoder backed by the `rqrr` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct RqrrDecoder;

impl QrDecoder for RqrrDecoder {
    fn decode(&self, frame: &FrameBuffer) -> Option<String> {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            frame.width() as usize,
            frame.height() as usize,
            |x, y| frame.luma(x as u32, y as u32),
        );

        prepared
            .detect_grids()
            .into_iter()
            .find_map(|grid| grid.decode().ok().map(|(_meta, content)| content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<&'static str>);

    impl QrDecoder for Fixed {
        fn decode(&self, _frame: &FrameBuffer) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    struct Panicking;

    impl QrDecoder for Panicking {
        fn decode(&self, _frame: &FrameBuffer) -> Option<String> {
            panic!("corrupt finder pattern");
        }
    }

    #[test]
    fn test_passes_through_result() {
        let adapter = DecoderAdapter::new(Arc::new(Fixed(Some("CHKPT:abc"))));
        let frame = FrameBuffer::with_size(4, 4);
        assert_eq!(adapter.decode(&frame).as_deref(), Some("CHKPT:abc"));
    }

    #[test]
    fn test_empty_string_is_no_result() {
        let adapter = DecoderAdapter::new(Arc::new(Fixed(Some(""))));
        assert!(adapter.decode(&FrameBuffer::with_size(4, 4)).is_none());
    }

    #[test]
    fn test_empty_frame_skips_decoder() {
        let adapter = DecoderAdapter::new(Arc::new(Panicking));
        assert!(adapter.decode(&FrameBuffer::new()).is_none());
    }

    #[test]
    fn test_panic_is_no_result() {
        let adapter = DecoderAdapter::new(Arc::new(Panicking));
        assert!(adapter.decode(&FrameBuffer::with_size(8, 8)).is_none());
    }

    #[test]
    fn test_rqrr_blank_frame_has_no_code() {
        let adapter = DecoderAdapter::new(Arc::new(RqrrDecoder));
        let mut frame = FrameBuffer::with_size(64, 64);
        frame.pixels_mut().fill(255);
        assert!(adapter.decode(&frame).is_none());
    }

    #[test]
    fn test_garbage_image_bytes_are_an_error() {
        assert!(load_still_image_bytes(b"definitely not a png").is_err());
    }

    #[test]
    fn test_missing_image_file_is_an_error() {
        let adapter = DecoderAdapter::new(Arc::new(RqrrDecoder));
        assert!(adapter
            .decode_image_file(Path::new("/nonexistent/qr.png"))
            .is_err());
    }
}
