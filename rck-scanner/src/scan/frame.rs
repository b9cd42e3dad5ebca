//! Off-screen bitmap buffer for decode cycles
//!
//! RGBA8, row-major, no padding. The buffer is resized to each frame's native
//! resolution and reused across cycles.

use crate::error::{Error, Result};

/// Bytes per pixel (RGBA)
pub const BYTES_PER_PIXEL: usize = 4;

/// Reusable RGBA pixel buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl FrameBuffer {
    /// Empty buffer; sized on first capture
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeroed buffer of the given size
    pub fn with_size(width: u32, height: u32) -> Self {
        let mut buffer = Self::new();
        buffer.resize(width, height);
        buffer
    }

    /// Wrap existing RGBA pixels
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = byte_len(width, height);
        if pixels.len() != expected {
            return Err(Error::Frame(format!(
                "{}x{} frame needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Resize to a frame's native resolution, keeping the allocation
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.resize(byte_len(width, height), 0);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Luma (BT.601 integer approximation) of one pixel; 0 outside the frame
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let r = u32::from(self.pixels[offset]);
        let g = u32::from(self.pixels[offset + 1]);
        let b = u32::from(self.pixels[offset + 2]);
        ((r * 299 + g * 587 + b * 114) / 1000) as u8
    }
}

fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_PIXEL
}
