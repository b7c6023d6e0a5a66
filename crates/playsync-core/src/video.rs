//! Video frame types and the display collaborator.

use std::sync::Arc;

use crate::error::MediaError;
use crate::time::MediaPoint;

/// Identifier of the texture a session renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

impl std::fmt::Display for TextureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "texture#{}", self.0)
    }
}

/// Pixel layout of decoded image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit RGBA, 4 bytes per pixel
    Rgba32,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba32 => 4,
        }
    }
}

/// A decoded image, ready to be uploaded to a texture.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// Tightly packed pixel rows
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// Creates an image from tightly packed pixel data.
    pub fn new(format: PixelFormat, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            format,
            width,
            height,
            pixels,
        }
    }

    /// Creates an opaque image of a single colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * 4);
        for _ in 0..count {
            pixels.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        Self::new(PixelFormat::Rgba32, width, height, pixels)
    }

    /// Returns the frame dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Length of `pixels` implied by the format and dimensions.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// A decoded video frame with its presentation point.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// When this frame should be displayed
    pub present_point: MediaPoint,
    /// The decoded image
    pub image: Arc<ImageData>,
}

impl VideoFrame {
    pub fn new(present_point: MediaPoint, image: Arc<ImageData>) -> Self {
        Self {
            present_point,
            image,
        }
    }
}

/// Display collaborator that accepts decoded images.
///
/// Updates are expected to hand the image off and return quickly; the session
/// thread calls this from its presentation loop.
pub trait TextureSink: Send + Sync {
    /// Replaces the contents of `texture` with `image`.
    fn update_texture(&self, texture: TextureId, image: Arc<ImageData>) -> Result<(), MediaError>;

    /// Releases `texture`. Called by the session manager once a session is gone.
    fn destroy_texture(&self, _texture: TextureId) {}
}
