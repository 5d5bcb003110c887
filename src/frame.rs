//! PNG output.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};

use crate::error::ExtractorError;

/// MIME type of [`ExtractedFrame::bytes`].
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// A decoded frame encoded as PNG in memory.
#[derive(Clone, PartialEq, Eq)]
#[must_use]
pub struct ExtractedFrame {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

impl std::fmt::Debug for ExtractedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractedFrame")
            .field("len", &self.bytes.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl ExtractedFrame {
    /// Encode `image` as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::Image`] if encoding fails.
    pub fn encode_png(image: &DynamicImage) -> Result<Self, ExtractorError> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        log::debug!(
            "Encoded {}x{} frame as {} PNG bytes",
            image.width(),
            image.height(),
            bytes.len()
        );
        Ok(Self {
            bytes,
            width: image.width(),
            height: image.height(),
        })
    }

    /// The PNG bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the frame, returning the PNG bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    #[test]
    fn encodes_decodable_png() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 36, Rgb([200, 10, 30])));
        let frame = ExtractedFrame::encode_png(&image).unwrap();

        assert_eq!((frame.width(), frame.height()), (64, 36));
        assert!(frame.bytes().starts_with(b"\x89PNG\r\n\x1a\n"));

        let decoded = image::load_from_memory_with_format(frame.bytes(), ImageFormat::Png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 36));
        assert_eq!(decoded.to_rgb8().get_pixel(10, 10), &Rgb([200, 10, 30]));
    }
}
