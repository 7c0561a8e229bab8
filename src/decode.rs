//! Frame reader: decode an image file into a packed 3-channel frame.

use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::{Dimensions, PixelLayout};

/// A decoded frame: packed, row-major, three 8-bit channels in `layout` order, no padding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    layout: PixelLayout,
    pixels: image::RgbImage,
}

impl FrameBuffer {
    /// Wrap an RGB image, reordering channels when `layout` is not RGB.
    pub fn from_rgb(mut img: image::RgbImage, layout: PixelLayout) -> Self {
        if layout == PixelLayout::Bgr24 {
            for px in img.chunks_exact_mut(3) {
                px.swap(0, 2);
            }
        }
        Self {
            layout,
            pixels: img,
        }
    }

    pub(crate) fn with_pixels(&self, pixels: image::RgbImage) -> Self {
        Self {
            layout: self.layout,
            pixels,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        let (width, height) = self.pixels.dimensions();
        Dimensions { width, height }
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub(crate) fn pixels(&self) -> &image::RgbImage {
        &self.pixels
    }

    /// The bytes exactly as they go down the encoder pipe.
    pub fn as_bytes(&self) -> &[u8] {
        self.pixels.as_raw()
    }
}

/// Result of trying to decode one frame file.
///
/// Unreadable files are an expected outcome, not an error: the caller decides whether that
/// is fatal.
#[derive(Debug)]
pub enum DecodeOutcome {
    Decoded(FrameBuffer),
    Unreadable { reason: String },
}

/// Decode `path` into a frame in `layout` channel order.
///
/// The format is sniffed from the file contents, so a misnamed file still decodes.
pub fn read_frame(path: &Path, layout: PixelLayout) -> DecodeOutcome {
    match decode_rgb8(path) {
        Ok(img) => DecodeOutcome::Decoded(FrameBuffer::from_rgb(img, layout)),
        Err(e) => DecodeOutcome::Unreadable {
            reason: format!("{e:#}"),
        },
    }
}

fn decode_rgb8(path: &Path) -> anyhow::Result<image::RgbImage> {
    let reader = image::ImageReader::open(path)
        .with_context(|| format!("open '{}'", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("sniff image format of '{}'", path.display()))?;
    let img = reader
        .decode()
        .with_context(|| format!("decode '{}'", path.display()))?;
    anyhow::ensure!(
        img.width() > 0 && img.height() > 0,
        "'{}' decoded to an empty image",
        path.display()
    );
    Ok(img.to_rgb8())
}

#[cfg(test)]
#[path = "../tests/unit/decode.rs"]
mod tests;
