use std::fmt;

use crate::foundation::error::{Img2VideoError, Img2VideoResult};

/// Width and height of a frame, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Img2VideoResult<Self> {
        if width == 0 || height == 0 {
            return Err(Img2VideoError::validation(
                "frame width/height must be non-zero",
            ));
        }
        Ok(Self { width, height })
    }

    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// yuv420p output subsamples chroma 2x2, so most encoders want both sides even.
    pub fn is_even(self) -> bool {
        self.width.is_multiple_of(2) && self.height.is_multiple_of(2)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Byte order of the three 8-bit channels in a packed frame.
///
/// The decoder emits this order and the encoder is told to expect it, so both sides always
/// agree on what a pixel triple means.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelLayout {
    #[default]
    Bgr24,
    Rgb24,
}

impl PixelLayout {
    pub const BYTES_PER_PIXEL: usize = 3;

    /// Name of this layout as understood by ffmpeg's `-pix_fmt`.
    pub fn ffmpeg_name(self) -> &'static str {
        match self {
            Self::Bgr24 => "bgr24",
            Self::Rgb24 => "rgb24",
        }
    }

    pub fn frame_len(self, dims: Dimensions) -> usize {
        dims.pixel_count() * Self::BYTES_PER_PIXEL
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
