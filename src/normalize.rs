use crate::config::ResizeFilter;
use crate::decode::FrameBuffer;
use crate::foundation::core::Dimensions;

/// Conform `frame` to `reference`.
///
/// Frames that already match are returned as-is; anything else is resampled with `filter`.
pub fn normalize(frame: FrameBuffer, reference: Dimensions, filter: ResizeFilter) -> FrameBuffer {
    let got = frame.dimensions();
    if got == reference {
        return frame;
    }

    tracing::debug!(from = %got, to = %reference, "resizing frame");
    let resized = image::imageops::resize(
        frame.pixels(),
        reference.width,
        reference.height,
        filter.to_image_filter(),
    );
    frame.with_pixels(resized)
}

#[cfg(test)]
#[path = "../tests/unit/normalize.rs"]
mod tests;
