use crate::decode::FrameBuffer;
use crate::foundation::core::{Dimensions, PixelLayout};
use crate::foundation::error::{Img2VideoError, Img2VideoResult};

/// Stream parameters handed to a [`FrameSink`] before the first frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    /// Every pushed frame has exactly these dimensions.
    pub dimensions: Dimensions,
    pub layout: PixelLayout,
    pub fps: u32,
}

/// Consumer of frames in sequence order.
///
/// `begin` is called once, then `push_frame` zero or more times, then `end` once. A failed
/// `push_frame` ends feeding but `end` is still called.
pub trait FrameSink {
    fn begin(&mut self, cfg: SinkConfig) -> Img2VideoResult<()>;
    fn push_frame(&mut self, frame: &FrameBuffer) -> Img2VideoResult<()>;
    fn end(&mut self) -> Img2VideoResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<FrameBuffer>,
    accept_limit: Option<usize>,
    ended: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that refuses frames after the first `n`, like an encoder that quit early.
    pub fn closing_after(n: usize) -> Self {
        Self {
            accept_limit: Some(n),
            ..Self::default()
        }
    }

    /// The configuration captured in `begin`, if it was called.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    pub fn frames(&self) -> &[FrameBuffer] {
        &self.frames
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> Img2VideoResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameBuffer) -> Img2VideoResult<()> {
        if self.cfg.is_none() {
            return Err(Img2VideoError::validation("in-memory sink not started"));
        }
        if let Some(limit) = self.accept_limit
            && self.frames.len() >= limit
        {
            return Err(Img2VideoError::feed("in-memory sink closed its input"));
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn end(&mut self) -> Img2VideoResult<()> {
        self.ended = true;
        Ok(())
    }
}
