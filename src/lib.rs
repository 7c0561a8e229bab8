//! img2video turns a numbered image sequence into a single video file.
//!
//! Frames named `<prefix>_<n>.<ext>` are located and ordered by `n`, then decoded into packed
//! 3-channel buffers. Each frame is conformed to the first frame's size and streamed, raw, into
//! the stdin of a system `ffmpeg` (hardware encoder by default):
//!
//! - [`locate_frames`]: discovery and numeric ordering
//! - [`read_frame`]: decode into a [`FrameBuffer`]
//! - [`normalize`]: resize to the reference [`Dimensions`]
//! - [`FfmpegSink`]: the encoder process and its pipes
//! - [`Pipeline`]: wires the above together for one run
#![forbid(unsafe_code)]

mod foundation;

pub mod config;
pub mod decode;
pub mod encode;
pub mod locate;
pub mod normalize;
pub mod pipeline;

pub use crate::foundation::core::{Dimensions, PixelLayout};
pub use crate::foundation::error::{Img2VideoError, Img2VideoResult};

pub use crate::config::{EncoderConfig, PipelineConfig, ResizeFilter};
pub use crate::decode::{DecodeOutcome, FrameBuffer, read_frame};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::locate::{FrameFile, SortKey, SortKeyExtractor, locate_frames};
pub use crate::normalize::normalize;
pub use crate::pipeline::{Pipeline, RunReport};
