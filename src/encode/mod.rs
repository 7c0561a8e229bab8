//! Encoder bridge: sinks that consume normalized frames in order.

/// Sink that spawns an external `ffmpeg` and streams raw frames to its stdin.
pub mod ffmpeg;
/// Generic frame sink trait and the in-memory sink.
pub mod sink;
