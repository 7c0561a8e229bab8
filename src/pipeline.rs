//! The driver: locate, decode, normalize and feed every frame, then finish the encode.

use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::decode::{DecodeOutcome, read_frame};
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::Dimensions;
use crate::foundation::error::{Img2VideoError, Img2VideoResult};
use crate::locate::locate_frames;
use crate::normalize::normalize;

/// Outcome of a run whose encoder exited successfully.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub output_path: PathBuf,
    /// Reference dimensions, taken from the first frame.
    pub dimensions: Dimensions,
    pub frames_located: usize,
    pub frames_fed: u64,
    /// Frames after the first that could not be decoded.
    pub frames_skipped: u64,
    pub frames_resized: u64,
    /// Set when the encoder stopped accepting input before every frame was written.
    pub feed_error: Option<String>,
}

/// One configured frames-to-video run.
#[derive(Clone, Debug)]
pub struct Pipeline {
    cfg: PipelineConfig,
}

impl Pipeline {
    pub fn new(cfg: PipelineConfig) -> Img2VideoResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    /// Encode with the configured external encoder.
    pub fn run(&self) -> Img2VideoResult<RunReport> {
        let mut sink = FfmpegSink::new(FfmpegSinkOpts::from_config(&self.cfg));
        self.run_with_sink(&mut sink)
    }

    /// Feed every located frame into `sink`.
    ///
    /// Fatal before any frame is fed: no frames found, first frame unreadable, `sink.begin`
    /// failing. Later unreadable frames are skipped. A feed failure stops the loop, and the
    /// sink is still ended.
    #[tracing::instrument(skip(self, sink), fields(dir = %self.cfg.image_dir.display()))]
    pub fn run_with_sink(&self, sink: &mut dyn FrameSink) -> Img2VideoResult<RunReport> {
        let cfg = &self.cfg;
        let files = locate_frames(&cfg.image_dir, &cfg.prefix, &cfg.extension)?;
        let Some(first_file) = files.first() else {
            return Err(Img2VideoError::discovery(format!(
                "no frames matching '{}' in '{}'",
                cfg.frame_pattern(),
                cfg.image_dir.display()
            )));
        };
        tracing::info!(count = files.len(), "located frames");

        let first_frame = match read_frame(&first_file.path, cfg.pixel_layout) {
            DecodeOutcome::Decoded(frame) => frame,
            DecodeOutcome::Unreadable { reason } => {
                return Err(Img2VideoError::decode(format!(
                    "could not read the first frame: {reason}"
                )));
            }
        };
        let reference = first_frame.dimensions();
        let mut first = Some(first_frame);

        let output_path = cfg.output_path();
        tracing::info!(
            dimensions = %reference,
            fps = cfg.fps,
            codec = %cfg.encoder.codec,
            output = %output_path.display(),
            "starting encoder"
        );
        sink.begin(SinkConfig {
            dimensions: reference,
            layout: cfg.pixel_layout,
            fps: cfg.fps,
        })?;

        let mut report = RunReport {
            output_path,
            dimensions: reference,
            frames_located: files.len(),
            frames_fed: 0,
            frames_skipped: 0,
            frames_resized: 0,
            feed_error: None,
        };
        let mut push_err = None;

        for file in &files {
            // The first frame was already decoded to establish the reference size.
            let outcome = match first.take() {
                Some(frame) => DecodeOutcome::Decoded(frame),
                None => read_frame(&file.path, cfg.pixel_layout),
            };
            let frame = match outcome {
                DecodeOutcome::Decoded(frame) => frame,
                DecodeOutcome::Unreadable { reason } => {
                    tracing::warn!(path = %file.path.display(), %reason, "skipping unreadable frame");
                    report.frames_skipped += 1;
                    continue;
                }
            };

            if frame.dimensions() != reference {
                report.frames_resized += 1;
            }
            let frame = normalize(frame, reference, cfg.resize_filter);

            if let Err(e) = sink.push_frame(&frame) {
                push_err = Some(e);
                break;
            }
            report.frames_fed += 1;
            if report.frames_fed.is_multiple_of(cfg.progress_every) {
                tracing::info!("processed {} frames", report.frames_fed);
            }
        }

        match push_err {
            Some(Img2VideoError::Feed(msg)) => {
                tracing::warn!(fed = report.frames_fed, error = %msg, "stopped feeding frames");
                report.feed_error = Some(msg);
            }
            Some(other) => {
                // Still reap the encoder; the frame error is the one worth reporting.
                if let Err(e) = sink.end() {
                    tracing::warn!(error = %e, "encoder finish failed after frame error");
                }
                return Err(other);
            }
            None => {}
        }

        tracing::info!(
            fed = report.frames_fed,
            skipped = report.frames_skipped,
            resized = report.frames_resized,
            "waiting for encoder to finish"
        );
        if let Err(e) = sink.end() {
            tracing::error!(
                fed = report.frames_fed,
                skipped = report.frames_skipped,
                resized = report.frames_resized,
                feed_error = report.feed_error.as_deref().unwrap_or("none"),
                output = %report.output_path.display(),
                "encoder failed"
            );
            return Err(e);
        }
        Ok(report)
    }
}

#[cfg(test)]
#[path = "../tests/unit/pipeline.rs"]
mod tests;
