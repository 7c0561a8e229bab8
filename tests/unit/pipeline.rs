use std::path::Path;
use std::sync::{Arc, Mutex};

use super::*;
use crate::decode::FrameBuffer;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::PixelLayout;

fn write_frame(dir: &Path, n: u32, w: u32, h: u32) {
    let shade = u8::try_from(n * 10).unwrap();
    image::RgbImage::from_pixel(w, h, image::Rgb([shade, 0, 0]))
        .save(dir.join(format!("train_{n}.png")))
        .unwrap();
}

fn cfg_for(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        image_dir: dir.to_path_buf(),
        extension: "png".to_string(),
        pixel_layout: PixelLayout::Rgb24,
        ..PipelineConfig::default()
    }
}

fn shades(sink: &InMemorySink) -> Vec<u8> {
    sink.frames().iter().map(|f| f.as_bytes()[0]).collect()
}

#[test]
fn frames_are_fed_in_numeric_order() {
    let dir = tempfile::tempdir().unwrap();
    for n in [3, 0, 11, 1, 2] {
        write_frame(dir.path(), n, 4, 4);
    }

    let mut sink = InMemorySink::new();
    let report = Pipeline::new(cfg_for(dir.path()))
        .unwrap()
        .run_with_sink(&mut sink)
        .unwrap();

    assert_eq!(shades(&sink), [0, 10, 20, 30, 110]);
    assert_eq!(report.frames_located, 5);
    assert_eq!(report.frames_fed, 5);
    assert_eq!(report.frames_skipped, 0);
    assert_eq!(report.feed_error, None);
    assert!(sink.is_ended());
    assert_eq!(
        report.output_path,
        dir.path().join("render_h264_nvenc.mp4")
    );
}

#[test]
fn every_frame_is_conformed_to_the_first_frames_size() {
    let dir = tempfile::tempdir().unwrap();
    write_frame(dir.path(), 0, 8, 6);
    write_frame(dir.path(), 1, 8, 6);
    write_frame(dir.path(), 2, 16, 12);
    write_frame(dir.path(), 3, 5, 7);

    let mut sink = InMemorySink::new();
    let report = Pipeline::new(cfg_for(dir.path()))
        .unwrap()
        .run_with_sink(&mut sink)
        .unwrap();

    let reference = Dimensions::new(8, 6).unwrap();
    assert_eq!(report.dimensions, reference);
    assert_eq!(sink.config().unwrap().dimensions, reference);
    assert_eq!(sink.frames().len(), 4);
    assert!(sink.frames().iter().all(|f| f.dimensions() == reference));
    assert_eq!(report.frames_resized, 2);
}

#[test]
fn empty_directory_fails_before_the_sink_starts() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

    let mut sink = InMemorySink::new();
    let err = Pipeline::new(cfg_for(dir.path()))
        .unwrap()
        .run_with_sink(&mut sink)
        .unwrap_err();

    assert!(matches!(err, Img2VideoError::Discovery(_)), "{err}");
    assert!(err.to_string().contains("train_*.png"));
    assert!(sink.config().is_none());
}

#[test]
fn unreadable_first_frame_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("train_0.png"), b"garbage").unwrap();
    write_frame(dir.path(), 1, 4, 4);

    let mut sink = InMemorySink::new();
    let err = Pipeline::new(cfg_for(dir.path()))
        .unwrap()
        .run_with_sink(&mut sink)
        .unwrap_err();

    assert!(matches!(err, Img2VideoError::Decode(_)), "{err}");
    assert!(sink.config().is_none());
}

#[test]
fn unreadable_interior_frame_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    for n in 0..5 {
        write_frame(dir.path(), n, 4, 4);
    }
    std::fs::write(dir.path().join("train_2.png"), b"truncated").unwrap();

    let mut sink = InMemorySink::new();
    let report = Pipeline::new(cfg_for(dir.path()))
        .unwrap()
        .run_with_sink(&mut sink)
        .unwrap();

    assert_eq!(shades(&sink), [0, 10, 30, 40]);
    assert_eq!(report.frames_fed, 4);
    assert_eq!(report.frames_skipped, 1);
}

#[test]
fn feed_failure_stops_the_loop_but_still_ends_the_sink() {
    let dir = tempfile::tempdir().unwrap();
    for n in 0..6 {
        write_frame(dir.path(), n, 4, 4);
    }

    let mut sink = InMemorySink::closing_after(3);
    let report = Pipeline::new(cfg_for(dir.path()))
        .unwrap()
        .run_with_sink(&mut sink)
        .unwrap();

    assert_eq!(report.frames_fed, 3);
    assert!(report.feed_error.is_some());
    assert!(sink.is_ended());
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let cfg = PipelineConfig {
        fps: 0,
        ..PipelineConfig::default()
    };
    assert!(matches!(
        Pipeline::new(cfg),
        Err(Img2VideoError::Validation(_))
    ));
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buf = LogBuffer::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buf.0.lock().unwrap()).into_owned();
    (out, logs)
}

/// Sink whose encoder can never be started.
#[derive(Default)]
struct UnlaunchableSink {
    begin_calls: usize,
    pushed: usize,
    ended: bool,
}

impl FrameSink for UnlaunchableSink {
    fn begin(&mut self, _cfg: SinkConfig) -> Img2VideoResult<()> {
        self.begin_calls += 1;
        Err(Img2VideoError::launch("'ffmpeg' not found"))
    }

    fn push_frame(&mut self, _frame: &FrameBuffer) -> Img2VideoResult<()> {
        self.pushed += 1;
        Ok(())
    }

    fn end(&mut self) -> Img2VideoResult<()> {
        self.ended = true;
        Ok(())
    }
}

/// Sink that takes every frame but whose encoder exits nonzero.
#[derive(Default)]
struct FailingExitSink {
    pushed: usize,
}

impl FrameSink for FailingExitSink {
    fn begin(&mut self, _cfg: SinkConfig) -> Img2VideoResult<()> {
        Ok(())
    }

    fn push_frame(&mut self, _frame: &FrameBuffer) -> Img2VideoResult<()> {
        self.pushed += 1;
        Ok(())
    }

    fn end(&mut self) -> Img2VideoResult<()> {
        Err(Img2VideoError::EncoderExit {
            code: Some(1),
            diagnostics: "bad param".to_string(),
        })
    }
}

#[test]
fn launch_failure_reads_nothing_past_the_first_frame() {
    let dir = tempfile::tempdir().unwrap();
    write_frame(dir.path(), 0, 4, 4);
    std::fs::write(dir.path().join("train_1.png"), b"corrupt").unwrap();
    write_frame(dir.path(), 2, 4, 4);
    let pipeline = Pipeline::new(cfg_for(dir.path())).unwrap();

    let mut sink = UnlaunchableSink::default();
    let (result, logs) = with_captured_logs(|| pipeline.run_with_sink(&mut sink));

    let err = result.unwrap_err();
    assert!(matches!(err, Img2VideoError::Launch(_)), "{err}");
    assert_eq!(sink.begin_calls, 1);
    assert_eq!(sink.pushed, 0);
    assert!(!sink.ended);
    // Reading train_1.png would have logged it as skipped.
    assert!(!logs.contains("train_1.png"), "{logs}");

    let mut working = InMemorySink::new();
    let (report, logs) = with_captured_logs(|| pipeline.run_with_sink(&mut working));
    assert_eq!(report.unwrap().frames_skipped, 1);
    assert!(logs.contains("train_1.png"), "{logs}");
}

#[test]
fn encoder_failure_still_logs_the_run_counts() {
    let dir = tempfile::tempdir().unwrap();
    for n in 0..3 {
        write_frame(dir.path(), n, 4, 4);
    }
    std::fs::write(dir.path().join("train_3.png"), b"corrupt").unwrap();
    let pipeline = Pipeline::new(cfg_for(dir.path())).unwrap();

    let mut sink = FailingExitSink::default();
    let (result, logs) = with_captured_logs(|| pipeline.run_with_sink(&mut sink));

    match result.unwrap_err() {
        Img2VideoError::EncoderExit { code, diagnostics } => {
            assert_eq!(code, Some(1));
            assert_eq!(diagnostics, "bad param");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(sink.pushed, 3);
    let failure = logs
        .lines()
        .find(|l| l.contains("encoder failed"))
        .unwrap_or_else(|| panic!("no failure line in:\n{logs}"));
    assert!(failure.contains("fed=3"), "{failure}");
    assert!(failure.contains("skipped=1"), "{failure}");
    assert!(failure.contains("feed_error=\"none\"") || failure.contains("feed_error=none"));
}
