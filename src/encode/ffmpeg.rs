use std::io::{Read as _, Write as _};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

use crate::config::{EncoderConfig, PipelineConfig};
use crate::decode::FrameBuffer;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::Dimensions;
use crate::foundation::error::{Img2VideoError, Img2VideoResult};

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output container path.
    pub out_path: PathBuf,
    /// Program, codec and rate-control settings.
    pub encoder: EncoderConfig,
}

impl FfmpegSinkOpts {
    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self {
            out_path: cfg.output_path(),
            encoder: cfg.encoder.clone(),
        }
    }
}

struct Running {
    child: Child,
    /// `None` once the input has been closed, either at `end` or after a failed write.
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    cfg: SinkConfig,
}

enum SessionState {
    NotStarted,
    Running(Box<Running>),
    Terminated,
}

/// Sink that spawns an external encoder and streams raw frames to its stdin.
///
/// The child is waited on exactly once: by [`FrameSink::end`], or by `Drop` when the sink is
/// abandoned mid-run.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    state: SessionState,
}

impl FfmpegSink {
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            state: SessionState::NotStarted,
        }
    }

    fn running_mut(&mut self) -> Img2VideoResult<&mut Running> {
        match &mut self.state {
            SessionState::Running(r) => Ok(&mut **r),
            SessionState::NotStarted => Err(Img2VideoError::validation("encoder not started")),
            SessionState::Terminated => {
                Err(Img2VideoError::validation("encoder is already finalized"))
            }
        }
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> Img2VideoResult<()> {
        if !matches!(self.state, SessionState::NotStarted) {
            return Err(Img2VideoError::validation("encoder session already started"));
        }
        if cfg.fps == 0 {
            return Err(Img2VideoError::validation("fps must be non-zero"));
        }
        Dimensions::new(cfg.dimensions.width, cfg.dimensions.height)?;
        if !cfg.dimensions.is_even() {
            tracing::warn!(
                dimensions = %cfg.dimensions,
                pix_fmt = %self.opts.encoder.output_pix_fmt,
                "odd frame dimensions; most encoders reject these for 4:2:0 output"
            );
        }
        if !self.opts.encoder.overwrite && self.opts.out_path.exists() {
            return Err(Img2VideoError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }

        let mut cmd = build_command(&self.opts, &cfg);
        tracing::debug!(command = ?cmd, "spawning encoder");

        let program = self.opts.encoder.program.display().to_string();
        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Img2VideoError::launch(format!(
                    "'{program}' not found (is it installed and on PATH?)"
                ))
            } else {
                Img2VideoError::launch(format!("failed to spawn '{program}': {e}"))
            }
        })?;

        let stdin = child.stdin.take();
        let stderr = child.stderr.take();
        // Drain stderr concurrently so a chatty encoder cannot fill the pipe and stall our
        // writes to its stdin.
        let stderr_drain = stderr.map(|mut stderr| {
            std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
                let mut bytes = Vec::new();
                stderr.read_to_end(&mut bytes)?;
                Ok(bytes)
            })
        });
        let has_stdin = stdin.is_some();

        // From here on `Drop` owns reaping the child, even on the error path below.
        self.state = SessionState::Running(Box::new(Running {
            child,
            stdin,
            stderr_drain,
            cfg,
        }));

        if !has_stdin {
            return Err(Img2VideoError::launch(
                "failed to open encoder stdin (unexpected)",
            ));
        }
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameBuffer) -> Img2VideoResult<()> {
        let running = self.running_mut()?;
        let cfg = running.cfg;

        if frame.dimensions() != cfg.dimensions {
            return Err(Img2VideoError::validation(format!(
                "frame size mismatch: got {}, expected {}",
                frame.dimensions(),
                cfg.dimensions
            )));
        }
        if frame.layout() != cfg.layout {
            return Err(Img2VideoError::validation(format!(
                "frame layout mismatch: got {}, expected {}",
                frame.layout().ffmpeg_name(),
                cfg.layout.ffmpeg_name()
            )));
        }

        let Some(stdin) = running.stdin.as_mut() else {
            return Err(Img2VideoError::feed("encoder input is already closed"));
        };

        if let Err(e) = stdin.write_all(frame.as_bytes()) {
            // Close our end now; `end` will only wait.
            running.stdin = None;
            let msg = if e.kind() == std::io::ErrorKind::BrokenPipe {
                "encoder closed its input unexpectedly (check encoder parameters)".to_string()
            } else {
                format!("failed to write frame to encoder stdin: {e}")
            };
            return Err(Img2VideoError::feed(msg));
        }
        Ok(())
    }

    fn end(&mut self) -> Img2VideoResult<()> {
        let running = match std::mem::replace(&mut self.state, SessionState::Terminated) {
            SessionState::Running(r) => r,
            SessionState::NotStarted => {
                self.state = SessionState::NotStarted;
                return Err(Img2VideoError::validation("encoder not started"));
            }
            SessionState::Terminated => {
                return Err(Img2VideoError::validation("encoder is already finalized"));
            }
        };

        // TODO: optional wall-clock limit that kills an encoder which never exits.
        let (status, stderr_bytes) = close_and_wait(*running)?;

        if !status.success() {
            let diagnostics = String::from_utf8_lossy(&stderr_bytes).trim().to_string();
            return Err(Img2VideoError::EncoderExit {
                code: status.code(),
                diagnostics,
            });
        }
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if let SessionState::Running(running) =
            std::mem::replace(&mut self.state, SessionState::Terminated)
        {
            tracing::debug!("encoder session dropped before end; reaping child");
            if let Err(e) = close_and_wait(*running) {
                tracing::warn!(error = %e, "failed to reap encoder process");
            }
        }
    }
}

/// Close stdin (if still open), wait for exit, then collect everything written to stderr.
fn close_and_wait(mut running: Running) -> Img2VideoResult<(ExitStatus, Vec<u8>)> {
    drop(running.stdin.take());

    let status = running.child.wait().map_err(|e| {
        Img2VideoError::Other(anyhow::anyhow!("failed to wait for encoder to finish: {e}"))
    })?;

    let stderr_bytes = match running.stderr_drain.take() {
        Some(handle) => handle
            .join()
            .map_err(|_| Img2VideoError::Other(anyhow::anyhow!("stderr drain thread panicked")))?
            .map_err(|e| Img2VideoError::Other(anyhow::anyhow!("encoder stderr read failed: {e}")))?,
        None => Vec::new(),
    };
    Ok((status, stderr_bytes))
}

/// The full encoder invocation: raw frames on stdin in, one container file out.
pub fn build_command(opts: &FfmpegSinkOpts, cfg: &SinkConfig) -> Command {
    let enc = &opts.encoder;
    let mut cmd = Command::new(&enc.program);
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    cmd.arg(if enc.overwrite { "-y" } else { "-n" });

    // Input: headerless frames, channel order shared with the decoder.
    cmd.args([
        "-loglevel",
        enc.loglevel.as_str(),
        "-f",
        "rawvideo",
        "-vcodec",
        "rawvideo",
        "-s",
        &cfg.dimensions.to_string(),
        "-pix_fmt",
        cfg.layout.ffmpeg_name(),
        "-r",
        &cfg.fps.to_string(),
        "-i",
        "pipe:0",
    ]);

    cmd.args([
        "-an",
        "-c:v",
        enc.codec.as_str(),
        "-pix_fmt",
        enc.output_pix_fmt.as_str(),
        "-preset",
        enc.preset.as_str(),
        "-b:v",
        enc.bitrate.as_str(),
    ])
    .arg(&opts.out_path);
    cmd
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
