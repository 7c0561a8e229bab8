use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};

/// Encode a numbered image sequence into a video via ffmpeg.
#[derive(Parser, Debug)]
#[command(name = "img2video", version)]
struct Cli {
    /// Directory holding the frames; the video is written here too.
    dir: Option<PathBuf>,

    /// JSON config file; flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frame filename prefix (frames are `<prefix>_<n>.<ext>`).
    #[arg(long)]
    prefix: Option<String>,

    /// Frame filename extension.
    #[arg(long = "ext")]
    extension: Option<String>,

    /// Input frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Encoder passed to `-c:v` (e.g. h264_nvenc, av1_nvenc, libx264).
    #[arg(long)]
    codec: Option<String>,

    /// Encoder preset.
    #[arg(long)]
    preset: Option<String>,

    /// Target bitrate passed to `-b:v`.
    #[arg(long)]
    bitrate: Option<String>,

    /// Encoder executable.
    #[arg(long = "ffmpeg")]
    program: Option<PathBuf>,

    /// Output file name (default: `render_<codec>.mp4`).
    #[arg(long)]
    output: Option<String>,

    /// Channel order of the raw frames sent to the encoder.
    #[arg(long, value_enum)]
    layout: Option<LayoutChoice>,

    /// Interpolation used for frames whose size differs from the first.
    #[arg(long, value_enum)]
    filter: Option<FilterChoice>,

    /// Refuse to replace an existing output file.
    #[arg(long)]
    no_overwrite: bool,

    /// Log progress every N frames.
    #[arg(long)]
    progress_every: Option<u64>,

    /// Log per-frame detail.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LayoutChoice {
    Bgr24,
    Rgb24,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FilterChoice {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = build_config(cli)?;
    tracing::info!("processing directory: {}", cfg.image_dir.display());

    let pipeline = img2video::Pipeline::new(cfg)?;
    let report = pipeline.run()?;

    if let Some(msg) = &report.feed_error {
        eprintln!(
            "warning: encoder stopped accepting frames after {}: {msg}",
            report.frames_fed
        );
    }
    eprintln!(
        "encoded {} of {} frames at {} ({} skipped, {} resized)",
        report.frames_fed,
        report.frames_located,
        report.dimensions,
        report.frames_skipped,
        report.frames_resized
    );
    eprintln!("wrote {}", report.output_path.display());
    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn build_config(cli: Cli) -> anyhow::Result<img2video::PipelineConfig> {
    let mut cfg = match &cli.config {
        Some(path) => img2video::PipelineConfig::from_path(path)?,
        None => img2video::PipelineConfig::default(),
    };

    if let Some(dir) = cli.dir {
        cfg.image_dir = dir;
    }
    cfg.image_dir = std::path::absolute(&cfg.image_dir)
        .with_context(|| format!("resolve frame directory '{}'", cfg.image_dir.display()))?;

    if let Some(prefix) = cli.prefix {
        cfg.prefix = prefix;
    }
    if let Some(extension) = cli.extension {
        cfg.extension = extension;
    }
    if let Some(fps) = cli.fps {
        cfg.fps = fps;
    }
    if let Some(codec) = cli.codec {
        cfg.encoder.codec = codec;
    }
    if let Some(preset) = cli.preset {
        cfg.encoder.preset = preset;
    }
    if let Some(bitrate) = cli.bitrate {
        cfg.encoder.bitrate = bitrate;
    }
    if let Some(program) = cli.program {
        cfg.encoder.program = program;
    }
    if let Some(output) = cli.output {
        cfg.output_name = Some(output);
    }
    if let Some(layout) = cli.layout {
        cfg.pixel_layout = match layout {
            LayoutChoice::Bgr24 => img2video::PixelLayout::Bgr24,
            LayoutChoice::Rgb24 => img2video::PixelLayout::Rgb24,
        };
    }
    if let Some(filter) = cli.filter {
        cfg.resize_filter = match filter {
            FilterChoice::Nearest => img2video::ResizeFilter::Nearest,
            FilterChoice::Triangle => img2video::ResizeFilter::Triangle,
            FilterChoice::CatmullRom => img2video::ResizeFilter::CatmullRom,
            FilterChoice::Gaussian => img2video::ResizeFilter::Gaussian,
            FilterChoice::Lanczos3 => img2video::ResizeFilter::Lanczos3,
        };
    }
    if cli.no_overwrite {
        cfg.encoder.overwrite = false;
    }
    if let Some(n) = cli.progress_every {
        cfg.progress_every = n;
    }
    Ok(cfg)
}
