use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::core::PixelLayout;
use crate::foundation::error::{Img2VideoError, Img2VideoResult};

/// Interpolation used when a frame has to be conformed to the reference size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResizeFilter {
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        use image::imageops::FilterType;
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Settings for the external encoder process.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Executable to launch; resolved through `PATH` when not a path.
    pub program: PathBuf,
    /// Value passed to `-c:v`.
    pub codec: String,
    /// Value passed to `-preset` (NVENC: `p1` fastest .. `p7` best quality).
    pub preset: String,
    /// Value passed to `-b:v`.
    pub bitrate: String,
    /// Output pixel format; `yuv420p` plays everywhere.
    pub output_pix_fmt: String,
    /// Value passed to `-loglevel`. Only what ffmpeg writes at this level ends up in
    /// failure diagnostics.
    pub loglevel: String,
    /// Replace an existing output file instead of refusing to start.
    pub overwrite: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            codec: "h264_nvenc".to_string(),
            preset: "p4".to_string(),
            bitrate: "5M".to_string(),
            output_pix_fmt: "yuv420p".to_string(),
            loglevel: "error".to_string(),
            overwrite: true,
        }
    }
}

/// Everything one run needs to know. Defaults reproduce the stock batch setup: frames named
/// `train_<n>.jpg` under `./result/gt`, 5 fps, NVENC H.264.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub image_dir: PathBuf,
    /// Literal filename prefix; frames are `<prefix>_<n>.<extension>`.
    pub prefix: String,
    pub extension: String,
    pub fps: u32,
    /// Output file is `<output_prefix><codec>.mp4` unless `output_name` is set.
    pub output_prefix: String,
    pub output_name: Option<String>,
    pub pixel_layout: PixelLayout,
    pub resize_filter: ResizeFilter,
    /// Emit a progress line every this many fed frames.
    pub progress_every: u64,
    pub encoder: EncoderConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("./result/gt"),
            prefix: "train".to_string(),
            extension: "jpg".to_string(),
            fps: 5,
            output_prefix: "render_".to_string(),
            output_name: None,
            pixel_layout: PixelLayout::default(),
            resize_filter: ResizeFilter::default(),
            progress_every: 50,
            encoder: EncoderConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_path(path: &Path) -> Img2VideoResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse config JSON '{}'", path.display()))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Img2VideoResult<()> {
        if self.fps == 0 {
            return Err(Img2VideoError::validation("fps must be non-zero"));
        }
        if self.prefix.is_empty() {
            return Err(Img2VideoError::validation("frame prefix must not be empty"));
        }
        if self.extension.is_empty() {
            return Err(Img2VideoError::validation(
                "frame extension must not be empty",
            ));
        }
        if self.progress_every == 0 {
            return Err(Img2VideoError::validation(
                "progress_every must be non-zero",
            ));
        }
        if self.encoder.program.as_os_str().is_empty() {
            return Err(Img2VideoError::validation(
                "encoder program must not be empty",
            ));
        }
        if self.encoder.codec.is_empty() {
            return Err(Img2VideoError::validation("encoder codec must not be empty"));
        }
        let name = self.output_file_name();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(Img2VideoError::validation(format!(
                "output name '{name}' must be a plain file name"
            )));
        }
        Ok(())
    }

    /// Glob matched against base names in `image_dir`.
    pub fn frame_pattern(&self) -> String {
        format!("{}_*.{}", self.prefix, self.extension)
    }

    pub fn output_file_name(&self) -> String {
        match &self.output_name {
            Some(name) => name.clone(),
            None => format!("{}{}.mp4", self.output_prefix, self.encoder.codec),
        }
    }

    /// The encoded video is always written next to its frames.
    pub fn output_path(&self) -> PathBuf {
        self.image_dir.join(self.output_file_name())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
