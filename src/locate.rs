//! Frame discovery: glob the frame directory and order matches by the number in their name.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use regex::Regex;

use crate::foundation::error::{Img2VideoError, Img2VideoResult};

/// Ordering key for a frame file.
///
/// `Unnumbered` compares greater than every `Index`, so names without a frame number sort
/// after all numbered frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SortKey {
    Index(u64),
    Unnumbered,
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Index(a), Self::Index(b)) => a.cmp(b),
            (Self::Index(_), Self::Unnumbered) => Ordering::Less,
            (Self::Unnumbered, Self::Index(_)) => Ordering::Greater,
            (Self::Unnumbered, Self::Unnumbered) => Ordering::Equal,
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A located frame file and its ordering key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameFile {
    pub path: PathBuf,
    pub sort_key: SortKey,
}

/// Extracts the frame number that follows `<prefix>_` in a file's base name.
#[derive(Clone, Debug)]
pub struct SortKeyExtractor {
    re: Regex,
}

impl SortKeyExtractor {
    pub fn new(prefix: &str) -> Img2VideoResult<Self> {
        let re = Regex::new(&format!(r"{}_([0-9]+)", regex::escape(prefix)))
            .with_context(|| format!("build frame-number pattern for prefix '{prefix}'"))?;
        Ok(Self { re })
    }

    /// Only ASCII digits count as a frame number; other scripts' digits make a name
    /// unnumbered. Numbers too large for `u64` saturate to `u64::MAX`, which still sorts ahead
    /// of unnumbered names.
    pub fn key_for_name(&self, base_name: &str) -> SortKey {
        let Some(caps) = self.re.captures(base_name) else {
            return SortKey::Unnumbered;
        };
        let digits = &caps[1];
        SortKey::Index(digits.parse().unwrap_or(u64::MAX))
    }

    pub fn key_for_path(&self, path: &Path) -> SortKey {
        match path.file_name() {
            Some(name) => self.key_for_name(&name.to_string_lossy()),
            None => SortKey::Unnumbered,
        }
    }
}

/// Find `<prefix>_*.<extension>` in `dir`, ordered by frame number.
///
/// Ties (including all unnumbered names) keep glob enumeration order. An empty result is not
/// an error here.
pub fn locate_frames(dir: &Path, prefix: &str, extension: &str) -> Img2VideoResult<Vec<FrameFile>> {
    if !dir.is_dir() {
        return Err(Img2VideoError::discovery(format!(
            "frame directory '{}' does not exist or is not a directory",
            dir.display()
        )));
    }

    let extractor = SortKeyExtractor::new(prefix)?;
    let file_pattern = format!(
        "{}_*.{}",
        glob::Pattern::escape(prefix),
        glob::Pattern::escape(extension)
    );
    let pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        file_pattern
    );

    let opts = glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    let paths = glob::glob_with(&pattern, opts)
        .with_context(|| format!("invalid frame glob '{pattern}'"))?;

    let mut frames = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => {
                let sort_key = extractor.key_for_path(&path);
                frames.push(FrameFile { path, sort_key });
            }
            Ok(path) => tracing::debug!(path = %path.display(), "ignoring non-file match"),
            Err(e) => tracing::warn!(error = %e, "skipping unreadable directory entry"),
        }
    }

    // `sort_by_key` is stable.
    frames.sort_by_key(|f| f.sort_key);
    tracing::debug!(count = frames.len(), pattern = %pattern, "located frames");
    Ok(frames)
}

#[cfg(test)]
#[path = "../tests/unit/locate.rs"]
mod tests;
