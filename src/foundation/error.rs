/// Convenience result type used across img2video.
pub type Img2VideoResult<T> = Result<T, Img2VideoError>;

/// Top-level error taxonomy for a frame-sequence encode.
#[derive(thiserror::Error, Debug)]
pub enum Img2VideoError {
    /// Invalid user-provided configuration or frame data.
    #[error("validation error: {0}")]
    Validation(String),

    /// No usable frames were found.
    #[error("discovery error: {0}")]
    Discovery(String),

    /// A frame that the run cannot proceed without could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The encoder process could not be started.
    #[error("encoder launch error: {0}")]
    Launch(String),

    /// Writing frame bytes to the encoder failed.
    #[error("encoder feed error: {0}")]
    Feed(String),

    /// The encoder ran to completion but reported failure.
    #[error("encoder exited with {}: {diagnostics}", display_code(.code))]
    EncoderExit {
        /// Exit code, or `None` when the process was killed by a signal.
        code: Option<i32>,
        /// Everything the encoder wrote to stderr.
        diagnostics: String,
    },

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl Img2VideoError {
    /// Build a [`Img2VideoError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`Img2VideoError::Discovery`] value.
    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery(msg.into())
    }

    /// Build a [`Img2VideoError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`Img2VideoError::Launch`] value.
    pub fn launch(msg: impl Into<String>) -> Self {
        Self::Launch(msg.into())
    }

    /// Build a [`Img2VideoError::Feed`] value.
    pub fn feed(msg: impl Into<String>) -> Self {
        Self::Feed(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
