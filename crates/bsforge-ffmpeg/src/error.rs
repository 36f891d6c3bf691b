//! Error types for the ffmpeg renderer.

use std::path::PathBuf;
use thiserror::Error;

use bsforge_compose::RendererFailure;

/// Result type for ffmpeg operations.
pub type FfmpegResult<T> = Result<T, FfmpegError>;

/// Errors that can occur while driving ffmpeg/ffprobe.
#[derive(Debug, Error)]
pub enum FfmpegError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid media file: {0}")]
    InvalidMedia(String),

    #[error("Unsupported request: {0}")]
    Unsupported(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl FfmpegError {
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Captured stderr, if the tool produced any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            FfmpegError::FfmpegFailed { stderr, .. } | FfmpegError::FfprobeFailed { stderr, .. } => {
                stderr.as_deref()
            }
            _ => None,
        }
    }
}

impl From<FfmpegError> for RendererFailure {
    fn from(error: FfmpegError) -> Self {
        let failure = RendererFailure::new(error.to_string());
        match error.stderr() {
            Some(stderr) => failure.with_diagnostics(stderr),
            None => failure,
        }
    }
}
