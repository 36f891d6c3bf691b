//! Error types for composition.

use bsforge_models::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for composition operations.
pub type ComposeResult<T> = Result<T, ComposeError>;

/// Renderer-boundary stage, reported with render failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStage {
    RenderClip,
    Concat,
    MuxAudio,
    MixBackgroundAudio,
    BurnSubtitles,
    ProbeDuration,
    Publish,
}

impl RenderStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStage::RenderClip => "render_clip",
            RenderStage::Concat => "concat",
            RenderStage::MuxAudio => "mux_audio",
            RenderStage::MixBackgroundAudio => "mix_background_audio",
            RenderStage::BurnSubtitles => "burn_subtitles",
            RenderStage::ProbeDuration => "probe_duration",
            RenderStage::Publish => "publish",
        }
    }
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur while planning or executing a composition.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// Recovered by filler substitution; never aborts a composition.
    #[error("Asset missing for scene {scene_index}: {reason}")]
    AssetMissing { scene_index: usize, reason: String },

    #[error("Timing inconsistency: {0}")]
    TimingInconsistency(String),

    #[error("Render failed at {stage}: {message}")]
    Render { stage: RenderStage, message: String },

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Composition cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid model: {0}")]
    Model(#[from] ModelError),
}

impl ComposeError {
    pub fn asset_missing(scene_index: usize, reason: impl Into<String>) -> Self {
        Self::AssetMissing {
            scene_index,
            reason: reason.into(),
        }
    }

    pub fn timing(message: impl Into<String>) -> Self {
        Self::TimingInconsistency(message.into())
    }

    pub fn render(stage: RenderStage, message: impl Into<String>) -> Self {
        Self::Render {
            stage,
            message: message.into(),
        }
    }

    pub fn invalid_plan(message: impl Into<String>) -> Self {
        Self::InvalidPlan(message.into())
    }

    /// Whether this error aborts the composition.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ComposeError::AssetMissing { .. })
    }

    /// Stage name for render failures.
    pub fn stage(&self) -> Option<RenderStage> {
        match self {
            ComposeError::Render { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
