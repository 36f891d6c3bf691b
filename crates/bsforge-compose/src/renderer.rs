//! The boundary between composition plans and a concrete media toolchain.
//!
//! Everything encoder-specific lives behind [`Renderer`]. The executor only
//! ever calls these six operations, in a fixed stage order.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::filters::FilterDescription;
use crate::sequencer::SegmentSource;
use crate::transitions::TransitionSpec;

/// Result type for renderer operations.
pub type RendererResult<T> = Result<T, RendererFailure>;

/// A failed renderer invocation with the toolchain's diagnostic output.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RendererFailure {
    pub message: String,
    /// Tail of the tool's stderr, when there was one
    pub diagnostics: Option<String>,
}

impl RendererFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            diagnostics: None,
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: impl Into<String>) -> Self {
        let diagnostics = diagnostics.into();
        if !diagnostics.trim().is_empty() {
            self.diagnostics = Some(diagnostics);
        }
        self
    }

    /// Message and diagnostics as one line-separated string.
    pub fn detail(&self) -> String {
        match &self.diagnostics {
            Some(d) => format!("{}\n{}", self.message, d.trim_end()),
            None => self.message.clone(),
        }
    }
}

/// Media operations a composition plan is executed with.
///
/// Every operation produces its result at `output`. Helper files an
/// implementation needs stay in the directory of `output` and are removed
/// before the call returns. Implementations are shared across concurrent
/// clip renders.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render one segment to a clip of exactly `duration` seconds.
    async fn render_clip(
        &self,
        source: &SegmentSource,
        filter: &FilterDescription,
        duration: f64,
        output: &Path,
    ) -> RendererResult<()>;

    /// Join clips in order. `transitions.len()` is `clips.len() - 1`.
    async fn concat(
        &self,
        clips: &[PathBuf],
        transitions: &[TransitionSpec],
        output: &Path,
    ) -> RendererResult<()>;

    /// Replace the video's audio with the narration track.
    async fn mux_audio(&self, video: &Path, audio: &Path, output: &Path) -> RendererResult<()>;

    /// Mix background music under the existing audio at `volume`.
    async fn mix_background_audio(
        &self,
        video: &Path,
        music: &Path,
        volume: f64,
        output: &Path,
    ) -> RendererResult<()>;

    /// Burn a subtitle file into the picture.
    async fn burn_subtitles(
        &self,
        video: &Path,
        subtitles: &Path,
        output: &Path,
    ) -> RendererResult<()>;

    /// Container duration in seconds.
    async fn probe_duration(&self, path: &Path) -> RendererResult<f64>;
}
