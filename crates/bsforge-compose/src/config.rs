//! Runtime configuration for composition execution.

use std::path::PathBuf;

/// Composer configuration.
#[derive(Debug, Clone)]
pub struct ComposerConfig {
    /// Maximum clip renders in flight per composition
    pub max_render_parallel: usize,
    /// Parent directory for per-composition scratch directories; system temp dir when unset
    pub scratch_dir: Option<PathBuf>,
    /// Copy the subtitle file next to the published video
    pub publish_subtitles: bool,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            max_render_parallel: 4,
            scratch_dir: None,
            publish_subtitles: false,
        }
    }
}

impl ComposerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_render_parallel: std::env::var("BSFORGE_MAX_RENDER_PARALLEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_render_parallel),
            scratch_dir: std::env::var("BSFORGE_SCRATCH_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            publish_subtitles: std::env::var("BSFORGE_PUBLISH_SUBTITLES")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.publish_subtitles),
        }
    }

    pub fn with_max_render_parallel(mut self, n: usize) -> Self {
        self.max_render_parallel = n.max(1);
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn with_published_subtitles(mut self) -> Self {
        self.publish_subtitles = true;
        self
    }

    /// Directory under which scratch directories are created.
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
