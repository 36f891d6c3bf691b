//! Transition planning between adjacent scenes.
//!
//! The table encodes the pacing of a script: fades inside factual delivery,
//! a one-frame flash when the script turns from fact to persona opinion, a
//! zoom into reactions, and a hard cut into the call to action.

use bsforge_models::{Rgb, Scene, SceneType, TransitionType};
use serde::{Deserialize, Serialize};

/// Transition between two rendered segments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub kind: TransitionType,
    /// Length of the effect in seconds; zero for a cut
    pub duration: f64,
    /// Flash color, only for `Flash`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
}

impl TransitionSpec {
    pub fn cut() -> Self {
        Self {
            kind: TransitionType::None,
            duration: 0.0,
            color: None,
        }
    }

    pub fn is_cut(&self) -> bool {
        self.kind == TransitionType::None
    }
}

/// Plans transitions for a scene sequence.
#[derive(Debug, Clone)]
pub struct TransitionPlanner {
    fps: u32,
    flash_color: Rgb,
    duration_override: Option<f64>,
}

impl TransitionPlanner {
    pub fn new(fps: u32, flash_color: Rgb) -> Self {
        Self {
            fps: fps.max(1),
            flash_color,
            duration_override: None,
        }
    }

    /// Use a fixed duration for every non-flash, non-cut transition.
    pub fn with_duration_override(mut self, seconds: Option<f64>) -> Self {
        self.duration_override = seconds.filter(|s| s.is_finite() && *s > 0.0);
        self
    }

    /// Transition for the boundary between scene types `from` and `to`.
    pub fn lookup(from: SceneType, to: SceneType) -> TransitionType {
        use SceneType::*;
        match (from, to) {
            (Hook, Intro) | (Hook, Content) | (Intro, Content) => TransitionType::Fade,
            (Content, Content) => TransitionType::Crossfade,
            (Content, Example) | (Example, Content) => TransitionType::Slide,
            (Hook, Commentary) | (Content, Commentary) | (Example, Commentary) => {
                TransitionType::Flash
            }
            (Hook, Reaction) | (Content, Reaction) => TransitionType::Zoom,
            (Commentary, Content) | (Commentary, Example) | (Reaction, Content) => {
                TransitionType::Fade
            }
            (Commentary, Reaction) | (Reaction, Commentary) => TransitionType::Fade,
            (Content, Conclusion) | (Commentary, Conclusion) | (Reaction, Conclusion) => {
                TransitionType::Fade
            }
            (Conclusion, Cta) => TransitionType::None,
            _ => TransitionType::Fade,
        }
    }

    /// One transition type per adjacent pair of scene types.
    pub fn plan(scene_types: &[SceneType]) -> Vec<TransitionType> {
        scene_types
            .windows(2)
            .map(|pair| Self::lookup(pair[0], pair[1]))
            .collect()
    }

    /// Transition type at each boundary, honoring per-scene overrides.
    ///
    /// At boundary `i` the outgoing scene's `transition_out` wins, then the
    /// incoming scene's `transition_in`, then the table.
    pub fn plan_scenes(scenes: &[Scene]) -> Vec<TransitionType> {
        scenes
            .windows(2)
            .map(|pair| {
                pair[0]
                    .transition_out
                    .or(pair[1].transition_in)
                    .unwrap_or_else(|| Self::lookup(pair[0].scene_type, pair[1].scene_type))
            })
            .collect()
    }

    /// Timed transitions for a scene sequence.
    pub fn plan_specs(&self, scenes: &[Scene]) -> Vec<TransitionSpec> {
        Self::plan_scenes(scenes)
            .into_iter()
            .map(|kind| self.spec_for(kind))
            .collect()
    }

    /// Duration and color for a transition type.
    pub fn spec_for(&self, kind: TransitionType) -> TransitionSpec {
        let duration = match kind {
            TransitionType::None => 0.0,
            TransitionType::Flash => 1.0 / f64::from(self.fps),
            other => self
                .duration_override
                .unwrap_or_else(|| Self::default_duration(other)),
        };
        TransitionSpec {
            kind,
            duration,
            color: (kind == TransitionType::Flash).then_some(self.flash_color),
        }
    }

    fn default_duration(kind: TransitionType) -> f64 {
        match kind {
            TransitionType::None => 0.0,
            TransitionType::Fade => 0.4,
            TransitionType::Crossfade => 0.5,
            TransitionType::Zoom => 0.3,
            TransitionType::Slide => 0.5,
            // single frame, resolved against fps in spec_for
            TransitionType::Flash => 0.0,
        }
    }
}
