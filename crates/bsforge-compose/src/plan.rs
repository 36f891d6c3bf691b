//! Composition planning.
//!
//! The planner turns per-scene artifacts (or a pooled asset list) into a
//! [`CompositionPlan`]: ordered render segments, one transition per segment
//! boundary, the narration track and an encoded subtitle document. Planning
//! performs no media work; the only I/O is the asset availability check.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use bsforge_models::{
    OutputConfig, PersonaStyleConfig, Scene, SceneTtsResult, SceneVisualResult, TransitionType,
    VideoTemplateConfig, VisualAsset, WordTimestamp,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ComposeError, ComposeResult};
use crate::filters::{Canvas, FilterGraphBuilder};
use crate::sequencer::{AssetCursor, RenderSegment, SceneSegmentSequencer, Sequence};
use crate::subtitles::{
    AssEncoder, SrtEncoder, SubtitleAsset, SubtitleFormat, SubtitleSegment,
    SubtitleTimelineBuilder,
};
use crate::timeline::resolve_scene_timeline;
use crate::transitions::{TransitionPlanner, TransitionSpec};

/// Slack allowed when checking transition lengths against segment lengths.
const TRANSITION_SLACK: f64 = 1e-9;

/// How segments were derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionMode {
    /// One segment per scene
    Scene,
    /// Segments drawn from an asset pool
    Linear,
}

impl CompositionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompositionMode::Scene => "scene",
            CompositionMode::Linear => "linear",
        }
    }
}

impl fmt::Display for CompositionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Background music mixed under the narration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundMusic {
    pub path: PathBuf,
    pub volume: f64,
}

/// Inputs a plan is built from.
#[derive(Debug, Clone)]
pub enum CompositionInput {
    Scenes {
        scenes: Vec<Scene>,
        tts_results: Vec<SceneTtsResult>,
        visual_results: Vec<SceneVisualResult>,
    },
    Linear {
        assets: Vec<VisualAsset>,
        cursor: AssetCursor,
        /// Word timings of the narration, when the synthesizer provided them
        word_timestamps: Option<Vec<WordTimestamp>>,
        /// Narration text, used for proportional subtitles without timings
        script_text: String,
        audio_duration: f64,
    },
}

/// One composition invocation.
#[derive(Debug, Clone)]
pub struct CompositionRequest {
    pub input: CompositionInput,
    /// Merged narration track
    pub audio_path: PathBuf,
    pub background_music: Option<PathBuf>,
    /// Subtitle encoding; no subtitles when `None`
    pub subtitle_format: Option<SubtitleFormat>,
}

impl CompositionRequest {
    pub fn scenes(
        scenes: Vec<Scene>,
        tts_results: Vec<SceneTtsResult>,
        visual_results: Vec<SceneVisualResult>,
        audio_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input: CompositionInput::Scenes {
                scenes,
                tts_results,
                visual_results,
            },
            audio_path: audio_path.into(),
            background_music: None,
            subtitle_format: Some(SubtitleFormat::Ass),
        }
    }

    pub fn linear(
        assets: Vec<VisualAsset>,
        cursor: AssetCursor,
        script_text: impl Into<String>,
        audio_duration: f64,
        audio_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input: CompositionInput::Linear {
                assets,
                cursor,
                word_timestamps: None,
                script_text: script_text.into(),
                audio_duration,
            },
            audio_path: audio_path.into(),
            background_music: None,
            subtitle_format: Some(SubtitleFormat::Ass),
        }
    }

    /// Attach narration word timings (linear mode only).
    pub fn with_word_timestamps(mut self, words: Vec<WordTimestamp>) -> Self {
        if let CompositionInput::Linear {
            word_timestamps, ..
        } = &mut self.input
        {
            *word_timestamps = Some(words);
        }
        self
    }

    pub fn with_background_music(mut self, path: impl Into<PathBuf>) -> Self {
        self.background_music = Some(path.into());
        self
    }

    pub fn with_subtitle_format(mut self, format: SubtitleFormat) -> Self {
        self.subtitle_format = Some(format);
        self
    }

    pub fn without_subtitles(mut self) -> Self {
        self.subtitle_format = None;
        self
    }

    pub fn mode(&self) -> CompositionMode {
        match self.input {
            CompositionInput::Scenes { .. } => CompositionMode::Scene,
            CompositionInput::Linear { .. } => CompositionMode::Linear,
        }
    }
}

/// Renderer-agnostic description of one composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionPlan {
    pub id: String,
    pub mode: CompositionMode,
    pub output: OutputConfig,
    pub segments: Vec<RenderSegment>,
    /// One per adjacent segment pair
    pub transitions: Vec<TransitionSpec>,
    pub audio_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_music: Option<BackgroundMusic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitles: Option<SubtitleAsset>,
    /// Recovered problems (filler substitutions, skipped assets)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Linear-mode cursor to pass to the next invocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<AssetCursor>,
}

impl CompositionPlan {
    /// Timeline length. Transitions overlap padded clips, so they add nothing.
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.target_duration).sum()
    }

    pub fn transition_kinds(&self) -> Vec<TransitionType> {
        self.transitions.iter().map(|t| t.kind).collect()
    }

    pub fn filler_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_filler).count()
    }

    /// Check the structural invariants the executor relies on.
    pub fn validate(&self) -> ComposeResult<()> {
        if self.segments.is_empty() {
            return Err(ComposeError::invalid_plan("plan has no segments"));
        }
        if self.transitions.len() != self.segments.len() - 1 {
            return Err(ComposeError::invalid_plan(format!(
                "{} segments need {} transitions, got {}",
                self.segments.len(),
                self.segments.len() - 1,
                self.transitions.len()
            )));
        }
        for (position, segment) in self.segments.iter().enumerate() {
            if segment.index != position {
                return Err(ComposeError::invalid_plan(format!(
                    "segment at position {} has index {}",
                    position, segment.index
                )));
            }
            if !segment.target_duration.is_finite() || segment.target_duration <= 0.0 {
                return Err(ComposeError::invalid_plan(format!(
                    "segment {} has duration {}",
                    position, segment.target_duration
                )));
            }
        }
        for (i, transition) in self.transitions.iter().enumerate() {
            let limit = max_transition(&self.segments[i], &self.segments[i + 1]);
            if transition.duration < 0.0 || transition.duration > limit + TRANSITION_SLACK {
                return Err(ComposeError::invalid_plan(format!(
                    "transition {} lasts {:.3}s, limit is {:.3}s",
                    i, transition.duration, limit
                )));
            }
        }
        if self.audio_path.as_os_str().is_empty() {
            return Err(ComposeError::invalid_plan("no narration track"));
        }
        Ok(())
    }
}

/// Availability predicate for visual assets.
pub type AvailabilityCheck = Arc<dyn Fn(&VisualAsset) -> bool + Send + Sync>;

/// Builds composition plans from requests.
#[derive(Clone)]
pub struct CompositionPlanner {
    output: OutputConfig,
    template: VideoTemplateConfig,
    persona: PersonaStyleConfig,
    is_available: AvailabilityCheck,
}

impl fmt::Debug for CompositionPlanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositionPlanner")
            .field("output", &self.output)
            .field("template", &self.template)
            .field("persona", &self.persona)
            .finish_non_exhaustive()
    }
}

impl CompositionPlanner {
    pub fn new(
        output: OutputConfig,
        template: VideoTemplateConfig,
        persona: PersonaStyleConfig,
    ) -> Self {
        Self {
            output,
            template,
            persona,
            is_available: Arc::new(VisualAsset::is_available),
        }
    }

    /// Replace the on-disk availability check.
    pub fn with_availability_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&VisualAsset) -> bool + Send + Sync + 'static,
    {
        self.is_available = Arc::new(check);
        self
    }

    pub fn output(&self) -> &OutputConfig {
        &self.output
    }

    /// Build and validate a plan.
    pub fn plan(&self, request: &CompositionRequest) -> ComposeResult<CompositionPlan> {
        let id = Uuid::new_v4().to_string();
        let plan = match &request.input {
            CompositionInput::Scenes {
                scenes,
                tts_results,
                visual_results,
            } => self.plan_scenes(id, request, scenes, tts_results, visual_results)?,
            CompositionInput::Linear {
                assets,
                cursor,
                word_timestamps,
                script_text,
                audio_duration,
            } => self.plan_linear(
                id,
                request,
                assets,
                *cursor,
                word_timestamps.as_deref(),
                script_text,
                *audio_duration,
            )?,
        };
        plan.validate()?;

        for warning in &plan.warnings {
            warn!(composition_id = %plan.id, "{}", warning);
        }
        info!(
            composition_id = %plan.id,
            mode = %plan.mode,
            segments = plan.segments.len(),
            fillers = plan.filler_count(),
            duration = plan.total_duration(),
            "Planned composition"
        );
        Ok(plan)
    }

    fn plan_scenes(
        &self,
        id: String,
        request: &CompositionRequest,
        scenes: &[Scene],
        tts_results: &[SceneTtsResult],
        visual_results: &[SceneVisualResult],
    ) -> ComposeResult<CompositionPlan> {
        let timeline = resolve_scene_timeline(tts_results)?;
        let effects = self.template.visual_effects();
        let filters = self.filter_builder();

        let sequence = SceneSegmentSequencer::new(&filters, &self.persona, &effects)
            .sequence_scenes_with(scenes, &timeline, visual_results, |asset| {
                (self.is_available)(asset)
            })?;

        let planner = TransitionPlanner::new(self.output.fps, self.persona.flash_color())
            .with_duration_override(effects.transition_duration);
        let transitions = clamp_transitions(planner.plan_specs(scenes), &sequence.segments);

        let subtitles = match request.subtitle_format {
            Some(format) => {
                let segments = self.timeline_builder().from_scenes(scenes, &timeline)?;
                Some(self.encode_subtitles(format, &segments))
            }
            None => None,
        };

        Ok(self.assemble(id, CompositionMode::Scene, request, sequence, transitions, subtitles))
    }

    #[allow(clippy::too_many_arguments)]
    fn plan_linear(
        &self,
        id: String,
        request: &CompositionRequest,
        assets: &[VisualAsset],
        cursor: AssetCursor,
        word_timestamps: Option<&[WordTimestamp]>,
        script_text: &str,
        audio_duration: f64,
    ) -> ComposeResult<CompositionPlan> {
        if !audio_duration.is_finite() || audio_duration <= 0.0 {
            return Err(ComposeError::timing(format!(
                "narration duration must be positive, got {audio_duration}"
            )));
        }

        let effects = self.template.visual_effects();
        let filters = self.filter_builder();
        let sequence = SceneSegmentSequencer::new(&filters, &self.persona, &effects)
            .sequence_linear_with(assets, audio_duration, cursor, |asset| {
                (self.is_available)(asset)
            })?;

        // pooled footage has no scene boundaries to mark
        let transitions =
            vec![TransitionSpec::cut(); sequence.segments.len().saturating_sub(1)];

        let subtitles = request.subtitle_format.map(|format| {
            let builder = self.timeline_builder();
            let segments = match word_timestamps {
                Some(words) if !words.is_empty() => builder.from_timestamps(words),
                _ => builder.from_text(script_text, audio_duration),
            };
            self.encode_subtitles(format, &segments)
        });

        Ok(self.assemble(id, CompositionMode::Linear, request, sequence, transitions, subtitles))
    }

    fn assemble(
        &self,
        id: String,
        mode: CompositionMode,
        request: &CompositionRequest,
        sequence: Sequence,
        transitions: Vec<TransitionSpec>,
        subtitles: Option<SubtitleAsset>,
    ) -> CompositionPlan {
        let next_cursor = (mode == CompositionMode::Linear).then_some(sequence.cursor);
        CompositionPlan {
            id,
            mode,
            output: self.output.clone(),
            segments: sequence.segments,
            transitions,
            audio_path: request.audio_path.clone(),
            background_music: request.background_music.clone().map(|path| BackgroundMusic {
                path,
                volume: self.template.audio().bgm_volume,
            }),
            subtitles,
            warnings: sequence.substitutions.iter().map(ToString::to_string).collect(),
            next_cursor,
        }
    }

    fn filter_builder(&self) -> FilterGraphBuilder {
        FilterGraphBuilder::new(Canvas::from(&self.output))
            .with_frame_layout(self.template.frame_layout())
    }

    fn timeline_builder(&self) -> SubtitleTimelineBuilder {
        SubtitleTimelineBuilder::new(self.template.subtitle().max_chars_per_line)
    }

    fn encode_subtitles(&self, format: SubtitleFormat, segments: &[SubtitleSegment]) -> SubtitleAsset {
        let content = match format {
            SubtitleFormat::Ass => AssEncoder::new(
                self.output.width,
                self.output.height,
                self.template.subtitle(),
                self.template.layout(),
                self.persona.clone(),
            )
            .with_title(self.template.name.clone().unwrap_or_else(|| "BSForge".to_string()))
            .encode(segments),
            SubtitleFormat::Srt => SrtEncoder::encode(segments),
        };
        SubtitleAsset {
            format,
            content,
            segment_count: segments.len(),
        }
    }
}

/// Longest transition that fits between two segments.
fn max_transition(a: &RenderSegment, b: &RenderSegment) -> f64 {
    a.target_duration.min(b.target_duration) / 2.0
}

/// Shorten transitions that would eat more than half of a neighbouring segment.
fn clamp_transitions(
    mut transitions: Vec<TransitionSpec>,
    segments: &[RenderSegment],
) -> Vec<TransitionSpec> {
    for (i, transition) in transitions.iter_mut().enumerate() {
        if let (Some(a), Some(b)) = (segments.get(i), segments.get(i + 1)) {
            let limit = max_transition(a, b);
            if transition.duration > limit {
                transition.duration = limit;
            }
        }
    }
    transitions
}
