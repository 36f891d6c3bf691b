//! Mapping scenes and assets onto an ordered list of render segments.
//!
//! Scene mode pairs every scene with one asset for exactly the scene's speech
//! duration. Linear mode fills a single target duration from a pool of assets.
//! Missing assets never abort sequencing: a solid-color filler of the same
//! duration takes their place and the substitution is reported.

use std::path::PathBuf;

use bsforge_models::{
    PersonaStyleConfig, Rgb, Scene, SceneTtsResult, SceneVisualResult, VisualAsset,
    VisualAssetKind, VisualEffectsConfig, VisualStyle,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ComposeError, ComposeResult};
use crate::filters::{FilterDescription, FilterGraphBuilder};
use crate::metrics;
use crate::style::VisualStyleResolver;

/// Play length given to image assets in linear mode.
pub const DEFAULT_IMAGE_DURATION: f64 = 5.0;
/// Linear-mode shortfall below which the last image is stretched instead of padding.
pub const PAD_TOLERANCE: f64 = 0.1;
/// Durations below this are treated as zero.
const EPSILON: f64 = 1e-6;

/// What a segment shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentSource {
    Video {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        native_duration: Option<f64>,
    },
    Image { path: PathBuf },
    /// Generated solid frame; also used as filler
    Solid { color: Rgb },
}

impl SegmentSource {
    pub fn is_video(&self) -> bool {
        matches!(self, SegmentSource::Video { .. })
    }

    pub fn is_image(&self) -> bool {
        matches!(self, SegmentSource::Image { .. })
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            SegmentSource::Video { path, .. } | SegmentSource::Image { path } => Some(path),
            SegmentSource::Solid { .. } => None,
        }
    }

    /// Source for an available asset. Generated assets become solid frames.
    fn from_asset(asset: &VisualAsset) -> Option<Self> {
        match asset.kind {
            VisualAssetKind::StockVideo => asset.path.clone().map(|path| SegmentSource::Video {
                path,
                native_duration: asset.duration.filter(|d| *d > 0.0),
            }),
            VisualAssetKind::StockImage | VisualAssetKind::AiImage => {
                asset.path.clone().map(|path| SegmentSource::Image { path })
            }
            VisualAssetKind::SolidColor | VisualAssetKind::Gradient => Some(SegmentSource::Solid {
                color: asset.color.unwrap_or(Rgb::BLACK),
            }),
        }
    }
}

/// The engine's unit of rendering work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSegment {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_index: Option<usize>,
    pub source: SegmentSource,
    pub style: VisualStyle,
    pub filter: FilterDescription,
    pub target_duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_ref: Option<PathBuf>,
    /// True when the segment replaces a missing asset or pads the timeline
    #[serde(default)]
    pub is_filler: bool,
}

/// Position in a linear asset pool, threaded between invocations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetCursor {
    pub position: usize,
}

impl AssetCursor {
    pub fn new(position: usize) -> Self {
        Self { position }
    }
}

/// Sequencing output with the substitutions that were made.
#[derive(Debug)]
pub struct Sequence {
    pub segments: Vec<RenderSegment>,
    /// One `AssetMissing` per filler substitution or skipped asset
    pub substitutions: Vec<ComposeError>,
    /// Cursor after consumption (linear mode); unchanged in scene mode
    pub cursor: AssetCursor,
}

impl Sequence {
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.target_duration).sum()
    }
}

/// Builds render segments from scenes or pooled assets.
#[derive(Debug, Clone)]
pub struct SceneSegmentSequencer<'a> {
    filters: &'a FilterGraphBuilder,
    persona: &'a PersonaStyleConfig,
    effects: &'a VisualEffectsConfig,
}

impl<'a> SceneSegmentSequencer<'a> {
    pub fn new(
        filters: &'a FilterGraphBuilder,
        persona: &'a PersonaStyleConfig,
        effects: &'a VisualEffectsConfig,
    ) -> Self {
        Self {
            filters,
            persona,
            effects,
        }
    }

    /// Scene mode, checking asset availability on disk.
    pub fn sequence_scenes(
        &self,
        scenes: &[Scene],
        tts_results: &[SceneTtsResult],
        visual_results: &[SceneVisualResult],
    ) -> ComposeResult<Sequence> {
        self.sequence_scenes_with(scenes, tts_results, visual_results, VisualAsset::is_available)
    }

    /// Scene mode with a custom availability check.
    ///
    /// `tts_results` must already be resolved (ordered, indices `0..n`), one
    /// per scene.
    pub fn sequence_scenes_with<F>(
        &self,
        scenes: &[Scene],
        tts_results: &[SceneTtsResult],
        visual_results: &[SceneVisualResult],
        is_available: F,
    ) -> ComposeResult<Sequence>
    where
        F: Fn(&VisualAsset) -> bool,
    {
        if scenes.len() != tts_results.len() {
            return Err(ComposeError::invalid_plan(format!(
                "{} scenes but {} TTS results",
                scenes.len(),
                tts_results.len()
            )));
        }

        let mut segments = Vec::with_capacity(scenes.len());
        let mut substitutions = Vec::new();

        for (index, (scene, tts)) in scenes.iter().zip(tts_results).enumerate() {
            let style = VisualStyleResolver::resolve(scene);
            let duration = tts.duration_seconds;

            let visual = visual_results.iter().find(|v| v.scene_index == tts.scene_index);
            let source = match visual.and_then(|v| v.asset.as_ref()) {
                Some(asset) if is_available(asset) => SegmentSource::from_asset(asset),
                Some(_) => None,
                None => None,
            };

            let segment = match source {
                Some(source) => RenderSegment {
                    index,
                    scene_index: Some(tts.scene_index),
                    source,
                    style,
                    filter: self.filters.build(index, duration, style, self.persona, self.effects),
                    target_duration: duration,
                    audio_ref: Some(tts.audio_path.clone()),
                    is_filler: false,
                },
                None => {
                    let reason = match visual.and_then(|v| v.asset.as_ref()) {
                        Some(_) => "asset not downloaded",
                        None => "no asset sourced",
                    };
                    warn!(
                        scene_index = tts.scene_index,
                        duration, reason, "Substituting filler for missing scene asset"
                    );
                    metrics::record_filler_substitution("scene");
                    substitutions.push(ComposeError::asset_missing(tts.scene_index, reason));
                    let mut filler = self.filler(index, duration);
                    filler.scene_index = Some(tts.scene_index);
                    filler.style = style;
                    filler.audio_ref = Some(tts.audio_path.clone());
                    filler
                }
            };
            segments.push(segment);
        }

        Ok(Sequence {
            segments,
            substitutions,
            cursor: AssetCursor::default(),
        })
    }

    /// Linear mode, checking asset availability on disk.
    pub fn sequence_linear(
        &self,
        assets: &[VisualAsset],
        target_duration: f64,
        cursor: AssetCursor,
    ) -> ComposeResult<Sequence> {
        self.sequence_linear_with(assets, target_duration, cursor, VisualAsset::is_available)
    }

    /// Linear mode with a custom availability check.
    ///
    /// Consumes assets from `cursor` onwards until `target_duration` is
    /// covered. The result is never more than [`PAD_TOLERANCE`] short of the
    /// target and never longer than it.
    pub fn sequence_linear_with<F>(
        &self,
        assets: &[VisualAsset],
        target_duration: f64,
        cursor: AssetCursor,
        is_available: F,
    ) -> ComposeResult<Sequence>
    where
        F: Fn(&VisualAsset) -> bool,
    {
        if !target_duration.is_finite() || target_duration < 0.0 {
            return Err(ComposeError::timing(format!(
                "invalid target duration {target_duration}"
            )));
        }

        let mut segments: Vec<RenderSegment> = Vec::new();
        let mut substitutions = Vec::new();
        let mut total = 0.0;
        let mut position = cursor.position;

        while target_duration - total > EPSILON && position < assets.len() {
            let asset = &assets[position];
            position += 1;

            let source = if is_available(asset) {
                SegmentSource::from_asset(asset)
            } else {
                None
            };
            let Some(source) = source else {
                debug!(asset_index = position - 1, "Skipping unavailable asset");
                substitutions.push(ComposeError::asset_missing(
                    position - 1,
                    "asset not downloaded",
                ));
                continue;
            };

            let remaining = target_duration - total;
            let duration = match &source {
                SegmentSource::Video {
                    native_duration: Some(native),
                    ..
                } => native.min(remaining),
                SegmentSource::Video { .. } => remaining,
                SegmentSource::Image { .. } | SegmentSource::Solid { .. } => {
                    DEFAULT_IMAGE_DURATION.min(remaining)
                }
            };
            if duration <= EPSILON {
                continue;
            }

            let index = segments.len();
            segments.push(RenderSegment {
                index,
                scene_index: None,
                source,
                style: VisualStyle::Neutral,
                filter: self.filters.build(
                    index,
                    duration,
                    VisualStyle::Neutral,
                    self.persona,
                    self.effects,
                ),
                target_duration: duration,
                audio_ref: None,
                is_filler: false,
            });
            total += duration;
        }

        let shortfall = target_duration - total;
        if shortfall >= PAD_TOLERANCE || (segments.is_empty() && shortfall > EPSILON) {
            debug!(shortfall, "Padding linear sequence with filler");
            metrics::record_filler_substitution("linear");
            let index = segments.len();
            segments.push(self.filler(index, shortfall));
        } else if shortfall > EPSILON {
            if let Some(last) = segments.last_mut().filter(|s| s.source.is_image()) {
                last.target_duration += shortfall;
                last.filter = self.filters.build(
                    last.index,
                    last.target_duration,
                    last.style,
                    self.persona,
                    self.effects,
                );
            }
        }

        Ok(Sequence {
            segments,
            substitutions,
            cursor: AssetCursor::new(position),
        })
    }

    fn filler(&self, index: usize, duration: f64) -> RenderSegment {
        RenderSegment {
            index,
            scene_index: None,
            source: SegmentSource::Solid { color: Rgb::BLACK },
            style: VisualStyle::Neutral,
            filter: FilterDescription::passthrough(self.filters.canvas()),
            target_duration: duration,
            audio_ref: None,
            is_filler: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::Canvas;
    use bsforge_models::SceneType;

    fn fixtures() -> (FilterGraphBuilder, PersonaStyleConfig, VisualEffectsConfig) {
        (
            FilterGraphBuilder::new(Canvas::new(1080, 1920, 30)),
            PersonaStyleConfig::default(),
            VisualEffectsConfig::default(),
        )
    }

    fn all_available(_: &VisualAsset) -> bool {
        true
    }

    #[test]
    fn test_scene_mode_pairs_scene_with_asset() {
        let (filters, persona, effects) = fixtures();
        let sequencer = SceneSegmentSequencer::new(&filters, &persona, &effects);

        let scenes = vec![
            Scene::new(SceneType::Hook, "a"),
            Scene::new(SceneType::Commentary, "b"),
        ];
        let tts = vec![
            SceneTtsResult::new(0, "/a.mp3", 2.5),
            SceneTtsResult::new(1, "/b.mp3", 4.0).with_start_offset(2.5),
        ];
        let visuals = vec![
            SceneVisualResult::new(0, Some(VisualAsset::video("/a.mp4", 10.0)), 2.5),
            SceneVisualResult::new(1, Some(VisualAsset::image("/b.jpg")), 4.0),
        ];

        let seq = sequencer
            .sequence_scenes_with(&scenes, &tts, &visuals, all_available)
            .unwrap();
        assert_eq!(seq.segments.len(), 2);
        assert!(seq.substitutions.is_empty());
        assert_eq!(seq.segments[0].target_duration, 2.5);
        assert_eq!(seq.segments[1].style, VisualStyle::Persona);
        assert_eq!(seq.segments[1].audio_ref, Some(PathBuf::from("/b.mp3")));
        assert!(seq.segments[1].source.is_image());
    }

    #[test]
    fn test_missing_asset_becomes_filler_with_exact_duration() {
        let (filters, persona, effects) = fixtures();
        let sequencer = SceneSegmentSequencer::new(&filters, &persona, &effects);

        let scenes = vec![
            Scene::new(SceneType::Hook, "a"),
            Scene::new(SceneType::Content, "b"),
            Scene::new(SceneType::Cta, "c"),
        ];
        let tts = vec![
            SceneTtsResult::new(0, "/a.mp3", 2.0),
            SceneTtsResult::new(1, "/b.mp3", 3.37),
            SceneTtsResult::new(2, "/c.mp3", 1.25),
        ];
        let visuals = vec![
            SceneVisualResult::new(0, Some(VisualAsset::image("/a.jpg")), 2.0),
            SceneVisualResult::new(1, Some(VisualAsset::image("/gone.jpg")), 3.37),
        ];

        let seq = sequencer
            .sequence_scenes_with(&scenes, &tts, &visuals, |a| {
                a.path.as_deref() != Some(std::path::Path::new("/gone.jpg"))
            })
            .unwrap();

        assert_eq!(seq.segments.len(), 3);
        assert!(seq.segments[1].is_filler);
        assert_eq!(seq.segments[1].target_duration, 3.37);
        assert!(seq.segments[2].is_filler);
        assert_eq!(seq.segments[2].target_duration, 1.25);
        assert_eq!(seq.segments[2].style, VisualStyle::Emphasis);
        assert_eq!(seq.substitutions.len(), 2);
        assert!(seq.substitutions.iter().all(|e| !e.is_fatal()));
    }

    #[test]
    fn test_scene_count_mismatch_is_rejected() {
        let (filters, persona, effects) = fixtures();
        let sequencer = SceneSegmentSequencer::new(&filters, &persona, &effects);
        let scenes = vec![Scene::new(SceneType::Hook, "a")];
        let result = sequencer.sequence_scenes_with(&scenes, &[], &[], all_available);
        assert!(matches!(result, Err(ComposeError::InvalidPlan(_))));
    }

    #[test]
    fn test_linear_mode_consumes_videos_and_images() {
        let (filters, persona, effects) = fixtures();
        let sequencer = SceneSegmentSequencer::new(&filters, &persona, &effects);
        let assets = vec![
            VisualAsset::video("/1.mp4", 4.0),
            VisualAsset::image("/2.jpg"),
            VisualAsset::video("/3.mp4", 30.0),
            VisualAsset::image("/4.jpg"),
        ];

        let seq = sequencer
            .sequence_linear_with(&assets, 12.0, AssetCursor::default(), all_available)
            .unwrap();
        let durations: Vec<f64> = seq.segments.iter().map(|s| s.target_duration).collect();
        assert_eq!(durations, vec![4.0, 5.0, 3.0]);
        assert_eq!(seq.cursor, AssetCursor::new(3));
        assert!((seq.total_duration() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_mode_pads_shortfall_with_filler() {
        let (filters, persona, effects) = fixtures();
        let sequencer = SceneSegmentSequencer::new(&filters, &persona, &effects);
        let assets = vec![VisualAsset::video("/1.mp4", 3.0)];

        let seq = sequencer
            .sequence_linear_with(&assets, 10.0, AssetCursor::default(), all_available)
            .unwrap();
        assert_eq!(seq.segments.len(), 2);
        let filler = &seq.segments[1];
        assert!(filler.is_filler);
        assert_eq!(filler.source, SegmentSource::Solid { color: Rgb::BLACK });
        assert!((filler.target_duration - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_mode_never_extends_video() {
        let (filters, persona, effects) = fixtures();
        let sequencer = SceneSegmentSequencer::new(&filters, &persona, &effects);
        let assets = vec![VisualAsset::video("/1.mp4", 9.95)];

        let seq = sequencer
            .sequence_linear_with(&assets, 10.0, AssetCursor::default(), all_available)
            .unwrap();
        assert_eq!(seq.segments.len(), 1);
        assert_eq!(seq.segments[0].target_duration, 9.95);
        assert!(10.0 - seq.total_duration() < PAD_TOLERANCE);
    }

    #[test]
    fn test_linear_mode_cursor_and_unavailable_assets() {
        let (filters, persona, effects) = fixtures();
        let sequencer = SceneSegmentSequencer::new(&filters, &persona, &effects);
        let assets = vec![
            VisualAsset::image("/used.jpg"),
            VisualAsset::image("/missing.jpg"),
            VisualAsset::image("/next.jpg"),
        ];

        let seq = sequencer
            .sequence_linear_with(&assets, 5.0, AssetCursor::new(1), |a| {
                a.path.as_deref() != Some(std::path::Path::new("/missing.jpg"))
            })
            .unwrap();
        assert_eq!(seq.segments.len(), 1);
        assert_eq!(
            seq.segments[0].source,
            SegmentSource::Image { path: PathBuf::from("/next.jpg") }
        );
        assert_eq!(seq.substitutions.len(), 1);
        assert_eq!(seq.cursor, AssetCursor::new(3));
    }

    #[test]
    fn test_linear_mode_total_within_tolerance() {
        let (filters, persona, effects) = fixtures();
        let sequencer = SceneSegmentSequencer::new(&filters, &persona, &effects);
        let pools: Vec<Vec<VisualAsset>> = vec![
            vec![],
            vec![VisualAsset::image("/a.jpg")],
            vec![VisualAsset::video("/a.mp4", 0.33), VisualAsset::image("/b.jpg")],
            vec![VisualAsset::video("/a.mp4", 7.77); 5],
        ];
        for assets in &pools {
            for target in [0.0, 0.05, 1.0, 4.99, 5.0, 12.34, 47.5] {
                let seq = sequencer
                    .sequence_linear_with(assets, target, AssetCursor::default(), all_available)
                    .unwrap();
                let total = seq.total_duration();
                assert!(target - total < PAD_TOLERANCE, "target {target} total {total}");
                assert!(total <= target + 1e-9, "target {target} total {total}");
            }
        }
    }

    #[test]
    fn test_linear_mode_stretches_last_image_over_small_shortfall() {
        let (filters, persona, effects) = fixtures();
        let sequencer = SceneSegmentSequencer::new(&filters, &persona, &effects);
        let assets = vec![VisualAsset::image("/a.jpg")];

        let seq = sequencer
            .sequence_linear_with(&assets, 5.05, AssetCursor::default(), all_available)
            .unwrap();
        assert_eq!(seq.segments.len(), 1);
        let segment = &seq.segments[0];
        assert!(!segment.is_filler);
        assert!((segment.target_duration - 5.05).abs() < 1e-9);

        let rebuilt = filters.build(
            0,
            segment.target_duration,
            VisualStyle::Neutral,
            &persona,
            &effects,
        );
        assert_eq!(segment.filter, rebuilt);
        assert_ne!(
            segment.filter,
            filters.build(0, 5.0, VisualStyle::Neutral, &persona, &effects)
        );
    }

    #[test]
    fn test_linear_mode_small_shortfall_after_video_keeps_native_length() {
        let (filters, persona, effects) = fixtures();
        let sequencer = SceneSegmentSequencer::new(&filters, &persona, &effects);
        let assets = vec![VisualAsset::image("/a.jpg"), VisualAsset::video("/b.mp4", 5.0)];

        let seq = sequencer
            .sequence_linear_with(&assets, 10.05, AssetCursor::default(), all_available)
            .unwrap();
        assert_eq!(seq.segments.len(), 2);
        assert!(seq.segments.iter().all(|s| !s.is_filler));
        assert_eq!(seq.segments[0].target_duration, 5.0);
        assert_eq!(seq.segments[1].target_duration, 5.0);
        assert!(seq.segments[1].source.is_video());
        assert!(10.05 - seq.total_duration() < PAD_TOLERANCE);
    }

    #[test]
    fn test_linear_mode_short_target_with_empty_pool_gets_filler() {
        let (filters, persona, effects) = fixtures();
        let sequencer = SceneSegmentSequencer::new(&filters, &persona, &effects);

        let seq = sequencer
            .sequence_linear_with(&[], 0.05, AssetCursor::default(), all_available)
            .unwrap();
        assert_eq!(seq.segments.len(), 1);
        assert!(seq.segments[0].is_filler);
        assert!((seq.segments[0].target_duration - 0.05).abs() < 1e-9);

        let empty = sequencer
            .sequence_linear_with(&[], 0.0, AssetCursor::default(), all_available)
            .unwrap();
        assert!(empty.segments.is_empty());
    }
}
