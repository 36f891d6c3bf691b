//! BSForge composition core.
//!
//! This crate turns scene artifacts into a renderer-agnostic composition plan
//! and executes plans against a [`Renderer`]:
//! - Visual style resolution and transition planning per scene
//! - Structured filter descriptions (Ken Burns, color grade, style overlays, framed layout)
//! - Scene and linear sequencing with filler substitution
//! - Subtitle timelines with ASS/SRT encoders
//! - A staged plan executor with a bounded render pool and atomic publish

pub mod config;
pub mod error;
pub mod executor;
pub mod filters;
pub mod fs_utils;
pub mod logging;
pub mod metrics;
pub mod plan;
pub mod renderer;
pub mod sequencer;
pub mod style;
pub mod subtitles;
pub mod timeline;
pub mod transitions;

pub use config::ComposerConfig;
pub use error::{ComposeError, ComposeResult, RenderStage};
pub use executor::{CompositionExecutor, CompositionResult};
pub use filters::{Canvas, FilterDescription, FilterGraphBuilder, FilterNode};
pub use logging::{init_tracing, CompositionLogger};
pub use plan::{
    BackgroundMusic, CompositionInput, CompositionMode, CompositionPlan, CompositionPlanner,
    CompositionRequest,
};
pub use renderer::{Renderer, RendererFailure, RendererResult};
pub use sequencer::{AssetCursor, RenderSegment, SceneSegmentSequencer, SegmentSource, Sequence};
pub use style::VisualStyleResolver;
pub use subtitles::{SubtitleAsset, SubtitleFormat, SubtitleSegment, SubtitleTimelineBuilder};
pub use timeline::resolve_scene_timeline;
pub use transitions::{TransitionPlanner, TransitionSpec};
