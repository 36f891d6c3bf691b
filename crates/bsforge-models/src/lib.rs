//! Shared data models for the BSForge composition engine.
//!
//! This crate provides Serde-serializable types for:
//! - Scenes, scene types, visual styles and transitions
//! - Speech timing (word timestamps, per-scene TTS results)
//! - Visual assets sourced for scenes
//! - Persona and template configuration with built-in defaults
//! - Output encoding settings

pub mod color;
pub mod encoding;
pub mod error;
pub mod persona;
pub mod scene;
pub mod template;
pub mod timing;
pub mod visual;

// Re-export common types
pub use color::Rgb;
pub use encoding::OutputConfig;
pub use error::{ModelError, ModelResult};
pub use persona::PersonaStyleConfig;
pub use scene::{Scene, SceneScript, SceneType, TransitionType, VisualStyle};
pub use template::{
    AudioTemplateConfig, FrameLayoutConfig, LayoutConfig, SubtitlePosition, SubtitleTemplateConfig,
    VideoTemplateConfig, VisualEffectsConfig,
};
pub use timing::{SceneTtsResult, WordTimestamp};
pub use visual::{SceneVisualResult, VisualAsset, VisualAssetKind};
