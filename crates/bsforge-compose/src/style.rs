//! Scene type to visual style mapping.

use bsforge_models::{Scene, SceneType, VisualStyle};

/// Resolves the visual treatment of a scene.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisualStyleResolver;

impl VisualStyleResolver {
    /// Style of a scene: its explicit override, else the scene-type default.
    pub fn resolve(scene: &Scene) -> VisualStyle {
        scene
            .visual_style
            .unwrap_or_else(|| Self::for_scene_type(scene.scene_type))
    }

    /// Default style of a scene type.
    pub fn for_scene_type(scene_type: SceneType) -> VisualStyle {
        match scene_type {
            SceneType::Hook | SceneType::Intro | SceneType::Content | SceneType::Example => {
                VisualStyle::Neutral
            }
            SceneType::Commentary | SceneType::Reaction => VisualStyle::Persona,
            SceneType::Conclusion | SceneType::Cta => VisualStyle::Emphasis,
        }
    }

    pub fn resolve_all(scenes: &[Scene]) -> Vec<VisualStyle> {
        scenes.iter().map(Self::resolve).collect()
    }
}
