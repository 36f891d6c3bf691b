//! Persona visual identity.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::color::Rgb;

pub const DEFAULT_ACCENT_COLOR: Rgb = Rgb::new(0x00, 0xD4, 0xFF);
pub const DEFAULT_SECONDARY_COLOR: Rgb = Rgb::new(0xFF, 0xFF, 0x00);

/// Colors and overlay strengths that distinguish persona scenes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PersonaStyleConfig {
    /// Tint and border color for persona scenes
    pub accent_color: Rgb,
    /// Highlight color for emphasis words in subtitles
    pub secondary_color: Rgb,
    pub use_persona_border: bool,
    /// Left border width in pixels
    pub persona_border_width: u32,
    /// Border color; the accent color when unset
    pub persona_border_color: Option<Rgb>,
    pub overlay_opacity_neutral: f64,
    pub overlay_opacity_persona: f64,
    pub overlay_opacity_emphasis: f64,
    /// Color of the fact-to-opinion flash; the accent color when unset
    pub flash_color: Option<Rgb>,
}

impl Default for PersonaStyleConfig {
    fn default() -> Self {
        Self {
            accent_color: DEFAULT_ACCENT_COLOR,
            secondary_color: DEFAULT_SECONDARY_COLOR,
            use_persona_border: true,
            persona_border_width: 8,
            persona_border_color: None,
            overlay_opacity_neutral: 0.3,
            overlay_opacity_persona: 0.3,
            overlay_opacity_emphasis: 0.45,
            flash_color: None,
        }
    }
}

impl PersonaStyleConfig {
    pub fn with_accent(mut self, accent: Rgb) -> Self {
        self.accent_color = accent;
        self
    }

    pub fn without_border(mut self) -> Self {
        self.use_persona_border = false;
        self
    }

    pub fn border_color(&self) -> Rgb {
        self.persona_border_color.unwrap_or(self.accent_color)
    }

    pub fn flash_color(&self) -> Rgb {
        self.flash_color.unwrap_or(self.accent_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colors_fall_back_to_accent() {
        let config = PersonaStyleConfig::default().with_accent(Rgb::new(0xFF, 0x69, 0xB4));
        assert_eq!(config.border_color(), Rgb::new(0xFF, 0x69, 0xB4));
        assert_eq!(config.flash_color(), Rgb::new(0xFF, 0x69, 0xB4));

        let config = PersonaStyleConfig {
            flash_color: Some(Rgb::WHITE),
            ..PersonaStyleConfig::default()
        };
        assert_eq!(config.flash_color(), Rgb::WHITE);
        assert_eq!(config.border_color(), DEFAULT_ACCENT_COLOR);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PersonaStyleConfig =
            serde_json::from_str(r##"{"accent_color":"#FF69B4"}"##).unwrap();
        assert_eq!(config.accent_color, Rgb::new(0xFF, 0x69, 0xB4));
        assert_eq!(config.overlay_opacity_neutral, 0.3);
        assert!(config.use_persona_border);
    }
}
