//! Resolved video template configuration.
//!
//! Templates arrive already merged. Every section is optional and every field
//! inside a section has a built-in default, so partial documents deserialize
//! and consumers never need to know how the template was assembled.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::color::Rgb;

/// Complete template handed to the composition engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoTemplateConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<SubtitleTemplateConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_effects: Option<VisualEffectsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioTemplateConfig>,
}

impl VideoTemplateConfig {
    pub fn layout(&self) -> LayoutConfig {
        self.layout.clone().unwrap_or_default()
    }

    pub fn subtitle(&self) -> SubtitleTemplateConfig {
        self.subtitle.clone().unwrap_or_default()
    }

    pub fn visual_effects(&self) -> VisualEffectsConfig {
        self.visual_effects.clone().unwrap_or_default()
    }

    pub fn audio(&self) -> AudioTemplateConfig {
        self.audio.clone().unwrap_or_default()
    }

    /// Frame layout, or a disabled default when the layout or frame section is absent.
    pub fn frame_layout(&self) -> FrameLayoutConfig {
        self.layout
            .as_ref()
            .and_then(|l| l.frame.clone())
            .unwrap_or_default()
    }
}

/// Vertical placement of subtitles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubtitlePosition {
    Top,
    Center,
    #[default]
    Bottom,
}

impl SubtitlePosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubtitlePosition::Top => "top",
            SubtitlePosition::Center => "center",
            SubtitlePosition::Bottom => "bottom",
        }
    }

    /// ASS numpad alignment (horizontally centered).
    pub fn ass_alignment(&self) -> u8 {
        match self {
            SubtitlePosition::Top => 8,
            SubtitlePosition::Center => 5,
            SubtitlePosition::Bottom => 2,
        }
    }

    /// Vertical margin in pixels for a frame of `height` pixels.
    ///
    /// ASS measures the margin from the edge the line is aligned to, so the
    /// ratio is interpreted as distance from the bottom of the frame.
    pub fn vertical_margin(&self, height: u32, margin_ratio: f64) -> u32 {
        let h = f64::from(height);
        let ratio = margin_ratio.clamp(0.0, 1.0);
        let margin = match self {
            SubtitlePosition::Bottom => h * ratio,
            SubtitlePosition::Top => h * (1.0 - ratio),
            SubtitlePosition::Center => h * (0.5 - ratio / 2.0),
        };
        margin.max(0.0) as u32
    }
}

impl fmt::Display for SubtitlePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Screen layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LayoutConfig {
    pub subtitle_position: SubtitlePosition,
    /// Subtitle distance from the anchor edge as a fraction of frame height
    pub subtitle_margin_ratio: f64,
    pub frame: Option<FrameLayoutConfig>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            subtitle_position: SubtitlePosition::Bottom,
            subtitle_margin_ratio: 0.18,
            frame: None,
        }
    }
}

/// Framed layout: content shown in a bordered box over a background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FrameLayoutConfig {
    pub enabled: bool,
    pub background_color: Rgb,
    pub background_gradient: bool,
    pub gradient_top: Rgb,
    pub gradient_bottom: Rgb,
    /// Content box width as a fraction of frame width
    pub content_width_ratio: f64,
    /// Content box height as a fraction of frame height
    pub content_height_ratio: f64,
    /// Vertical shift of the content box from center, in pixels (positive moves up)
    pub content_y_offset: i32,
    pub content_border_enabled: bool,
    pub content_border_color: Rgb,
    pub content_border_width: u32,
}

impl Default for FrameLayoutConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            background_color: Rgb::new(0x1a, 0x1a, 0x2e),
            background_gradient: false,
            gradient_top: Rgb::new(0x1a, 0x1a, 0x2e),
            gradient_bottom: Rgb::new(0x16, 0x21, 0x3e),
            content_width_ratio: 0.85,
            content_height_ratio: 0.5,
            content_y_offset: 350,
            content_border_enabled: true,
            content_border_color: Rgb::WHITE,
            content_border_width: 4,
        }
    }
}

/// Motion and color treatment of visuals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct VisualEffectsConfig {
    pub ken_burns_enabled: bool,
    /// Zoom increment per output frame
    pub zoom_speed: f64,
    /// Initial zoom of zoom-out segments
    pub start_scale: f64,
    /// Override for non-flash transition durations, in seconds
    pub transition_duration: Option<f64>,
    pub color_grading_enabled: bool,
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    /// Positive values warm the image (red up, blue down)
    pub warmth: f64,
}

impl Default for VisualEffectsConfig {
    fn default() -> Self {
        Self {
            ken_burns_enabled: true,
            zoom_speed: 0.0005,
            start_scale: 1.15,
            transition_duration: None,
            color_grading_enabled: true,
            brightness: 0.05,
            contrast: 1.1,
            saturation: 1.2,
            warmth: 0.1,
        }
    }
}

/// Subtitle appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SubtitleTemplateConfig {
    pub font_name: String,
    pub font_size: u32,
    pub bold: bool,
    pub primary_color: Rgb,
    pub outline_color: Rgb,
    pub outline_width: f64,
    pub shadow_depth: f64,
    /// Color for automatically highlighted numbers
    pub highlight_color: Rgb,
    pub auto_highlight_numbers: bool,
    pub background_enabled: bool,
    pub background_color: Rgb,
    pub background_opacity: f64,
    pub fade_in_ms: u32,
    pub fade_out_ms: u32,
    pub karaoke_enabled: bool,
    /// Maximum visible characters per subtitle segment
    pub max_chars_per_line: usize,
}

impl Default for SubtitleTemplateConfig {
    fn default() -> Self {
        Self {
            font_name: "Pretendard".to_string(),
            font_size: 72,
            bold: true,
            primary_color: Rgb::WHITE,
            outline_color: Rgb::BLACK,
            outline_width: 4.0,
            shadow_depth: 0.0,
            highlight_color: Rgb::new(0xFF, 0xFF, 0x00),
            auto_highlight_numbers: true,
            background_enabled: false,
            background_color: Rgb::BLACK,
            background_opacity: 0.0,
            fade_in_ms: 200,
            fade_out_ms: 100,
            karaoke_enabled: true,
            max_chars_per_line: 20,
        }
    }
}

/// Audio mixing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AudioTemplateConfig {
    /// Background music volume relative to narration
    pub bgm_volume: f64,
}

impl Default for AudioTemplateConfig {
    fn default() -> Self {
        Self { bgm_volume: 0.1 }
    }
}
