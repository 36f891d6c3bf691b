//! Renderer-agnostic filter descriptions.
//!
//! A [`FilterDescription`] is an ordered list of [`FilterNode`]s, each an
//! operation with typed parameters. Renderers translate nodes into their own
//! syntax; nothing here knows about any encoder.
//!
//! Every segment is built the same way:
//!
//! ```text
//! scale (2x target) -> crop -> zoompan (in on even segments, out on odd)
//!   -> color grade -> style overlay -> [frame composition]
//! ```

use bsforge_models::{
    FrameLayoutConfig, OutputConfig, PersonaStyleConfig, Rgb, VisualEffectsConfig, VisualStyle,
};
use serde::{Deserialize, Serialize};

/// Weight of the accent color in the persona tint.
pub const PERSONA_TINT_STRENGTH: f64 = 0.15;
/// Red gain / blue cut per unit of warmth.
pub const WARMTH_CHANNEL_SCALE: f64 = 0.5;
/// Vignette angle for emphasis scenes (radians).
pub const EMPHASIS_VIGNETTE_ANGLE: f64 = std::f64::consts::PI / 5.0;
/// Supersampling factor applied before zoom/pan.
pub const KEN_BURNS_UPSCALE: u32 = 2;

/// Output frame geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self { width, height, fps }
    }

    pub fn frames_for(&self, seconds: f64) -> u32 {
        ((seconds.max(0.0) * f64::from(self.fps)).round() as u32).max(1)
    }
}

impl From<&OutputConfig> for Canvas {
    fn from(output: &OutputConfig) -> Self {
        Self::new(output.width, output.height, output.fps)
    }
}

/// How a scale node fits the source into its box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleFit {
    /// Fill the box, overflow is cropped later
    Cover,
    /// Fit inside the box, letterboxed
    Contain,
}

/// Direction of the Ken Burns zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "direction", rename_all = "snake_case")]
pub enum ZoomMotion {
    /// Starts at `from` and grows by `rate` per frame
    In { from: f64, rate: f64 },
    /// Shrinks linearly from `from` to `to` over the segment
    Out { from: f64, to: f64 },
}

impl ZoomMotion {
    /// Zoom factor at output frame `frame` of `frames`.
    pub fn zoom_at(&self, frame: u32, frames: u32) -> f64 {
        match *self {
            ZoomMotion::In { from, rate } => from + rate * f64::from(frame),
            ZoomMotion::Out { from, to } => {
                let last = f64::from(frames.saturating_sub(1).max(1));
                let progress = (f64::from(frame) / last).min(1.0);
                from - (from - to) * progress
            }
        }
    }

    pub fn is_zoom_in(&self) -> bool {
        matches!(self, ZoomMotion::In { .. })
    }
}

/// Background behind a framed content box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "fill", rename_all = "snake_case")]
pub enum Background {
    Solid { color: Rgb },
    VerticalGradient { top: Rgb, bottom: Rgb },
}

impl Background {
    /// Color of pixel row `y` in a frame of `height` rows.
    pub fn color_at_row(&self, y: u32, height: u32) -> Rgb {
        match *self {
            Background::Solid { color } => color,
            Background::VerticalGradient { top, bottom } => {
                let last = f64::from(height.saturating_sub(1).max(1));
                top.lerp(bottom, f64::from(y) / last)
            }
        }
    }
}

/// Solid border around a box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxBorder {
    pub width: u32,
    pub color: Rgb,
}

/// Placement of content inside a full frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameComposite {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub background: Background,
    pub content_width: u32,
    pub content_height: u32,
    /// Top-left corner of the content box (border excluded)
    pub content_x: u32,
    pub content_y: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<BoxBorder>,
}

impl FrameComposite {
    /// Lay out a content box for `canvas` according to `frame`.
    pub fn layout(canvas: Canvas, frame: &FrameLayoutConfig) -> Self {
        let content_width = even(f64::from(canvas.width) * frame.content_width_ratio.clamp(0.1, 1.0));
        let content_height =
            even(f64::from(canvas.height) * frame.content_height_ratio.clamp(0.1, 1.0));

        let content_x = (canvas.width.saturating_sub(content_width)) / 2;
        let centered_y = i64::from(canvas.height.saturating_sub(content_height)) / 2;
        let max_y = i64::from(canvas.height.saturating_sub(content_height));
        let content_y = (centered_y - i64::from(frame.content_y_offset)).clamp(0, max_y) as u32;

        let background = if frame.background_gradient {
            Background::VerticalGradient {
                top: frame.gradient_top,
                bottom: frame.gradient_bottom,
            }
        } else {
            Background::Solid {
                color: frame.background_color,
            }
        };

        let border = (frame.content_border_enabled && frame.content_border_width > 0).then_some(
            BoxBorder {
                width: frame.content_border_width,
                color: frame.content_border_color,
            },
        );

        Self {
            canvas_width: canvas.width,
            canvas_height: canvas.height,
            background,
            content_width,
            content_height,
            content_x,
            content_y,
            border,
        }
    }
}

/// Round down to an even pixel count (chroma subsampling needs even sizes).
fn even(value: f64) -> u32 {
    let v = value.max(2.0) as u32;
    v - v % 2
}

/// Brightness/contrast/saturation with a warmth bias.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorGrade {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub warmth: f64,
}

impl ColorGrade {
    pub fn red_gain(&self) -> f64 {
        1.0 + self.warmth * WARMTH_CHANNEL_SCALE
    }

    pub fn blue_gain(&self) -> f64 {
        (1.0 - self.warmth * WARMTH_CHANNEL_SCALE).max(0.0)
    }
}

/// One filter operation with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "parameters", rename_all = "snake_case")]
pub enum FilterNode {
    Scale {
        width: u32,
        height: u32,
        fit: ScaleFit,
    },
    /// Centered crop
    Crop { width: u32, height: u32 },
    ZoomPan {
        motion: ZoomMotion,
        frames: u32,
        width: u32,
        height: u32,
        fps: u32,
    },
    ColorGrade(ColorGrade),
    /// Multiply every channel by `factor`
    Darken { factor: f64 },
    /// `out = own * (1 - strength) + color * strength` per channel
    Tint { color: Rgb, strength: f64 },
    LeftBorder { width: u32, color: Rgb },
    Vignette { angle: f64 },
    Frame(FrameComposite),
}

impl FilterNode {
    pub fn operation(&self) -> &'static str {
        match self {
            FilterNode::Scale { .. } => "scale",
            FilterNode::Crop { .. } => "crop",
            FilterNode::ZoomPan { .. } => "zoom_pan",
            FilterNode::ColorGrade(_) => "color_grade",
            FilterNode::Darken { .. } => "darken",
            FilterNode::Tint { .. } => "tint",
            FilterNode::LeftBorder { .. } => "left_border",
            FilterNode::Vignette { .. } => "vignette",
            FilterNode::Frame(_) => "frame",
        }
    }
}

/// Ordered filter chain for one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDescription {
    pub canvas: Canvas,
    pub nodes: Vec<FilterNode>,
}

impl FilterDescription {
    /// No processing beyond fitting the source to the canvas.
    pub fn passthrough(canvas: Canvas) -> Self {
        Self {
            canvas,
            nodes: Vec::new(),
        }
    }

    pub fn operations(&self) -> Vec<&'static str> {
        self.nodes.iter().map(FilterNode::operation).collect()
    }

    pub fn zoom_motion(&self) -> Option<ZoomMotion> {
        self.nodes.iter().find_map(|node| match node {
            FilterNode::ZoomPan { motion, .. } => Some(*motion),
            _ => None,
        })
    }

    pub fn is_framed(&self) -> bool {
        self.nodes.iter().any(|n| matches!(n, FilterNode::Frame(_)))
    }
}

/// Builds filter descriptions for segments.
///
/// Pure: the same inputs always produce the same description.
#[derive(Debug, Clone)]
pub struct FilterGraphBuilder {
    canvas: Canvas,
    frame: Option<FrameLayoutConfig>,
}

impl FilterGraphBuilder {
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            frame: None,
        }
    }

    /// Compose segments inside a framed layout when `frame.enabled`.
    pub fn with_frame_layout(mut self, frame: FrameLayoutConfig) -> Self {
        self.frame = frame.enabled.then_some(frame);
        self
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn is_framed(&self) -> bool {
        self.frame.is_some()
    }

    /// Filter description for segment `index` lasting `duration` seconds.
    pub fn build(
        &self,
        index: usize,
        duration: f64,
        style: VisualStyle,
        persona: &PersonaStyleConfig,
        effects: &VisualEffectsConfig,
    ) -> FilterDescription {
        let composite = self
            .frame
            .as_ref()
            .map(|frame| FrameComposite::layout(self.canvas, frame));
        let (width, height) = composite
            .map(|c| (c.content_width, c.content_height))
            .unwrap_or((self.canvas.width, self.canvas.height));

        let mut nodes = Vec::new();
        self.push_motion(&mut nodes, index, duration, width, height, effects);

        if effects.color_grading_enabled {
            nodes.push(FilterNode::ColorGrade(ColorGrade {
                brightness: effects.brightness,
                contrast: effects.contrast,
                saturation: effects.saturation,
                warmth: effects.warmth,
            }));
        }

        push_style_overlay(&mut nodes, style, persona);

        if let Some(composite) = composite {
            nodes.push(FilterNode::Frame(composite));
        }

        FilterDescription {
            canvas: self.canvas,
            nodes,
        }
    }

    fn push_motion(
        &self,
        nodes: &mut Vec<FilterNode>,
        index: usize,
        duration: f64,
        width: u32,
        height: u32,
        effects: &VisualEffectsConfig,
    ) {
        if !effects.ken_burns_enabled {
            nodes.push(FilterNode::Scale {
                width,
                height,
                fit: ScaleFit::Cover,
            });
            nodes.push(FilterNode::Crop { width, height });
            return;
        }

        let (up_w, up_h) = (width * KEN_BURNS_UPSCALE, height * KEN_BURNS_UPSCALE);
        nodes.push(FilterNode::Scale {
            width: up_w,
            height: up_h,
            fit: ScaleFit::Cover,
        });
        nodes.push(FilterNode::Crop {
            width: up_w,
            height: up_h,
        });

        let start_scale = effects.start_scale.max(1.0);
        let motion = if index % 2 == 0 {
            ZoomMotion::In {
                from: 1.0,
                rate: effects.zoom_speed.max(0.0),
            }
        } else {
            ZoomMotion::Out {
                from: start_scale,
                to: 1.0,
            }
        };

        nodes.push(FilterNode::ZoomPan {
            motion,
            frames: self.canvas.frames_for(duration),
            width,
            height,
            fps: self.canvas.fps,
        });
    }
}

fn push_style_overlay(nodes: &mut Vec<FilterNode>, style: VisualStyle, persona: &PersonaStyleConfig) {
    match style {
        VisualStyle::Neutral => {
            nodes.push(FilterNode::Darken {
                factor: 1.0 - persona.overlay_opacity_neutral.clamp(0.0, 1.0),
            });
        }
        VisualStyle::Persona => {
            nodes.push(FilterNode::Tint {
                color: persona.accent_color,
                strength: PERSONA_TINT_STRENGTH,
            });
            if persona.use_persona_border && persona.persona_border_width > 0 {
                nodes.push(FilterNode::LeftBorder {
                    width: persona.persona_border_width,
                    color: persona.border_color(),
                });
            }
        }
        VisualStyle::Emphasis => {
            nodes.push(FilterNode::Darken {
                factor: 1.0 - persona.overlay_opacity_emphasis.clamp(0.0, 1.0),
            });
            nodes.push(FilterNode::Vignette {
                angle: EMPHASIS_VIGNETTE_ANGLE,
            });
        }
    }
}
