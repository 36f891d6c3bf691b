//! Scene definitions: scene types, visual styles and transitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Speaking rate used for duration estimates.
pub const DEFAULT_WORDS_PER_MINUTE: f64 = 150.0;

/// Semantic role of a scene within the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SceneType {
    /// Attention grab in the first seconds
    Hook,
    /// Background and context
    Intro,
    /// Core factual information
    Content,
    /// Concrete example or case
    Example,
    /// Persona opinion
    Commentary,
    /// Persona reaction
    Reaction,
    /// Wrap-up
    Conclusion,
    /// Call to action
    Cta,
}

impl SceneType {
    pub const ALL: &'static [SceneType] = &[
        SceneType::Hook,
        SceneType::Intro,
        SceneType::Content,
        SceneType::Example,
        SceneType::Commentary,
        SceneType::Reaction,
        SceneType::Conclusion,
        SceneType::Cta,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SceneType::Hook => "hook",
            SceneType::Intro => "intro",
            SceneType::Content => "content",
            SceneType::Example => "example",
            SceneType::Commentary => "commentary",
            SceneType::Reaction => "reaction",
            SceneType::Conclusion => "conclusion",
            SceneType::Cta => "cta",
        }
    }

    /// Whether scenes of this type carry the persona's opinion.
    pub fn is_persona(&self) -> bool {
        matches!(self, SceneType::Commentary | SceneType::Reaction)
    }

    /// Whether scenes of this type deliver factual information.
    pub fn is_factual(&self) -> bool {
        matches!(
            self,
            SceneType::Hook | SceneType::Intro | SceneType::Content | SceneType::Example
        )
    }

    /// Expected duration range in seconds, used to clamp estimates.
    pub fn duration_range(&self) -> (f64, f64) {
        match self {
            SceneType::Hook => (2.0, 3.0),
            SceneType::Intro => (3.0, 5.0),
            SceneType::Content => (5.0, 10.0),
            SceneType::Example => (3.0, 5.0),
            SceneType::Commentary => (3.0, 8.0),
            SceneType::Reaction => (2.0, 4.0),
            SceneType::Conclusion => (2.0, 4.0),
            SceneType::Cta => (2.0, 3.0),
        }
    }
}

impl fmt::Display for SceneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SceneType {
    type Err = SceneTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hook" => Ok(SceneType::Hook),
            "intro" => Ok(SceneType::Intro),
            "content" => Ok(SceneType::Content),
            "example" => Ok(SceneType::Example),
            "commentary" => Ok(SceneType::Commentary),
            "reaction" => Ok(SceneType::Reaction),
            "conclusion" => Ok(SceneType::Conclusion),
            "cta" => Ok(SceneType::Cta),
            _ => Err(SceneTypeParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown scene type: {0}")]
pub struct SceneTypeParseError(String);

/// Visual treatment applied to a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VisualStyle {
    /// Plain background with a light darkening overlay
    #[default]
    Neutral,
    /// Accent-color tint and border for persona opinion
    Persona,
    /// Strong darkening with vignette for closing beats
    Emphasis,
}

impl VisualStyle {
    pub const ALL: &'static [VisualStyle] =
        &[VisualStyle::Neutral, VisualStyle::Persona, VisualStyle::Emphasis];

    pub fn as_str(&self) -> &'static str {
        match self {
            VisualStyle::Neutral => "neutral",
            VisualStyle::Persona => "persona",
            VisualStyle::Emphasis => "emphasis",
        }
    }

    /// Style name used in subtitle style tables.
    pub fn style_name(&self) -> &'static str {
        match self {
            VisualStyle::Neutral => "Neutral",
            VisualStyle::Persona => "Persona",
            VisualStyle::Emphasis => "Emphasis",
        }
    }
}

impl fmt::Display for VisualStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VisualStyle {
    type Err = VisualStyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "neutral" => Ok(VisualStyle::Neutral),
            "persona" => Ok(VisualStyle::Persona),
            "emphasis" => Ok(VisualStyle::Emphasis),
            _ => Err(VisualStyleParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown visual style: {0}")]
pub struct VisualStyleParseError(String);

/// Transition between two adjacent scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransitionType {
    /// Hard cut
    None,
    /// Fade through black
    #[default]
    Fade,
    /// Cross-dissolve
    Crossfade,
    /// Zoom into the next scene
    Zoom,
    /// One-frame color flash
    Flash,
    /// Horizontal slide
    Slide,
}

impl TransitionType {
    pub const ALL: &'static [TransitionType] = &[
        TransitionType::None,
        TransitionType::Fade,
        TransitionType::Crossfade,
        TransitionType::Zoom,
        TransitionType::Flash,
        TransitionType::Slide,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionType::None => "none",
            TransitionType::Fade => "fade",
            TransitionType::Crossfade => "crossfade",
            TransitionType::Zoom => "zoom",
            TransitionType::Flash => "flash",
            TransitionType::Slide => "slide",
        }
    }
}

impl fmt::Display for TransitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransitionType {
    type Err = TransitionTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(TransitionType::None),
            "fade" => Ok(TransitionType::Fade),
            "crossfade" => Ok(TransitionType::Crossfade),
            "zoom" => Ok(TransitionType::Zoom),
            "flash" => Ok(TransitionType::Flash),
            "slide" => Ok(TransitionType::Slide),
            _ => Err(TransitionTypeParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown transition type: {0}")]
pub struct TransitionTypeParseError(String);

/// One semantic beat of a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    pub scene_type: SceneType,

    /// Text shown on screen
    pub text: String,

    /// Text sent to speech synthesis when it differs from `text`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts_text: Option<String>,

    /// Keyword used to source visuals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_keyword: Option<String>,

    /// Explicit style, overriding the scene-type default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_style: Option<VisualStyle>,

    /// Transition into this scene, overriding the planner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_in: Option<TransitionType>,

    /// Transition out of this scene, overriding the planner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_out: Option<TransitionType>,

    /// Words highlighted in subtitles
    #[serde(default)]
    pub emphasis_words: Vec<String>,

    /// Manual subtitle line breaks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_segments: Option<Vec<String>>,
}

impl Scene {
    /// Create a scene with only a type and display text.
    pub fn new(scene_type: SceneType, text: impl Into<String>) -> Self {
        Self {
            scene_type,
            text: text.into(),
            tts_text: None,
            visual_keyword: None,
            visual_style: None,
            transition_in: None,
            transition_out: None,
            emphasis_words: Vec::new(),
            subtitle_segments: None,
        }
    }

    pub fn with_visual_style(mut self, style: VisualStyle) -> Self {
        self.visual_style = Some(style);
        self
    }

    pub fn with_transition_in(mut self, transition: TransitionType) -> Self {
        self.transition_in = Some(transition);
        self
    }

    pub fn with_transition_out(mut self, transition: TransitionType) -> Self {
        self.transition_out = Some(transition);
        self
    }

    pub fn with_emphasis_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.emphasis_words = words.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_subtitle_segments<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subtitle_segments = Some(segments.into_iter().map(Into::into).collect());
        self
    }

    /// Text used for speech synthesis.
    pub fn tts_content(&self) -> &str {
        match self.tts_text.as_deref() {
            Some(text) if !text.is_empty() => text,
            _ => &self.text,
        }
    }

    pub fn is_persona_scene(&self) -> bool {
        self.scene_type.is_persona()
    }

    pub fn is_factual_scene(&self) -> bool {
        self.scene_type.is_factual()
    }

    /// Estimate spoken duration from word count, clamped to the scene type's range.
    pub fn estimate_duration(&self) -> f64 {
        self.estimate_duration_at(DEFAULT_WORDS_PER_MINUTE)
    }

    pub fn estimate_duration_at(&self, words_per_minute: f64) -> f64 {
        let words = self.text.split_whitespace().count() as f64;
        let estimated = if words_per_minute > 0.0 {
            words / words_per_minute * 60.0
        } else {
            0.0
        };
        let (min, max) = self.scene_type.duration_range();
        estimated.clamp(min, max)
    }
}

/// An ordered scene-based script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneScript {
    pub scenes: Vec<Scene>,
    /// Short headline shown over the video
    #[serde(default)]
    pub headline: String,
}

impl SceneScript {
    /// Minimum recommended total duration in seconds.
    pub const MIN_RECOMMENDED_SECS: f64 = 15.0;
    /// Maximum total duration in seconds for short-form platforms.
    pub const MAX_RECOMMENDED_SECS: f64 = 60.0;

    pub fn new(scenes: Vec<Scene>, headline: impl Into<String>) -> Self {
        Self {
            scenes,
            headline: headline.into(),
        }
    }

    pub fn scene_types(&self) -> Vec<SceneType> {
        self.scenes.iter().map(|s| s.scene_type).collect()
    }

    pub fn total_estimated_duration(&self) -> f64 {
        self.scenes.iter().map(Scene::estimate_duration).sum()
    }

    pub fn full_text(&self) -> String {
        self.scenes
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn persona_scene_count(&self) -> usize {
        self.scenes.iter().filter(|s| s.is_persona_scene()).count()
    }

    pub fn has_commentary(&self) -> bool {
        self.persona_scene_count() > 0
    }

    /// Check the script's shape.
    ///
    /// Returns advisory messages; an empty list means the script is well formed.
    pub fn validate_structure(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let types = self.scene_types();

        if let Some(first) = types.first() {
            if *first != SceneType::Hook {
                issues.push("First scene should be HOOK".to_string());
            }
        }

        let has_substance = types
            .iter()
            .any(|t| matches!(t, SceneType::Content | SceneType::Commentary));
        if !has_substance {
            issues.push("Must have at least one CONTENT or COMMENTARY scene".to_string());
        }

        if !self.has_commentary() {
            issues.push(
                "Recommend at least one COMMENTARY or REACTION scene for persona voice".to_string(),
            );
        }

        let duration = self.total_estimated_duration();
        if duration < Self::MIN_RECOMMENDED_SECS {
            issues.push(format!(
                "Script too short: {:.1}s (min {:.0}s recommended)",
                duration,
                Self::MIN_RECOMMENDED_SECS
            ));
        }
        if duration > Self::MAX_RECOMMENDED_SECS {
            issues.push(format!(
                "Script too long: {:.1}s (max {:.0}s)",
                duration,
                Self::MAX_RECOMMENDED_SECS
            ));
        }

        issues
    }
}
