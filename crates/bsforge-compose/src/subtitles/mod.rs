//! Subtitle timelines and their file encodings.

mod ass;
mod builder;
mod srt;

pub use ass::{format_ass_time, AssEncoder};
pub use builder::{visible_len, SubtitleTimelineBuilder, OVERLAP_TOLERANCE};
pub use srt::{format_srt_time, SrtEncoder};

use bsforge_models::{VisualStyle, WordTimestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One subtitle line on the composition timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub style_class: VisualStyle,
    /// Word timings on the composition timeline, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<WordTimestamp>>,
    /// Words to color with the persona secondary color
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emphasis_words: Vec<String>,
}

impl SubtitleSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            style_class: VisualStyle::Neutral,
            words: None,
            emphasis_words: Vec::new(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Per-word highlight durations in centiseconds, in word order.
    pub fn karaoke_ticks(&self) -> Option<Vec<u32>> {
        self.words.as_ref().map(|words| {
            words
                .iter()
                .map(|w| (w.duration().max(0.0) * 100.0).round() as u32)
                .collect()
        })
    }
}

/// Subtitle file encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleFormat {
    /// Styled, centisecond timing
    #[default]
    Ass,
    /// Plain, millisecond timing
    Srt,
}

impl SubtitleFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleFormat::Ass => "ass",
            SubtitleFormat::Srt => "srt",
        }
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Encoded subtitle document carried by a composition plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleAsset {
    pub format: SubtitleFormat,
    pub content: String,
    pub segment_count: usize,
}
