//! Speech timing: word timestamps and per-scene synthesis results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ModelError, ModelResult};

/// A spoken word with its time window, in seconds relative to its audio clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WordTimestamp {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl WordTimestamp {
    /// Create a validated timestamp (`start >= 0`, `end >= start`, both finite).
    pub fn new(word: impl Into<String>, start: f64, end: f64) -> ModelResult<Self> {
        let word = word.into();
        if !start.is_finite() || !end.is_finite() || start < 0.0 || end < start {
            return Err(ModelError::invalid_word(word, start, end));
        }
        Ok(Self { word, start, end })
    }

    /// Re-check the invariants enforced by [`WordTimestamp::new`].
    ///
    /// Values arriving through serde bypass the constructor.
    pub fn validate(&self) -> ModelResult<()> {
        Self::new(self.word.clone(), self.start, self.end).map(|_| ())
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether the word is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.word.trim().is_empty()
    }

    /// Copy of this word shifted by `offset` seconds.
    pub fn shifted(&self, offset: f64) -> Self {
        Self {
            word: self.word.clone(),
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

/// Speech synthesis output for one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneTtsResult {
    pub scene_index: usize,
    pub audio_path: PathBuf,
    pub duration_seconds: f64,
    /// Word timings relative to this scene's audio
    #[serde(default)]
    pub word_timestamps: Option<Vec<WordTimestamp>>,
    /// Position of this scene in the merged audio track
    #[serde(default)]
    pub start_offset: f64,
}

impl SceneTtsResult {
    pub fn new(scene_index: usize, audio_path: impl Into<PathBuf>, duration_seconds: f64) -> Self {
        Self {
            scene_index,
            audio_path: audio_path.into(),
            duration_seconds,
            word_timestamps: None,
            start_offset: 0.0,
        }
    }

    pub fn with_words(mut self, words: Vec<WordTimestamp>) -> Self {
        self.word_timestamps = Some(words);
        self
    }

    pub fn with_start_offset(mut self, offset: f64) -> Self {
        self.start_offset = offset;
        self
    }

    pub fn end_offset(&self) -> f64 {
        self.start_offset + self.duration_seconds
    }

    /// Word timestamps, empty when synthesis produced none.
    pub fn words(&self) -> &[WordTimestamp] {
        self.word_timestamps.as_deref().unwrap_or(&[])
    }
}
