//! Segmentation of speech into subtitle lines.
//!
//! Line length is counted in visible characters: whitespace between words
//! does not count against `max_chars_per_line`.

use bsforge_models::{Scene, SceneTtsResult, WordTimestamp};
use tracing::debug;

use super::SubtitleSegment;
use crate::error::{ComposeError, ComposeResult};
use crate::style::VisualStyleResolver;

/// Overlap between adjacent windows tolerated before failing, in seconds.
pub const OVERLAP_TOLERANCE: f64 = 0.01;

const SENTENCE_TERMINALS: [char; 3] = ['.', '!', '?'];
const FULLWIDTH_TERMINALS: [char; 3] = ['。', '！', '？'];

/// Number of non-whitespace characters in `text`.
pub fn visible_len(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Builds subtitle segments from word timestamps or plain text.
#[derive(Debug, Clone)]
pub struct SubtitleTimelineBuilder {
    max_chars_per_line: usize,
}

impl SubtitleTimelineBuilder {
    pub fn new(max_chars_per_line: usize) -> Self {
        Self {
            max_chars_per_line: max_chars_per_line.max(1),
        }
    }

    pub fn max_chars_per_line(&self) -> usize {
        self.max_chars_per_line
    }

    /// Group timed words into lines.
    ///
    /// A line closes before the word that would push it past the character
    /// limit. Blank words are skipped. Each segment spans its first word's
    /// start to its last word's end.
    pub fn from_timestamps(&self, words: &[WordTimestamp]) -> Vec<SubtitleSegment> {
        let mut segments: Vec<SubtitleSegment> = self
            .group_words(words)
            .into_iter()
            .map(|group| segment_from_words(&group))
            .collect();
        clamp_overlaps(&mut segments);
        segments
    }

    /// Split untimed text into lines over `duration` seconds.
    ///
    /// Sentences get time in proportion to their length. Sentences longer than
    /// the limit are word-wrapped and the pieces share the sentence's time
    /// equally.
    pub fn from_text(&self, text: &str, duration: f64) -> Vec<SubtitleSegment> {
        self.from_text_at(text, 0.0, duration)
    }

    fn from_text_at(&self, text: &str, start: f64, duration: f64) -> Vec<SubtitleSegment> {
        let sentences = split_sentences(text);
        let lines: Vec<Vec<String>> = sentences.iter().map(|s| self.wrap(s)).collect();
        let weights: Vec<usize> = sentences.iter().map(|s| s.chars().count()).collect();
        self.spread(&lines, &weights, start, duration)
    }

    /// Subtitle timeline for a scene-based script.
    ///
    /// `tts_results` must be resolved (see `timeline::resolve_scene_timeline`).
    /// Segments inherit their scene's visual style and tile each scene's
    /// window, so caption time always matches narration time.
    pub fn from_scenes(
        &self,
        scenes: &[Scene],
        tts_results: &[SceneTtsResult],
    ) -> ComposeResult<Vec<SubtitleSegment>> {
        if scenes.len() != tts_results.len() {
            return Err(ComposeError::invalid_plan(format!(
                "{} scenes but {} TTS results",
                scenes.len(),
                tts_results.len()
            )));
        }

        let mut all = Vec::new();
        for (scene, tts) in scenes.iter().zip(tts_results) {
            let window_start = tts.start_offset;
            let window_end = tts.end_offset();
            let words: Vec<WordTimestamp> = tts
                .words()
                .iter()
                .filter(|w| !w.is_blank())
                .map(|w| w.shifted(window_start))
                .collect();

            let mut segments = match scene.subtitle_segments.as_deref() {
                Some(manual) if manual.iter().any(|l| !l.trim().is_empty()) => {
                    self.manual_segments(manual, &words, window_start, window_end)
                }
                _ if !words.is_empty() => self
                    .group_words(&words)
                    .into_iter()
                    .map(|group| segment_from_words(&group))
                    .collect(),
                _ => {
                    let text = scene.text.trim();
                    if text.is_empty() {
                        Vec::new()
                    } else {
                        vec![SubtitleSegment::new(window_start, window_end, text)]
                    }
                }
            };

            tile_window(&mut segments, window_start, window_end, tts.scene_index)?;

            let style = VisualStyleResolver::resolve(scene);
            for segment in &mut segments {
                segment.style_class = style;
                segment.emphasis_words = scene.emphasis_words.clone();
            }
            debug!(
                scene_index = tts.scene_index,
                segments = segments.len(),
                style = %style,
                "Built scene subtitles"
            );
            all.extend(segments);
        }

        check_ordering(&all)?;
        Ok(all)
    }

    /// Lines given by hand. Timed from the words when the word counts agree,
    /// proportionally over the window otherwise.
    fn manual_segments(
        &self,
        manual: &[String],
        words: &[WordTimestamp],
        window_start: f64,
        window_end: f64,
    ) -> Vec<SubtitleSegment> {
        let lines: Vec<&str> = manual
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();
        let counts: Vec<usize> = lines.iter().map(|l| l.split_whitespace().count()).collect();

        if !words.is_empty() && counts.iter().sum::<usize>() == words.len() {
            let mut consumed = 0;
            return lines
                .iter()
                .zip(&counts)
                .map(|(line, count)| {
                    let group = &words[consumed..consumed + count];
                    consumed += count;
                    let mut segment = segment_from_words(group);
                    segment.text = (*line).to_string();
                    segment
                })
                .collect();
        }

        let wrapped: Vec<Vec<String>> = lines.iter().map(|l| vec![(*l).to_string()]).collect();
        let weights: Vec<usize> = lines.iter().map(|l| l.chars().count()).collect();
        self.spread(&wrapped, &weights, window_start, window_end - window_start)
    }

    fn group_words(&self, words: &[WordTimestamp]) -> Vec<Vec<WordTimestamp>> {
        let mut groups = Vec::new();
        let mut current: Vec<WordTimestamp> = Vec::new();
        let mut current_len = 0;

        for word in words {
            let text = word.word.trim();
            if text.is_empty() {
                continue;
            }
            let len = visible_len(text);
            if !current.is_empty() && current_len + len > self.max_chars_per_line {
                groups.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push(WordTimestamp {
                word: text.to_string(),
                start: word.start,
                end: word.end,
            });
            current_len += len;
        }
        if !current.is_empty() {
            groups.push(current);
        }
        groups
    }

    /// Greedy word wrap under the visible-length limit. Words are never split.
    fn wrap(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_len = 0;

        for word in text.split_whitespace() {
            let len = visible_len(word);
            if !current.is_empty() && current_len + len > self.max_chars_per_line {
                chunks.push(current.join(" "));
                current.clear();
                current_len = 0;
            }
            current.push(word);
            current_len += len;
        }
        if !current.is_empty() {
            chunks.push(current.join(" "));
        }
        chunks
    }

    /// Lay out groups of lines over `[start, start + duration]`, each group
    /// weighted by its character count, lines within a group sharing equally.
    fn spread(
        &self,
        groups: &[Vec<String>],
        weights: &[usize],
        start: f64,
        duration: f64,
    ) -> Vec<SubtitleSegment> {
        let total: usize = weights.iter().sum();
        if total == 0 || duration <= 0.0 {
            return Vec::new();
        }

        let end = start + duration;
        let mut segments = Vec::new();
        let mut cursor = start;
        for (lines, weight) in groups.iter().zip(weights) {
            if lines.is_empty() {
                continue;
            }
            let group_duration = duration * (*weight as f64) / (total as f64);
            let line_duration = group_duration / lines.len() as f64;
            for line in lines {
                let line_end = (cursor + line_duration).min(end);
                segments.push(SubtitleSegment::new(cursor, line_end, line.clone()));
                cursor = line_end;
            }
        }
        if let Some(last) = segments.last_mut() {
            last.end = end;
        }
        segments
    }
}

fn segment_from_words(words: &[WordTimestamp]) -> SubtitleSegment {
    let start = words.first().map(|w| w.start).unwrap_or(0.0);
    let end = words.last().map(|w| w.end).unwrap_or(start);
    let text = words
        .iter()
        .map(|w| w.word.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let mut segment = SubtitleSegment::new(start, end, text);
    segment.words = Some(words.to_vec());
    segment
}

/// Split after sentence-ending punctuation.
///
/// ASCII terminals end a sentence only when followed by whitespace (so
/// decimals like `3.5` survive); full-width terminals always do.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let boundary = FULLWIDTH_TERMINALS.contains(&c)
            || (SENTENCE_TERMINALS.contains(&c)
                && chars.peek().map(|n| n.is_whitespace()).unwrap_or(true));
        if boundary {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }
    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

/// Make adjacent segments non-overlapping by pulling ends back.
fn clamp_overlaps(segments: &mut [SubtitleSegment]) {
    for i in 1..segments.len() {
        let next_start = segments[i].start;
        let previous = &mut segments[i - 1];
        if previous.end > next_start {
            previous.end = next_start.max(previous.start);
        }
    }
}

/// Stretch a scene's segments to cover exactly `[window_start, window_end]`.
fn tile_window(
    segments: &mut [SubtitleSegment],
    window_start: f64,
    window_end: f64,
    scene_index: usize,
) -> ComposeResult<()> {
    for pair in segments.windows(2) {
        if pair[1].start + OVERLAP_TOLERANCE < pair[0].start {
            return Err(ComposeError::timing(format!(
                "subtitle '{}' in scene {} starts before the preceding line",
                pair[1].text, scene_index
            )));
        }
    }

    let count = segments.len();
    for i in 0..count {
        if i == 0 {
            segments[i].start = window_start;
        }
        segments[i].end = if i + 1 < count {
            segments[i + 1].start.clamp(window_start, window_end)
        } else {
            window_end
        };
        if i + 1 < count {
            segments[i + 1].start = segments[i].end;
        }
    }
    Ok(())
}

fn check_ordering(segments: &[SubtitleSegment]) -> ComposeResult<()> {
    for pair in segments.windows(2) {
        if pair[0].end > pair[1].start + OVERLAP_TOLERANCE {
            return Err(ComposeError::timing(format!(
                "subtitle windows overlap: '{}' ends at {:.3}s, '{}' starts at {:.3}s",
                pair[0].text, pair[0].end, pair[1].text, pair[1].start
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsforge_models::{SceneType, VisualStyle};

    fn w(word: &str, start: f64, end: f64) -> WordTimestamp {
        WordTimestamp::new(word, start, end).unwrap()
    }

    fn sample_words() -> Vec<WordTimestamp> {
        vec![
            w("Hello", 0.0, 0.5),
            w("world", 0.5, 1.0),
            w("this", 1.0, 1.3),
            w("is", 1.3, 1.5),
            w("a", 1.5, 1.6),
            w("test", 1.6, 2.0),
        ]
    }

    #[test]
    fn test_hello_world_splits_into_two_lines() {
        let segments = SubtitleTimelineBuilder::new(11).from_timestamps(&sample_words());
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Hello world");
        assert_eq!((segments[0].start, segments[0].end), (0.0, 1.0));
        assert_eq!(segments[1].text, "this is a test");
        assert_eq!((segments[1].start, segments[1].end), (1.0, 2.0));
        assert!(segments[0].end <= segments[1].start);
    }

    #[test]
    fn test_empty_and_blank_words() {
        let builder = SubtitleTimelineBuilder::new(20);
        assert!(builder.from_timestamps(&[]).is_empty());

        let words = vec![w("a", 0.0, 0.2), w("  ", 0.2, 0.3), w("b", 0.3, 0.5)];
        let segments = builder.from_timestamps(&words);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "a b");
        assert_eq!(segments[0].words.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_from_timestamps_is_idempotent() {
        let builder = SubtitleTimelineBuilder::new(8);
        let first = builder.from_timestamps(&sample_words());
        let second = builder.from_timestamps(&sample_words());
        assert_eq!(first, second);
    }

    #[test]
    fn test_long_word_gets_own_line() {
        let words = vec![w("hi", 0.0, 0.2), w("supercalifragilistic", 0.2, 1.0), w("ok", 1.0, 1.2)];
        let segments = SubtitleTimelineBuilder::new(5).from_timestamps(&words);
        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["hi", "supercalifragilistic", "ok"]);
    }

    #[test]
    fn test_from_text_proportional() {
        let builder = SubtitleTimelineBuilder::new(40);
        let segments = builder.from_text("Short one. A much longer second sentence!", 4.0);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Short one.");
        assert_eq!(segments[0].start, 0.0);
        // 10 of 40 characters
        assert!((segments[0].end - 1.0).abs() < 1e-9);
        assert_eq!(segments[1].start, segments[0].end);
        assert_eq!(segments[1].end, 4.0);
    }

    #[test]
    fn test_from_text_wraps_long_sentences_equally() {
        let builder = SubtitleTimelineBuilder::new(10);
        let segments = builder.from_text("one two three four five six", 3.0);
        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["one two", "three four", "five six"]);
        for segment in &segments {
            assert!((segment.duration() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_from_text_edge_cases() {
        let builder = SubtitleTimelineBuilder::new(10);
        assert!(builder.from_text("", 5.0).is_empty());
        assert!(builder.from_text("   ", 5.0).is_empty());
        assert_eq!(split_sentences("가격은 3.5배. 정말?"), vec!["가격은 3.5배.", "정말?"]);
        assert_eq!(split_sentences("좋다。나쁘다"), vec!["좋다。", "나쁘다"]);
    }

    fn scene_fixture() -> (Vec<Scene>, Vec<SceneTtsResult>) {
        let scenes = vec![
            Scene::new(SceneType::Hook, "Hello world"),
            Scene::new(SceneType::Commentary, "I think so").with_emphasis_words(["think"]),
            Scene::new(SceneType::Cta, "Subscribe now"),
        ];
        let tts = vec![
            SceneTtsResult::new(0, "/0.mp3", 1.2)
                .with_words(vec![w("Hello", 0.1, 0.5), w("world", 0.5, 1.0)]),
            SceneTtsResult::new(1, "/1.mp3", 2.0)
                .with_start_offset(1.2)
                .with_words(vec![w("I", 0.0, 0.2), w("think", 0.2, 0.7), w("so", 0.8, 1.9)]),
            SceneTtsResult::new(2, "/2.mp3", 1.5).with_start_offset(3.2),
        ];
        (scenes, tts)
    }

    #[test]
    fn test_scene_aware_styles_and_offsets() {
        let (scenes, tts) = scene_fixture();
        let segments = SubtitleTimelineBuilder::new(20).from_scenes(&scenes, &tts).unwrap();

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].style_class, VisualStyle::Neutral);
        assert_eq!(segments[1].style_class, VisualStyle::Persona);
        assert_eq!(segments[2].style_class, VisualStyle::Emphasis);
        assert_eq!(segments[1].emphasis_words, vec!["think".to_string()]);

        let words = segments[1].words.as_ref().unwrap();
        assert!((words[0].start - 1.2).abs() < 1e-9);

        // untimed scene spans its whole window
        assert_eq!(segments[2].text, "Subscribe now");
        assert!((segments[2].start - 3.2).abs() < 1e-9);
        assert!((segments[2].end - 4.7).abs() < 1e-9);
    }

    #[test]
    fn test_scene_aware_duration_matches_narration() {
        let (scenes, tts) = scene_fixture();
        let segments = SubtitleTimelineBuilder::new(4).from_scenes(&scenes, &tts).unwrap();
        let caption: f64 = segments.iter().map(|s| s.duration()).sum();
        let narration: f64 = tts.iter().map(|t| t.duration_seconds).sum();
        assert!((caption - narration).abs() < 1e-9);
        for pair in segments.windows(2) {
            assert!(pair[0].end <= pair[1].start + 1e-12);
        }
    }

    #[test]
    fn test_manual_breaks_follow_word_timing() {
        let scenes = vec![Scene::new(SceneType::Content, "one two three")
            .with_subtitle_segments(["one two", "three"])];
        let tts = vec![SceneTtsResult::new(0, "/0.mp3", 3.0).with_words(vec![
            w("one", 0.0, 0.5),
            w("two", 0.5, 1.0),
            w("three", 1.5, 2.5),
        ])];
        let segments = SubtitleTimelineBuilder::new(20).from_scenes(&scenes, &tts).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "one two");
        assert_eq!(segments[1].start, 1.5);
        assert_eq!(segments[1].end, 3.0);
    }

    #[test]
    fn test_manual_breaks_fall_back_to_proportional() {
        let scenes = vec![Scene::new(SceneType::Content, "x").with_subtitle_segments(["abcd", "efgh"])];
        let tts = vec![SceneTtsResult::new(0, "/0.mp3", 2.0).with_words(vec![w("x", 0.0, 1.0)])];
        let segments = SubtitleTimelineBuilder::new(20).from_scenes(&scenes, &tts).unwrap();
        assert_eq!(segments.len(), 2);
        assert!((segments[0].end - 1.0).abs() < 1e-9);
        assert!(segments[0].words.is_none());
    }

    #[test]
    fn test_scene_count_mismatch() {
        let builder = SubtitleTimelineBuilder::new(20);
        assert!(builder.from_scenes(&[Scene::new(SceneType::Hook, "x")], &[]).is_err());
    }

    #[test]
    fn test_visible_len_ignores_spaces() {
        assert_eq!(visible_len("this is a test"), 11);
        assert_eq!(visible_len("안녕 하세요"), 5);
    }
}
