//! Scene timeline resolution.
//!
//! Scene audio clips are laid end to end: scene `i + 1` starts exactly where
//! scene `i` ends. Upstream results either leave `start_offset` unset (all
//! zero) or supply offsets that must already satisfy that rule.

use bsforge_models::SceneTtsResult;

use crate::error::{ComposeError, ComposeResult};

/// Allowed drift between supplied and cumulative offsets, in seconds.
pub const OFFSET_TOLERANCE: f64 = 0.001;
/// Allowed overrun of a word past the end of its scene audio, in seconds.
pub const WORD_OVERRUN_TOLERANCE: f64 = 0.05;

/// Order results by scene index and resolve their start offsets.
///
/// Fails when indices are not exactly `0..n`, a duration is negative or not
/// finite, a word timestamp is invalid or runs past its scene, or supplied
/// offsets leave gaps or overlaps.
pub fn resolve_scene_timeline(results: &[SceneTtsResult]) -> ComposeResult<Vec<SceneTtsResult>> {
    let mut ordered: Vec<SceneTtsResult> = results.to_vec();
    ordered.sort_by_key(|r| r.scene_index);

    for (position, result) in ordered.iter().enumerate() {
        if result.scene_index != position {
            return Err(ComposeError::timing(format!(
                "expected TTS result for scene {}, found scene {}",
                position, result.scene_index
            )));
        }
        validate_result(result)?;
    }

    let offsets_supplied = ordered.iter().any(|r| r.start_offset != 0.0);
    let mut cursor = if offsets_supplied {
        ordered.first().map(|r| r.start_offset).unwrap_or(0.0)
    } else {
        0.0
    };

    if cursor < 0.0 || !cursor.is_finite() {
        return Err(ComposeError::timing(format!(
            "scene 0 starts at invalid offset {cursor}"
        )));
    }

    for result in ordered.iter_mut() {
        if offsets_supplied && (result.start_offset - cursor).abs() > OFFSET_TOLERANCE {
            return Err(ComposeError::timing(format!(
                "scene {} starts at {:.3}s but previous scene ends at {:.3}s",
                result.scene_index, result.start_offset, cursor
            )));
        }
        result.start_offset = cursor;
        cursor += result.duration_seconds;
    }

    Ok(ordered)
}

/// Total narration length of resolved results.
pub fn total_duration(results: &[SceneTtsResult]) -> f64 {
    results.iter().map(|r| r.duration_seconds).sum()
}

fn validate_result(result: &SceneTtsResult) -> ComposeResult<()> {
    if !result.duration_seconds.is_finite() || result.duration_seconds < 0.0 {
        return Err(ComposeError::timing(format!(
            "scene {} has invalid duration {}",
            result.scene_index, result.duration_seconds
        )));
    }

    let mut previous_start = 0.0_f64;
    for word in result.words() {
        word.validate()
            .map_err(|e| ComposeError::timing(format!("scene {}: {}", result.scene_index, e)))?;
        if word.end > result.duration_seconds + WORD_OVERRUN_TOLERANCE {
            return Err(ComposeError::timing(format!(
                "word '{}' in scene {} ends at {:.3}s, after the scene audio ({:.3}s)",
                word.word, result.scene_index, word.end, result.duration_seconds
            )));
        }
        if word.start + OFFSET_TOLERANCE < previous_start {
            return Err(ComposeError::timing(format!(
                "word '{}' in scene {} starts before the previous word",
                word.word, result.scene_index
            )));
        }
        previous_start = word.start;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsforge_models::WordTimestamp;

    fn tts(index: usize, duration: f64) -> SceneTtsResult {
        SceneTtsResult::new(index, format!("/tmp/scene_{index}.mp3"), duration)
    }

    #[test]
    fn test_offsets_are_cumulative() {
        let resolved = resolve_scene_timeline(&[tts(2, 1.5), tts(0, 2.0), tts(1, 3.0)]).unwrap();
        let offsets: Vec<f64> = resolved.iter().map(|r| r.start_offset).collect();
        assert_eq!(offsets, vec![0.0, 2.0, 5.0]);
        assert_eq!(total_duration(&resolved), 6.5);
        for pair in resolved.windows(2) {
            assert_eq!(pair[1].start_offset, pair[0].end_offset());
        }
    }

    #[test]
    fn test_supplied_offsets_are_verified() {
        let ok = vec![tts(0, 2.0), tts(1, 3.0).with_start_offset(2.0)];
        assert!(resolve_scene_timeline(&ok).is_ok());

        let gap = vec![tts(0, 2.0), tts(1, 3.0).with_start_offset(2.5)];
        assert!(matches!(
            resolve_scene_timeline(&gap),
            Err(ComposeError::TimingInconsistency(_))
        ));
    }

    #[test]
    fn test_negative_duration_fails() {
        let err = resolve_scene_timeline(&[tts(0, -1.0)]).unwrap_err();
        assert!(matches!(err, ComposeError::TimingInconsistency(_)));
    }

    #[test]
    fn test_missing_index_fails() {
        assert!(resolve_scene_timeline(&[tts(0, 1.0), tts(2, 1.0)]).is_err());
    }

    #[test]
    fn test_word_past_scene_end_fails() {
        let result = tts(0, 1.0).with_words(vec![WordTimestamp::new("late", 0.5, 1.2).unwrap()]);
        assert!(resolve_scene_timeline(&[result]).is_err());
    }

    #[test]
    fn test_empty_input() {
        assert!(resolve_scene_timeline(&[]).unwrap().is_empty());
    }
}
