//! Plain subtitle encoding (SubRip).

use std::fmt::Write as _;

use super::SubtitleSegment;

/// Format seconds as `HH:MM:SS,mmm`, flooring to the millisecond.
pub fn format_srt_time(seconds: f64) -> String {
    let total = ((seconds.max(0.0) * 1000.0) + 1e-6).floor() as u64;
    let h = total / 3_600_000;
    let m = (total % 3_600_000) / 60_000;
    let s = (total % 60_000) / 1000;
    let ms = total % 1000;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

/// Encodes subtitle segments as SRT. Styling is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct SrtEncoder;

impl SrtEncoder {
    pub fn encode(segments: &[SubtitleSegment]) -> String {
        let mut out = String::new();
        for (i, segment) in segments.iter().enumerate() {
            let _ = write!(
                out,
                "{}\n{} --> {}\n{}\n\n",
                i + 1,
                format_srt_time(segment.start),
                format_srt_time(segment.end),
                segment.text.trim()
            );
        }
        out
    }
}
