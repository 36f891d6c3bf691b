//! Styled subtitle encoding (Advanced SubStation Alpha).

use std::fmt::Write as _;

use bsforge_models::{
    LayoutConfig, PersonaStyleConfig, Rgb, SubtitleTemplateConfig, VisualStyle, WordTimestamp,
};

use super::SubtitleSegment;

/// Horizontal margin of every style row, in pixels.
const HORIZONTAL_MARGIN: u32 = 30;
/// Font size multiplier for the emphasis style.
const EMPHASIS_FONT_SCALE: f64 = 1.1;

/// Format seconds as `H:MM:SS.CC`, flooring to the centisecond.
pub fn format_ass_time(seconds: f64) -> String {
    // nudge before flooring so 0.29 does not land on 28cs
    let total = ((seconds.max(0.0) * 100.0) + 1e-6).floor() as u64;
    let h = total / 360_000;
    let m = (total % 360_000) / 6_000;
    let s = (total % 6_000) / 100;
    let cs = total % 100;
    format!("{}:{:02}:{:02}.{:02}", h, m, s, cs)
}

/// One `[V4+ Styles]` row.
#[derive(Debug, Clone, PartialEq)]
struct StyleRow {
    name: &'static str,
    font: String,
    size: u32,
    primary: String,
    secondary: String,
    outline_color: String,
    back: String,
    bold: bool,
    border_style: u8,
    outline: f64,
    shadow: f64,
    alignment: u8,
    margin_v: u32,
}

impl StyleRow {
    fn render(&self) -> String {
        format!(
            "Style: {},{},{},{},{},{},{},{},0,0,0,100,100,0,0,{},{},{},{},{},{},{},1",
            self.name,
            self.font,
            self.size,
            self.primary,
            self.secondary,
            self.outline_color,
            self.back,
            if self.bold { -1 } else { 0 },
            self.border_style,
            self.outline,
            self.shadow,
            self.alignment,
            HORIZONTAL_MARGIN,
            HORIZONTAL_MARGIN,
            self.margin_v,
        )
    }
}

/// Encodes subtitle segments as an ASS document.
#[derive(Debug, Clone)]
pub struct AssEncoder {
    title: String,
    width: u32,
    height: u32,
    template: SubtitleTemplateConfig,
    layout: LayoutConfig,
    persona: PersonaStyleConfig,
}

impl AssEncoder {
    pub fn new(
        width: u32,
        height: u32,
        template: SubtitleTemplateConfig,
        layout: LayoutConfig,
        persona: PersonaStyleConfig,
    ) -> Self {
        Self {
            title: "BSForge".to_string(),
            width,
            height,
            template,
            layout,
            persona,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Full document: script info, one style row per style class in use, events.
    pub fn encode(&self, segments: &[SubtitleSegment]) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "[Script Info]");
        let _ = writeln!(out, "Title: {}", self.title);
        let _ = writeln!(out, "ScriptType: v4.00+");
        let _ = writeln!(out, "PlayResX: {}", self.width);
        let _ = writeln!(out, "PlayResY: {}", self.height);
        let _ = writeln!(out, "WrapStyle: 0");
        let _ = writeln!(out, "ScaledBorderAndShadow: yes");
        out.push('\n');

        let _ = writeln!(out, "[V4+ Styles]");
        let _ = writeln!(
            out,
            "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, \
             BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, \
             BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding"
        );
        for style in self.styles_in_use(segments) {
            let _ = writeln!(out, "{}", self.style_row(style).render());
        }
        out.push('\n');

        let _ = writeln!(out, "[Events]");
        let _ = writeln!(
            out,
            "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text"
        );
        for segment in segments {
            let _ = writeln!(
                out,
                "Dialogue: 0,{},{},{},,0,0,0,,{}",
                format_ass_time(segment.start),
                format_ass_time(segment.end),
                segment.style_class.style_name(),
                self.dialogue_text(segment)
            );
        }
        out
    }

    /// Neutral is always declared; other styles only when a segment uses them.
    fn styles_in_use(&self, segments: &[SubtitleSegment]) -> Vec<VisualStyle> {
        VisualStyle::ALL
            .iter()
            .copied()
            .filter(|style| {
                *style == VisualStyle::Neutral || segments.iter().any(|s| s.style_class == *style)
            })
            .collect()
    }

    fn style_row(&self, style: VisualStyle) -> StyleRow {
        let t = &self.template;
        let (border_style, back) = if t.background_enabled {
            (3, t.background_color.to_ass(t.background_opacity))
        } else {
            (1, Rgb::BLACK.to_ass(0.0))
        };
        let base = StyleRow {
            name: style.style_name(),
            font: t.font_name.clone(),
            size: t.font_size,
            primary: t.primary_color.to_ass(1.0),
            secondary: t.highlight_color.to_ass(1.0),
            outline_color: t.outline_color.to_ass(1.0),
            back,
            bold: t.bold,
            border_style,
            outline: t.outline_width,
            shadow: t.shadow_depth,
            alignment: self.layout.subtitle_position.ass_alignment(),
            margin_v: self
                .layout
                .subtitle_position
                .vertical_margin(self.height, self.layout.subtitle_margin_ratio),
        };

        match style {
            VisualStyle::Neutral => base,
            VisualStyle::Persona => StyleRow {
                outline_color: self.persona.accent_color.to_ass(1.0),
                back: if t.background_enabled {
                    self.persona
                        .accent_color
                        .to_ass(self.persona.overlay_opacity_persona)
                } else {
                    base.back.clone()
                },
                ..base
            },
            VisualStyle::Emphasis => StyleRow {
                size: (f64::from(t.font_size) * EMPHASIS_FONT_SCALE).round() as u32,
                primary: self.persona.secondary_color.to_ass(1.0),
                bold: true,
                ..base
            },
        }
    }

    fn dialogue_text(&self, segment: &SubtitleSegment) -> String {
        let mut text = String::new();
        if self.template.fade_in_ms > 0 || self.template.fade_out_ms > 0 {
            let _ = write!(
                text,
                "{{\\fad({},{})}}",
                self.template.fade_in_ms, self.template.fade_out_ms
            );
        }

        match segment.words.as_deref() {
            Some(words) if self.template.karaoke_enabled && !words.is_empty() => {
                text.push_str(&self.karaoke_text(segment, words));
            }
            _ => {
                let body = segment
                    .text
                    .split_whitespace()
                    .map(|w| self.decorate(w, &segment.emphasis_words))
                    .collect::<Vec<_>>()
                    .join(" ");
                text.push_str(&body);
            }
        }
        text
    }

    fn karaoke_text(&self, segment: &SubtitleSegment, words: &[WordTimestamp]) -> String {
        let ticks = segment.karaoke_ticks().unwrap_or_default();
        let mut parts = Vec::with_capacity(words.len() + 1);

        // silence between line start and first word
        let lead = ((words[0].start - segment.start).max(0.0) * 100.0).round() as u32;
        let mut first = String::new();
        if lead > 0 {
            let _ = write!(first, "{{\\k{}}}", lead);
        }

        for (i, (word, tick)) in words.iter().zip(ticks).enumerate() {
            let mut part = if i == 0 { std::mem::take(&mut first) } else { String::new() };
            let _ = write!(part, "{{\\k{}}}", tick);
            part.push_str(&self.decorate(&word.word, &segment.emphasis_words));
            parts.push(part);
        }
        parts.join(" ")
    }

    /// Escape a word and color it when it is an emphasis word or contains numbers.
    fn decorate(&self, word: &str, emphasis_words: &[String]) -> String {
        let escaped = escape_text(word);
        if is_emphasis(word, emphasis_words) {
            return format!(
                "{{\\c{}}}{}{{\\c}}",
                self.persona.secondary_color.to_ass_inline(),
                escaped
            );
        }
        if self.template.auto_highlight_numbers {
            return highlight_numbers(&escaped, self.template.highlight_color);
        }
        escaped
    }
}

fn is_emphasis(word: &str, emphasis_words: &[String]) -> bool {
    let bare = word.trim_matches(|c: char| !c.is_alphanumeric());
    !bare.is_empty()
        && emphasis_words
            .iter()
            .any(|e| e.trim().eq_ignore_ascii_case(bare) || e.trim() == bare)
}

/// Wrap each run of digits (with inner `.`, `,`, `%`) in a color override.
fn highlight_numbers(text: &str, color: Rgb) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_digit() {
            let start = i;
            while i < chars.len()
                && (chars[i].is_ascii_digit() || matches!(chars[i], '.' | ',' | '%'))
            {
                i += 1;
            }
            let mut end = i;
            while end > start && matches!(chars[end - 1], '.' | ',') {
                end -= 1;
            }
            let run: String = chars[start..end].iter().collect();
            let _ = write!(out, "{{\\c{}}}{}{{\\c}}", color.to_ass_inline(), run);
            out.extend(&chars[end..i]);
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// Braces open override blocks in ASS; newlines become hard breaks.
fn escape_text(text: &str) -> String {
    text.replace('{', "(")
        .replace('}', ")")
        .replace("\r\n", "\\N")
        .replace('\n', "\\N")
}
