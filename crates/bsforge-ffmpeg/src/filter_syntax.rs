//! Translation of filter descriptions into ffmpeg filtergraph syntax.

use std::path::Path;

use bsforge_compose::filters::{
    Background, ColorGrade, FilterDescription, FilterNode, FrameComposite, ScaleFit, ZoomMotion,
};
use bsforge_compose::TransitionSpec;
use bsforge_models::{Rgb, TransitionType};

/// Format a number without trailing zeros (`1.0` -> `1`, `0.05` -> `0.05`).
pub fn num(value: f64) -> String {
    let formatted = format!("{:.6}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Color literal as ffmpeg parses it.
pub fn color(rgb: Rgb) -> String {
    format!("0x{:02X}{:02X}{:02X}", rgb.r, rgb.g, rgb.b)
}

/// Escape a path for use as a filter option value.
pub fn escape_filter_path(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let mut escaped = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        if matches!(c, '\'' | ':' | ',' | ';' | '[' | ']' | '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// xfade transition name, `None` for transitions rendered as cuts.
pub fn xfade_name(kind: TransitionType) -> Option<&'static str> {
    match kind {
        TransitionType::Fade => Some("fadeblack"),
        TransitionType::Crossfade => Some("fade"),
        TransitionType::Zoom => Some("zoomin"),
        TransitionType::Slide => Some("slideleft"),
        TransitionType::Flash | TransitionType::None => None,
    }
}

/// Filter text for a single node. Frame composition is handled by the graph.
pub fn node_filter(node: &FilterNode) -> Option<String> {
    let text = match node {
        FilterNode::Scale {
            width,
            height,
            fit: ScaleFit::Cover,
        } => format!("scale={width}:{height}:force_original_aspect_ratio=increase"),
        FilterNode::Scale {
            width,
            height,
            fit: ScaleFit::Contain,
        } => format!(
            "scale={width}:{height}:force_original_aspect_ratio=decrease,\
             pad={width}:{height}:(ow-iw)/2:(oh-ih)/2:color=black"
        ),
        FilterNode::Crop { width, height } => format!("crop={width}:{height}"),
        FilterNode::ZoomPan {
            motion,
            frames,
            width,
            height,
            fps,
        } => format!(
            "zoompan=z='{}':x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':d=1:s={}x{}:fps={}",
            zoom_expression(motion, *frames),
            width,
            height,
            fps
        ),
        FilterNode::ColorGrade(grade) => color_grade(grade),
        FilterNode::Darken { factor } => {
            let f = num(*factor);
            format!("colorchannelmixer=rr={f}:gg={f}:bb={f}")
        }
        FilterNode::Tint { color, strength } => {
            let keep = num(1.0 - strength);
            let add = |channel: u8| num(f64::from(channel) * strength);
            format!(
                "lutrgb=r='val*{keep}+{}':g='val*{keep}+{}':b='val*{keep}+{}'",
                add(color.r),
                add(color.g),
                add(color.b)
            )
        }
        FilterNode::LeftBorder { width, color: c } => {
            format!("drawbox=x=0:y=0:w={width}:h=ih:color={}@1:t=fill", color(*c))
        }
        FilterNode::Vignette { angle } => format!("vignette=angle={}", num(*angle)),
        FilterNode::Frame(_) => return None,
    };
    Some(text)
}

/// Zoom factor expression over the output frame number `on`.
fn zoom_expression(motion: &ZoomMotion, frames: u32) -> String {
    match *motion {
        ZoomMotion::In { from, rate } => format!("{}+{}*on", num(from), num(rate)),
        ZoomMotion::Out { from, to } => {
            let last = frames.saturating_sub(1).max(1);
            format!("{}-{}*min(on/{},1)", num(from), num(from - to), last)
        }
    }
}

fn color_grade(grade: &ColorGrade) -> String {
    format!(
        "eq=brightness={}:contrast={}:saturation={},colorchannelmixer=rr={}:bb={}",
        num(grade.brightness),
        num(grade.contrast),
        num(grade.saturation),
        num(grade.red_gain()),
        num(grade.blue_gain())
    )
}

/// Comma-joined chain for every non-frame node, fitting to the canvas when empty.
pub fn node_chain(description: &FilterDescription) -> String {
    let parts: Vec<String> = description.nodes.iter().filter_map(node_filter).collect();
    if parts.is_empty() {
        let c = description.canvas;
        return format!(
            "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}",
            w = c.width,
            h = c.height
        );
    }
    parts.join(",")
}

/// Complete `-filter_complex` graph for one clip, reading `[0:v]` and writing `[v]`.
pub fn clip_filter_graph(description: &FilterDescription, duration: f64, pixel_format: &str) -> String {
    let fps = description.canvas.fps;
    let chain = node_chain(description);
    let frame = description.nodes.iter().find_map(|n| match n {
        FilterNode::Frame(composite) => Some(composite),
        _ => None,
    });

    match frame {
        None => format!("[0:v]{chain},fps={fps},setsar=1,format={pixel_format}[v]"),
        Some(composite) => {
            let (pad, x, y) = match composite.border {
                Some(border) => (
                    format!(
                        ",pad=iw+{w2}:ih+{w2}:{w}:{w}:color={}",
                        color(border.color),
                        w = border.width,
                        w2 = border.width * 2
                    ),
                    composite.content_x.saturating_sub(border.width),
                    composite.content_y.saturating_sub(border.width),
                ),
                None => (String::new(), composite.content_x, composite.content_y),
            };
            format!(
                "[0:v]{chain},setsar=1{pad}[content];{}[bg];\
                 [bg][content]overlay=x={x}:y={y}:shortest=1,fps={fps},setsar=1,format={pixel_format}[v]",
                background_source(composite, fps, duration)
            )
        }
    }
}

/// Source filter drawing the frame background.
fn background_source(composite: &FrameComposite, fps: u32, duration: f64) -> String {
    let size = format!("{}x{}", composite.canvas_width, composite.canvas_height);
    match composite.background {
        Background::Solid { color: c } => {
            format!("color=c={}:s={size}:r={fps}:d={}", color(c), num(duration))
        }
        Background::VerticalGradient { top, bottom } => {
            let channel = |a: u8, b: u8| format!("{a}+({b}-{a})*Y/(H-1)");
            format!(
                "color=c=black:s={size}:r={fps}:d={},format=rgb24,geq=r='{}':g='{}':b='{}'",
                num(duration),
                channel(top.r, bottom.r),
                channel(top.g, bottom.g),
                channel(top.b, bottom.b)
            )
        }
    }
}

/// Whether clips can be joined without a filter graph.
pub fn all_cuts(transitions: &[TransitionSpec]) -> bool {
    transitions.iter().all(TransitionSpec::is_cut)
}

/// `-filter_complex` graph joining `durations.len()` clip inputs into `[v]`.
///
/// Each clip followed by a blended transition is extended by the transition
/// length (last frame held), so the blend overlaps padding rather than
/// content and the joined length equals the sum of `durations`. Flashes are
/// cuts with a one-window full-frame box in the flash color.
pub fn concat_filter_graph(durations: &[f64], transitions: &[TransitionSpec], fps: u32) -> String {
    let n = durations.len();
    let mut parts = Vec::with_capacity(n * 2 + 1);

    for i in 0..n {
        let pad = transitions
            .get(i)
            .filter(|t| xfade_name(t.kind).is_some() && t.duration > 0.0)
            .map(|t| t.duration);
        let tpad = pad
            .map(|d| format!(",tpad=stop_mode=clone:stop_duration={}", num(d)))
            .unwrap_or_default();
        parts.push(format!("[{i}:v]settb=AVTB,fps={fps}{tpad}[p{i}]"));
    }

    let mut current = "p0".to_string();
    let mut boundary = durations.first().copied().unwrap_or(0.0);
    let mut flashes = Vec::new();

    for (i, transition) in transitions.iter().enumerate().take(n.saturating_sub(1)) {
        let next = format!("p{}", i + 1);
        let joined = format!("j{}", i + 1);
        match xfade_name(transition.kind).filter(|_| transition.duration > 0.0) {
            Some(name) => parts.push(format!(
                "[{current}][{next}]xfade=transition={name}:duration={}:offset={}[{joined}]",
                num(transition.duration),
                num(boundary)
            )),
            None => parts.push(format!("[{current}][{next}]concat=n=2:v=1:a=0[{joined}]")),
        }
        if transition.kind == TransitionType::Flash && transition.duration > 0.0 {
            let flash = transition.color.unwrap_or(Rgb::WHITE);
            flashes.push(format!(
                "drawbox=x=0:y=0:w=iw:h=ih:color={}@1:t=fill:enable='between(t,{},{})'",
                color(flash),
                num(boundary),
                num(boundary + transition.duration)
            ));
        }
        boundary += durations[i + 1];
        current = joined;
    }

    let tail = if flashes.is_empty() {
        "null".to_string()
    } else {
        flashes.join(",")
    };
    parts.push(format!("[{current}]{tail}[v]"));
    parts.join(";")
}

/// Concat demuxer list for `paths`.
pub fn concat_list(paths: &[impl AsRef<Path>]) -> String {
    paths
        .iter()
        .map(|p| {
            let path = p.as_ref().to_string_lossy().replace('\'', "'\\''");
            format!("file '{path}'\n")
        })
        .collect()
}
