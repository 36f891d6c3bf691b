//! [`Renderer`] implementation on the ffmpeg and ffprobe command-line tools.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bsforge_compose::{
    FilterDescription, Renderer, RendererFailure, RendererResult, SegmentSource, TransitionSpec,
};
use bsforge_models::OutputConfig;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegInput, FfmpegRunner};
use crate::error::{FfmpegError, FfmpegResult};
use crate::filter_syntax::{
    all_cuts, clip_filter_graph, color, concat_filter_graph, concat_list, escape_filter_path, num,
};
use crate::probe::probe_media;

/// Default limit for a single ffmpeg invocation, in seconds.
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 600;

/// Video shorter than its segment by more than this is looped.
const LOOP_THRESHOLD: f64 = 1e-3;

/// Renders composition plans with ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegRenderer {
    output: OutputConfig,
    runner: FfmpegRunner,
}

impl FfmpegRenderer {
    pub fn new(output: OutputConfig) -> Self {
        Self {
            output,
            runner: FfmpegRunner::new()
                .with_timeout(Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS)),
        }
    }

    /// Renderer with the per-invocation timeout read from
    /// `BSFORGE_STAGE_TIMEOUT_SECS`.
    pub fn from_env(output: OutputConfig) -> Self {
        let secs = std::env::var("BSFORGE_STAGE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_STAGE_TIMEOUT_SECS);
        Self::new(output).with_timeout(Duration::from_secs(secs))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.runner = self.runner.with_timeout(timeout);
        self
    }

    pub fn output_config(&self) -> &OutputConfig {
        &self.output
    }

    /// Encoder settings shared by every re-encoding stage.
    fn encode_video(&self, cmd: FfmpegCommand) -> FfmpegCommand {
        cmd.video_codec(self.output.video_codec.clone())
            .preset(self.output.preset.clone())
            .crf(self.output.crf)
            .pixel_format(self.output.pixel_format.clone())
    }

    /// Command for one clip render.
    pub fn clip_command(
        &self,
        source: &SegmentSource,
        filter: &FilterDescription,
        duration: f64,
        output: &Path,
    ) -> FfmpegCommand {
        let fps = filter.canvas.fps;
        let input = match source {
            SegmentSource::Video {
                path,
                native_duration,
            } => {
                let input = FfmpegInput::file(path);
                match native_duration {
                    Some(native) if native + LOOP_THRESHOLD < duration => {
                        input.arg("-stream_loop").arg("-1")
                    }
                    _ => input,
                }
            }
            SegmentSource::Image { path } => FfmpegInput::file(path)
                .arg("-loop")
                .arg("1")
                .arg("-framerate")
                .arg(fps.to_string()),
            SegmentSource::Solid { color: fill } => FfmpegInput::lavfi(format!(
                "color=c={}:s={}x{}:r={}:d={}",
                color(*fill),
                filter.canvas.width,
                filter.canvas.height,
                fps,
                num(duration)
            )),
        };

        let cmd = FfmpegCommand::new(output)
            .input(input)
            .filter_complex(clip_filter_graph(filter, duration, &self.output.pixel_format))
            .map("[v]")
            .duration(duration)
            .frame_rate(fps);
        self.encode_video(cmd).no_audio()
    }

    /// Command joining clips through the concat demuxer.
    fn demux_concat_command(&self, list: &Path, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(output)
            .input(
                FfmpegInput::file(list)
                    .arg("-f")
                    .arg("concat")
                    .arg("-safe")
                    .arg("0"),
            )
            .output_args(["-c", "copy"])
    }

    /// Command joining clips through an xfade graph.
    pub fn transition_concat_command(
        &self,
        clips: &[PathBuf],
        durations: &[f64],
        transitions: &[TransitionSpec],
        output: &Path,
    ) -> FfmpegCommand {
        let cmd = clips
            .iter()
            .fold(FfmpegCommand::new(output), |cmd, clip| cmd.input_file(clip))
            .filter_complex(concat_filter_graph(durations, transitions, self.output.fps))
            .map("[v]");
        self.encode_video(cmd).no_audio()
    }

    pub fn mux_command(&self, video: &Path, audio: &Path, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(output)
            .input_file(video)
            .input_file(audio)
            .map("0:v:0")
            .map("1:a:0")
            .video_codec("copy")
            .audio_codec(self.output.audio_codec.clone())
            .audio_bitrate(self.output.audio_bitrate.clone())
            .shortest()
    }

    pub fn mix_command(
        &self,
        video: &Path,
        music: &Path,
        volume: f64,
        output: &Path,
    ) -> FfmpegCommand {
        FfmpegCommand::new(output)
            .input_file(video)
            .input(FfmpegInput::file(music).arg("-stream_loop").arg("-1"))
            .filter_complex(format!(
                "[1:a]volume={}[music];[0:a][music]amix=inputs=2:duration=first:dropout_transition=0:normalize=0[a]",
                num(volume)
            ))
            .map("0:v:0")
            .map("[a]")
            .video_codec("copy")
            .audio_codec(self.output.audio_codec.clone())
            .audio_bitrate(self.output.audio_bitrate.clone())
    }

    pub fn burn_command(&self, video: &Path, subtitles: &Path, output: &Path) -> FfmpegCommand {
        let filter = match subtitles.extension().and_then(|e| e.to_str()) {
            Some("ass") => format!("ass={}", escape_filter_path(subtitles)),
            _ => format!("subtitles={}", escape_filter_path(subtitles)),
        };
        let cmd = FfmpegCommand::new(output).input_file(video).video_filter(filter);
        self.encode_video(cmd).audio_codec("copy")
    }

    async fn run(&self, cmd: FfmpegCommand) -> RendererResult<()> {
        self.runner.run(&cmd).await.map_err(RendererFailure::from)
    }

    async fn concat_clips(
        &self,
        clips: &[PathBuf],
        transitions: &[TransitionSpec],
        output: &Path,
    ) -> FfmpegResult<()> {
        if clips.is_empty() {
            return Err(FfmpegError::unsupported("no clips to join"));
        }
        if transitions.len() + 1 != clips.len() {
            return Err(FfmpegError::unsupported(format!(
                "{} clips with {} transitions",
                clips.len(),
                transitions.len()
            )));
        }

        if all_cuts(transitions) {
            let list = concat_list_path(output);
            tokio::fs::write(&list, concat_list(clips)).await?;
            let result = self
                .runner
                .run(&self.demux_concat_command(&list, output))
                .await;
            let _ = tokio::fs::remove_file(&list).await;
            return result;
        }

        let mut durations = Vec::with_capacity(clips.len());
        for clip in clips {
            durations.push(probe_media(clip).await?.duration);
        }
        debug!(clips = clips.len(), ?durations, "Joining clips with transitions");
        self.runner
            .run(&self.transition_concat_command(clips, &durations, transitions, output))
            .await
    }
}

/// Demuxer list written next to the concat output.
fn concat_list_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "concat".to_string());
    output.with_file_name(format!("{stem}_list.txt"))
}

#[async_trait]
impl Renderer for FfmpegRenderer {
    async fn render_clip(
        &self,
        source: &SegmentSource,
        filter: &FilterDescription,
        duration: f64,
        output: &Path,
    ) -> RendererResult<()> {
        self.run(self.clip_command(source, filter, duration, output))
            .await
    }

    async fn concat(
        &self,
        clips: &[PathBuf],
        transitions: &[TransitionSpec],
        output: &Path,
    ) -> RendererResult<()> {
        self.concat_clips(clips, transitions, output)
            .await
            .map_err(RendererFailure::from)
    }

    async fn mux_audio(&self, video: &Path, audio: &Path, output: &Path) -> RendererResult<()> {
        self.run(self.mux_command(video, audio, output)).await
    }

    async fn mix_background_audio(
        &self,
        video: &Path,
        music: &Path,
        volume: f64,
        output: &Path,
    ) -> RendererResult<()> {
        self.run(self.mix_command(video, music, volume, output))
            .await
    }

    async fn burn_subtitles(
        &self,
        video: &Path,
        subtitles: &Path,
        output: &Path,
    ) -> RendererResult<()> {
        self.run(self.burn_command(video, subtitles, output)).await
    }

    async fn probe_duration(&self, path: &Path) -> RendererResult<f64> {
        let info = probe_media(path).await.map_err(RendererFailure::from)?;
        info!(path = %path.display(), duration = info.duration, "Probed composition");
        Ok(info.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsforge_compose::filters::Canvas;
    use bsforge_models::{Rgb, TransitionType};

    fn renderer() -> FfmpegRenderer {
        FfmpegRenderer::new(OutputConfig::default())
    }

    fn joined(cmd: &FfmpegCommand) -> String {
        cmd.build_args().join(" ")
    }

    fn passthrough() -> FilterDescription {
        FilterDescription::passthrough(Canvas::new(1080, 1920, 30))
    }

    #[test]
    fn test_image_clip_loops_single_frame() {
        let cmd = renderer().clip_command(
            &SegmentSource::Image {
                path: PathBuf::from("/a/still.jpg"),
            },
            &passthrough(),
            5.0,
            Path::new("/s/clip_0000.mp4"),
        );
        let args = joined(&cmd);
        assert!(args.contains("-loop 1 -framerate 30 -i /a/still.jpg"));
        assert!(args.contains("-map [v] -t 5.000 -r 30"));
        assert!(args.contains("-c:v libx264 -preset medium -crf 23 -pix_fmt yuv420p -an"));
        assert!(args.ends_with("/s/clip_0000.mp4"));
    }

    #[test]
    fn test_short_video_is_looped() {
        let source = |native| SegmentSource::Video {
            path: PathBuf::from("/a/v.mp4"),
            native_duration: Some(native),
        };
        let short = joined(&renderer().clip_command(&source(2.0), &passthrough(), 3.0, Path::new("/o.mp4")));
        assert!(short.contains("-stream_loop -1 -i /a/v.mp4"));

        let long = joined(&renderer().clip_command(&source(8.0), &passthrough(), 3.0, Path::new("/o.mp4")));
        assert!(!long.contains("-stream_loop"));
    }

    #[test]
    fn test_filler_uses_color_source() {
        let cmd = renderer().clip_command(
            &SegmentSource::Solid { color: Rgb::BLACK },
            &passthrough(),
            2.5,
            Path::new("/o.mp4"),
        );
        assert!(joined(&cmd).contains("-f lavfi -i color=c=0x000000:s=1080x1920:r=30:d=2.5"));
    }

    #[test]
    fn test_transition_concat_inputs_every_clip() {
        let clips = vec![PathBuf::from("/s/a.mp4"), PathBuf::from("/s/b.mp4")];
        let transitions = vec![TransitionSpec {
            kind: TransitionType::Zoom,
            duration: 0.3,
            color: None,
        }];
        let args = joined(&renderer().transition_concat_command(
            &clips,
            &[2.0, 3.0],
            &transitions,
            Path::new("/s/concat.mp4"),
        ));
        assert!(args.contains("-i /s/a.mp4 -i /s/b.mp4 -filter_complex"));
        assert!(args.contains("xfade=transition=zoomin:duration=0.3:offset=2"));
    }

    #[test]
    fn test_audio_commands() {
        let r = renderer();
        let mux = joined(&r.mux_command(Path::new("/v.mp4"), Path::new("/n.mp3"), Path::new("/o.mp4")));
        assert!(mux.contains("-map 0:v:0 -map 1:a:0 -c:v copy -c:a aac -b:a 192k -shortest"));

        let mix = joined(&r.mix_command(Path::new("/v.mp4"), Path::new("/m.mp3"), 0.1, Path::new("/o.mp4")));
        assert!(mix.contains("-stream_loop -1 -i /m.mp3"));
        assert!(mix.contains("[1:a]volume=0.1[music];[0:a][music]amix=inputs=2:duration=first"));
    }

    #[test]
    fn test_burn_picks_filter_by_extension() {
        let r = renderer();
        let ass = joined(&r.burn_command(Path::new("/v.mp4"), Path::new("/s/subs.ass"), Path::new("/o.mp4")));
        assert!(ass.contains("-vf ass=/s/subs.ass"));
        assert!(ass.contains("-c:a copy"));

        let srt = joined(&r.burn_command(Path::new("/v.mp4"), Path::new("/s/subs.srt"), Path::new("/o.mp4")));
        assert!(srt.contains("-vf subtitles=/s/subs.srt"));
    }

    #[test]
    fn test_concat_list_path_sits_next_to_output() {
        assert_eq!(
            concat_list_path(Path::new("/scratch/concat.mp4")),
            PathBuf::from("/scratch/concat_list.txt")
        );
    }

    #[tokio::test]
    async fn test_concat_rejects_mismatched_transitions() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = renderer()
            .concat(&[dir.path().join("a.mp4")], &[TransitionSpec::cut()], &dir.path().join("o.mp4"))
            .await
            .unwrap_err();
        assert!(err.message.contains("1 clips with 1 transitions"));
    }
}
