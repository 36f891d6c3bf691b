//! End-to-end composition against a recording renderer.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bsforge_compose::{
    ComposeError, ComposerConfig, CompositionExecutor, CompositionPlan, CompositionPlanner,
    CompositionRequest, FilterDescription, RenderStage, Renderer, RendererFailure,
    RendererResult, SegmentSource, TransitionSpec,
};
use bsforge_models::{
    OutputConfig, PersonaStyleConfig, Scene, SceneTtsResult, SceneType, SceneVisualResult,
    VideoTemplateConfig, VisualAsset, WordTimestamp,
};
use tempfile::TempDir;
use tokio::sync::watch;

#[derive(Default)]
struct RecordingRenderer {
    calls: Mutex<Vec<String>>,
    sources: Mutex<Vec<SegmentSource>>,
    fail_at: Option<RenderStage>,
    cancel_at: Option<(RenderStage, watch::Sender<bool>)>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingRenderer {
    fn failing_at(stage: RenderStage) -> Self {
        Self {
            fail_at: Some(stage),
            ..Self::default()
        }
    }

    fn cancelling_at(stage: RenderStage, tx: watch::Sender<bool>) -> Self {
        Self {
            cancel_at: Some((stage, tx)),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn invoke(&self, stage: RenderStage, output: &Path) -> RendererResult<()> {
        self.calls.lock().unwrap().push(stage.as_str().to_string());
        if let Some((at, tx)) = &self.cancel_at {
            if *at == stage {
                let _ = tx.send(true);
            }
        }
        if self.fail_at == Some(stage) {
            return Err(RendererFailure::new(format!("{} exited with status 1", stage))
                .with_diagnostics("Error opening filters!"));
        }
        tokio::fs::write(output, stage.as_str()).await.unwrap();
        Ok(())
    }
}

#[async_trait]
impl Renderer for RecordingRenderer {
    async fn render_clip(
        &self,
        source: &SegmentSource,
        _filter: &FilterDescription,
        _duration: f64,
        output: &Path,
    ) -> RendererResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.sources.lock().unwrap().push(source.clone());
        self.invoke(RenderStage::RenderClip, output).await
    }

    async fn concat(
        &self,
        clips: &[PathBuf],
        transitions: &[TransitionSpec],
        output: &Path,
    ) -> RendererResult<()> {
        assert_eq!(transitions.len() + 1, clips.len());
        assert!(clips.iter().all(|c| c.is_file()));
        self.invoke(RenderStage::Concat, output).await
    }

    async fn mux_audio(&self, video: &Path, _audio: &Path, output: &Path) -> RendererResult<()> {
        assert!(video.is_file());
        self.invoke(RenderStage::MuxAudio, output).await
    }

    async fn mix_background_audio(
        &self,
        video: &Path,
        _music: &Path,
        volume: f64,
        output: &Path,
    ) -> RendererResult<()> {
        assert!(video.is_file());
        assert!(volume > 0.0);
        self.invoke(RenderStage::MixBackgroundAudio, output).await
    }

    async fn burn_subtitles(
        &self,
        video: &Path,
        subtitles: &Path,
        output: &Path,
    ) -> RendererResult<()> {
        assert!(video.is_file());
        let content = tokio::fs::read_to_string(subtitles).await.unwrap();
        assert!(content.starts_with("[Script Info]"));
        self.invoke(RenderStage::BurnSubtitles, output).await
    }

    async fn probe_duration(&self, path: &Path) -> RendererResult<f64> {
        self.calls
            .lock()
            .unwrap()
            .push(RenderStage::ProbeDuration.as_str().to_string());
        if self.fail_at == Some(RenderStage::ProbeDuration) {
            return Err(RendererFailure::new("ffprobe failed"));
        }
        assert!(path.is_file());
        Ok(9.0)
    }
}

fn words(text: &str, start: f64, step: f64) -> Vec<WordTimestamp> {
    text.split_whitespace()
        .enumerate()
        .map(|(i, w)| {
            let s = start + step * i as f64;
            WordTimestamp::new(w, s, s + step).unwrap()
        })
        .collect()
}

fn scene_plan(missing_scene: Option<usize>) -> CompositionPlan {
    let scenes = vec![
        Scene::new(SceneType::Hook, "Markets just flipped"),
        Scene::new(SceneType::Content, "Rates fell by half a point"),
        Scene::new(SceneType::Commentary, "I did not see that coming"),
    ];
    let tts = vec![
        SceneTtsResult::new(0, "/tts/0.mp3", 2.0).with_words(words("Markets just flipped", 0.0, 0.5)),
        SceneTtsResult::new(1, "/tts/1.mp3", 4.0)
            .with_words(words("Rates fell by half a point", 0.0, 0.5)),
        SceneTtsResult::new(2, "/tts/2.mp3", 3.0)
            .with_words(words("I did not see that coming", 0.0, 0.5)),
    ];
    let visuals = (0..3)
        .map(|i| {
            let asset = (Some(i) != missing_scene).then(|| VisualAsset::image(format!("/img/{i}.jpg")));
            SceneVisualResult::new(i, asset, 0.0)
        })
        .collect();

    CompositionPlanner::new(
        OutputConfig::default(),
        VideoTemplateConfig::default(),
        PersonaStyleConfig::default(),
    )
    .with_availability_check(|asset| asset.path.is_some())
    .plan(
        &CompositionRequest::scenes(scenes, tts, visuals, "/tts/merged.mp3")
            .with_background_music("/music/bed.mp3"),
    )
    .unwrap()
}

fn config(scratch: &TempDir) -> ComposerConfig {
    ComposerConfig::default()
        .with_max_render_parallel(2)
        .with_scratch_dir(scratch.path())
}

fn scratch_is_empty(scratch: &TempDir) -> bool {
    std::fs::read_dir(scratch.path()).unwrap().next().is_none()
}

#[tokio::test]
async fn test_stages_run_in_order_and_publish() {
    let scratch = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("final/video.mp4");

    let renderer = Arc::new(RecordingRenderer::default());
    let executor = CompositionExecutor::new(renderer.clone(), config(&scratch));
    let (_tx, rx) = watch::channel(false);

    let result = executor.execute(&scene_plan(None), &output, rx).await.unwrap();

    assert_eq!(
        renderer.calls(),
        vec![
            "render_clip",
            "render_clip",
            "render_clip",
            "concat",
            "mux_audio",
            "mix_background_audio",
            "burn_subtitles",
            "probe_duration",
        ]
    );
    assert_eq!(result.video_path, output);
    assert_eq!(result.duration_seconds, 9.0);
    assert_eq!(result.resolution, "1080x1920");
    assert_eq!(result.fps, 30);
    assert_eq!(result.file_size_bytes, "burn_subtitles".len() as u64);
    assert!(result.subtitle_path.is_none());
    assert!(output.is_file());
    assert!(scratch_is_empty(&scratch));
}

#[tokio::test]
async fn test_render_pool_is_bounded() {
    let scratch = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();

    let renderer = Arc::new(RecordingRenderer::default());
    let executor = CompositionExecutor::new(
        renderer.clone(),
        config(&scratch).with_max_render_parallel(1),
    );
    let (_tx, rx) = watch::channel(false);

    executor
        .execute(&scene_plan(None), &out_dir.path().join("v.mp4"), rx)
        .await
        .unwrap();
    assert_eq!(renderer.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stage_failure_aborts_without_output() {
    let scratch = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("video.mp4");

    let renderer = Arc::new(RecordingRenderer::failing_at(RenderStage::Concat));
    let executor = CompositionExecutor::new(renderer.clone(), config(&scratch));
    let (_tx, rx) = watch::channel(false);

    let err = executor.execute(&scene_plan(None), &output, rx).await.unwrap_err();

    assert_eq!(err.stage(), Some(RenderStage::Concat));
    assert!(err.to_string().contains("Error opening filters!"));
    assert!(!renderer.calls().contains(&"mux_audio".to_string()));
    assert!(!output.exists());
    assert!(scratch_is_empty(&scratch));
}

#[tokio::test]
async fn test_clip_failure_reports_segment() {
    let scratch = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("video.mp4");

    let renderer = Arc::new(RecordingRenderer::failing_at(RenderStage::RenderClip));
    let executor = CompositionExecutor::new(renderer.clone(), config(&scratch));
    let (_tx, rx) = watch::channel(false);

    let err = executor.execute(&scene_plan(None), &output, rx).await.unwrap_err();

    assert_eq!(err.stage(), Some(RenderStage::RenderClip));
    assert!(err.to_string().contains("segment 0"));
    assert!(!renderer.calls().contains(&"concat".to_string()));
    assert!(!output.exists());
    assert!(scratch_is_empty(&scratch));
}

#[tokio::test]
async fn test_probe_failure_leaves_no_output() {
    let scratch = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("video.mp4");

    let renderer = Arc::new(RecordingRenderer::failing_at(RenderStage::ProbeDuration));
    let executor = CompositionExecutor::new(renderer, config(&scratch));
    let (_tx, rx) = watch::channel(false);

    let err = executor.execute(&scene_plan(None), &output, rx).await.unwrap_err();
    assert_eq!(err.stage(), Some(RenderStage::ProbeDuration));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let scratch = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("video.mp4");

    let renderer = Arc::new(RecordingRenderer::default());
    let executor = CompositionExecutor::new(renderer.clone(), config(&scratch));
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let err = executor.execute(&scene_plan(None), &output, rx).await.unwrap_err();

    assert!(matches!(err, ComposeError::Cancelled));
    assert!(renderer.calls().is_empty());
    assert!(!output.exists());
}

#[tokio::test]
async fn test_cancellation_observed_at_next_stage() {
    let scratch = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("video.mp4");

    let (tx, rx) = watch::channel(false);
    let renderer = Arc::new(RecordingRenderer::cancelling_at(RenderStage::MuxAudio, tx));
    let executor = CompositionExecutor::new(renderer.clone(), config(&scratch));

    let err = executor.execute(&scene_plan(None), &output, rx).await.unwrap_err();

    assert!(matches!(err, ComposeError::Cancelled));
    let calls = renderer.calls();
    assert_eq!(calls.last().map(String::as_str), Some("mux_audio"));
    assert!(!output.exists());
    assert!(scratch_is_empty(&scratch));
}

#[tokio::test]
async fn test_missing_asset_renders_filler() {
    let scratch = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();

    let plan = scene_plan(Some(1));
    assert_eq!(plan.warnings.len(), 1);
    assert_eq!(plan.segments[1].target_duration, 4.0);

    let renderer = Arc::new(RecordingRenderer::default());
    let executor = CompositionExecutor::new(renderer.clone(), config(&scratch));
    let (_tx, rx) = watch::channel(false);

    executor
        .execute(&plan, &out_dir.path().join("video.mp4"), rx)
        .await
        .unwrap();

    let sources = renderer.sources.lock().unwrap().clone();
    assert_eq!(sources.len(), 3);
    assert_eq!(
        sources
            .iter()
            .filter(|s| matches!(s, SegmentSource::Solid { .. }))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_sidecar_subtitles_published() {
    let scratch = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("video.mp4");

    let renderer = Arc::new(RecordingRenderer::default());
    let executor = CompositionExecutor::new(
        renderer,
        config(&scratch).with_published_subtitles(),
    );
    let (_tx, rx) = watch::channel(false);

    let result = executor.execute(&scene_plan(None), &output, rx).await.unwrap();

    let sidecar = out_dir.path().join("video.ass");
    assert_eq!(result.subtitle_path, Some(sidecar.clone()));
    let content = std::fs::read_to_string(sidecar).unwrap();
    assert!(content.contains("Style: Persona,"));
    assert!(content.contains("{\\k50}Markets {\\k50}just {\\k50}flipped"));
}

#[tokio::test]
async fn test_failed_sidecar_publish_leaves_no_video() {
    let scratch = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("video.mp4");

    // a non-empty directory where the sidecar should go cannot be replaced
    let blocked = out_dir.path().join("video.ass");
    std::fs::create_dir(&blocked).unwrap();
    std::fs::write(blocked.join("keep"), b"x").unwrap();

    let renderer = Arc::new(RecordingRenderer::default());
    let executor = CompositionExecutor::new(
        renderer,
        config(&scratch).with_published_subtitles(),
    );
    let (_tx, rx) = watch::channel(false);

    let err = executor.execute(&scene_plan(None), &output, rx).await.unwrap_err();
    assert_eq!(err.stage(), Some(RenderStage::Publish));
    assert!(!output.exists());
    assert!(blocked.join("keep").exists());
    assert!(scratch_is_empty(&scratch));
}
