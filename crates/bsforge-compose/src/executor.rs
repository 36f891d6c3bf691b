//! Plan execution against a [`Renderer`].
//!
//! Stages run strictly in order: clip renders (bounded pool) -> concat ->
//! narration mux -> background mix -> subtitle burn -> probe -> publish.
//! All intermediate files live in a per-invocation scratch directory that is
//! removed on every exit path. The output path is written only by the final
//! publish step.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Semaphore};
use tracing::{debug, Instrument};

use crate::config::ComposerConfig;
use crate::error::{ComposeError, ComposeResult, RenderStage};
use crate::fs_utils::{copy_atomic, move_file};
use crate::logging::CompositionLogger;
use crate::metrics;
use crate::plan::CompositionPlan;
use crate::renderer::{Renderer, RendererResult};
use crate::sequencer::RenderSegment;

/// Published composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionResult {
    pub video_path: PathBuf,
    pub duration_seconds: f64,
    pub file_size_bytes: u64,
    /// "WxH"
    pub resolution: String,
    pub fps: u32,
    /// Sidecar subtitle file, when published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_path: Option<PathBuf>,
}

/// Executes composition plans.
pub struct CompositionExecutor<R: Renderer + ?Sized> {
    renderer: Arc<R>,
    config: ComposerConfig,
}

impl<R: Renderer + ?Sized> CompositionExecutor<R> {
    pub fn new(renderer: Arc<R>, config: ComposerConfig) -> Self {
        Self { renderer, config }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Execute `plan` and publish the video at `output_path`.
    ///
    /// `cancel` is observed between renderer invocations. A cancelled or
    /// failed composition leaves nothing at `output_path`.
    pub async fn execute(
        &self,
        plan: &CompositionPlan,
        output_path: &Path,
        cancel: watch::Receiver<bool>,
    ) -> ComposeResult<CompositionResult> {
        let logger = CompositionLogger::new(&plan.id, plan.mode.as_str());
        let span = logger.create_span();

        let result = self
            .run(plan, output_path, &cancel, &logger)
            .instrument(span)
            .await;

        match &result {
            Ok(done) => {
                metrics::record_composition_completed();
                logger.log_completion(&format!(
                    "{} ({:.2}s, {} bytes)",
                    done.video_path.display(),
                    done.duration_seconds,
                    done.file_size_bytes
                ));
            }
            Err(e) => {
                metrics::record_composition_failed(failure_reason(e));
                logger.log_error(&e.to_string());
            }
        }
        result
    }

    async fn run(
        &self,
        plan: &CompositionPlan,
        output_path: &Path,
        cancel: &watch::Receiver<bool>,
        logger: &CompositionLogger,
    ) -> ComposeResult<CompositionResult> {
        plan.validate()?;
        ensure_not_cancelled(cancel)?;
        logger.log_start(&format!(
            "{} segments, {:.2}s",
            plan.segments.len(),
            plan.total_duration()
        ));

        let scratch_root = self.config.scratch_root();
        tokio::fs::create_dir_all(&scratch_root).await?;
        let scratch = tempfile::Builder::new()
            .prefix("bsforge-")
            .tempdir_in(&scratch_root)?;
        let work = scratch.path();
        debug!(scratch = %work.display(), "Created scratch directory");

        let clips = self.render_clips(&plan.segments, work, cancel).await?;
        logger.log_progress(&format!("rendered {} clips", clips.len()));

        let concatenated = work.join("concat.mp4");
        self.stage(
            RenderStage::Concat,
            cancel,
            self.renderer.concat(&clips, &plan.transitions, &concatenated),
        )
        .await?;

        let muxed = work.join("muxed.mp4");
        self.stage(
            RenderStage::MuxAudio,
            cancel,
            self.renderer.mux_audio(&concatenated, &plan.audio_path, &muxed),
        )
        .await?;
        let mut current = muxed;

        if let Some(music) = &plan.background_music {
            let mixed = work.join("mixed.mp4");
            self.stage(
                RenderStage::MixBackgroundAudio,
                cancel,
                self.renderer
                    .mix_background_audio(&current, &music.path, music.volume, &mixed),
            )
            .await?;
            current = mixed;
        }

        let mut subtitle_file = None;
        if let Some(subtitles) = &plan.subtitles {
            let path = work.join(format!("subtitles.{}", subtitles.format.extension()));
            tokio::fs::write(&path, subtitles.content.as_bytes()).await?;

            let burned = work.join("subtitled.mp4");
            self.stage(
                RenderStage::BurnSubtitles,
                cancel,
                self.renderer.burn_subtitles(&current, &path, &burned),
            )
            .await?;
            current = burned;
            subtitle_file = Some(path);
        }

        let duration_seconds = self
            .stage(
                RenderStage::ProbeDuration,
                cancel,
                self.renderer.probe_duration(&current),
            )
            .await?;

        let file_size_bytes = tokio::fs::metadata(&current).await?.len();

        // sidecar first; moving the video is the last fallible step
        ensure_not_cancelled(cancel)?;
        let subtitle_path = match subtitle_file {
            Some(path) if self.config.publish_subtitles => {
                let extension = path.extension().map(|e| e.to_os_string()).unwrap_or_default();
                let sidecar = output_path.with_extension(extension);
                copy_atomic(&path, &sidecar)
                    .await
                    .map_err(|e| ComposeError::render(RenderStage::Publish, e.to_string()))?;
                Some(sidecar)
            }
            _ => None,
        };

        if let Err(e) = move_file(&current, output_path).await {
            if let Some(sidecar) = &subtitle_path {
                let _ = tokio::fs::remove_file(sidecar).await;
            }
            return Err(ComposeError::render(RenderStage::Publish, e.to_string()));
        }

        Ok(CompositionResult {
            video_path: output_path.to_path_buf(),
            duration_seconds,
            file_size_bytes,
            resolution: plan.output.resolution(),
            fps: plan.output.fps,
            subtitle_path,
        })
    }

    /// Render every segment, at most `max_render_parallel` at a time.
    ///
    /// After the first failure no new render is started; the failure of the
    /// lowest-indexed segment is returned.
    async fn render_clips(
        &self,
        segments: &[RenderSegment],
        work: &Path,
        cancel: &watch::Receiver<bool>,
    ) -> ComposeResult<Vec<PathBuf>> {
        let pool = Semaphore::new(self.config.max_render_parallel.max(1));
        let failed = AtomicBool::new(false);

        let renders = segments.iter().map(|segment| {
            let output = work.join(format!("clip_{:04}.mp4", segment.index));
            let pool = &pool;
            let failed = &failed;
            async move {
                let Ok(_permit) = pool.acquire().await else {
                    return Err(ComposeError::render(
                        RenderStage::RenderClip,
                        "render pool closed",
                    ));
                };
                if failed.load(Ordering::SeqCst) || *cancel.borrow() {
                    return Ok(None);
                }

                let started = Instant::now();
                let rendered = self
                    .renderer
                    .render_clip(&segment.source, &segment.filter, segment.target_duration, &output)
                    .await;
                metrics::record_stage_duration(
                    RenderStage::RenderClip,
                    started.elapsed().as_secs_f64(),
                );

                match rendered {
                    Ok(()) => {
                        metrics::record_clip_rendered();
                        debug!(
                            segment = segment.index,
                            duration = segment.target_duration,
                            filler = segment.is_filler,
                            "Rendered clip"
                        );
                        Ok(Some(output))
                    }
                    Err(e) => {
                        failed.store(true, Ordering::SeqCst);
                        Err(ComposeError::render(
                            RenderStage::RenderClip,
                            format!("segment {}: {}", segment.index, e.detail()),
                        ))
                    }
                }
            }
        });

        let results: Vec<ComposeResult<Option<PathBuf>>> = join_all(renders).await;

        let mut clips = Vec::with_capacity(results.len());
        let mut skipped = false;
        for result in results {
            match result? {
                Some(path) => clips.push(path),
                None => skipped = true,
            }
        }
        if skipped {
            ensure_not_cancelled(cancel)?;
            return Err(ComposeError::render(
                RenderStage::RenderClip,
                "clip renders stopped early",
            ));
        }
        Ok(clips)
    }

    /// Run one sequential stage after a cancellation check.
    async fn stage<T, F>(
        &self,
        stage: RenderStage,
        cancel: &watch::Receiver<bool>,
        invocation: F,
    ) -> ComposeResult<T>
    where
        F: Future<Output = RendererResult<T>>,
    {
        ensure_not_cancelled(cancel)?;
        let started = Instant::now();
        let result = invocation.await;
        metrics::record_stage_duration(stage, started.elapsed().as_secs_f64());
        debug!(stage = %stage, ok = result.is_ok(), "Stage finished");
        result.map_err(|e| ComposeError::render(stage, e.detail()))
    }
}

fn ensure_not_cancelled(cancel: &watch::Receiver<bool>) -> ComposeResult<()> {
    if *cancel.borrow() {
        Err(ComposeError::Cancelled)
    } else {
        Ok(())
    }
}

fn failure_reason(error: &ComposeError) -> &'static str {
    match error {
        ComposeError::Render { stage, .. } => stage.as_str(),
        ComposeError::Cancelled => "cancelled",
        ComposeError::TimingInconsistency(_) => "timing",
        ComposeError::InvalidPlan(_) => "invalid_plan",
        ComposeError::AssetMissing { .. } => "asset_missing",
        ComposeError::Io(_) => "io",
        ComposeError::Json(_) => "json",
        ComposeError::Model(_) => "model",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reason_uses_stage_name() {
        let err = ComposeError::render(RenderStage::BurnSubtitles, "bad font");
        assert_eq!(failure_reason(&err), "burn_subtitles");
        assert_eq!(failure_reason(&ComposeError::Cancelled), "cancelled");
    }

    #[test]
    fn test_cancellation_flag() {
        let (tx, rx) = watch::channel(false);
        assert!(ensure_not_cancelled(&rx).is_ok());
        tx.send(true).unwrap();
        assert!(matches!(ensure_not_cancelled(&rx), Err(ComposeError::Cancelled)));
    }
}
