//! Composition metrics.
//!
//! Only records through the `metrics` facade; installing an exporter is up to
//! the host process.

use metrics::{counter, histogram};

use crate::error::RenderStage;

/// Metric names as constants for consistency.
pub mod names {
    pub const CLIPS_RENDERED_TOTAL: &str = "bsforge_clips_rendered_total";
    pub const FILLER_SUBSTITUTIONS_TOTAL: &str = "bsforge_filler_substitutions_total";
    pub const COMPOSITIONS_COMPLETED_TOTAL: &str = "bsforge_compositions_completed_total";
    pub const COMPOSITIONS_FAILED_TOTAL: &str = "bsforge_compositions_failed_total";
    pub const STAGE_DURATION_SECONDS: &str = "bsforge_stage_duration_seconds";
}

pub fn record_clip_rendered() {
    counter!(names::CLIPS_RENDERED_TOTAL).increment(1);
}

pub fn record_filler_substitution(mode: &'static str) {
    counter!(names::FILLER_SUBSTITUTIONS_TOTAL, "mode" => mode).increment(1);
}

pub fn record_composition_completed() {
    counter!(names::COMPOSITIONS_COMPLETED_TOTAL).increment(1);
}

pub fn record_composition_failed(reason: &'static str) {
    counter!(names::COMPOSITIONS_FAILED_TOTAL, "reason" => reason).increment(1);
}

pub fn record_stage_duration(stage: RenderStage, seconds: f64) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage.as_str()).record(seconds);
}
