//! Structured composition logging.
//!
//! Provides consistent, structured logging for composition invocations with
//! tracing spans and contextual information.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Logger carrying the identity of one composition invocation.
#[derive(Debug, Clone)]
pub struct CompositionLogger {
    composition_id: String,
    mode: String,
}

impl CompositionLogger {
    /// Create a logger for a composition.
    ///
    /// # Arguments
    /// * `composition_id` - Identifier of the plan being executed
    /// * `mode` - Sequencing mode (e.g., "scene", "linear")
    pub fn new(composition_id: &str, mode: &str) -> Self {
        Self {
            composition_id: composition_id.to_string(),
            mode: mode.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            composition_id = %self.composition_id,
            mode = %self.mode,
            "Composition started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            composition_id = %self.composition_id,
            mode = %self.mode,
            "Composition progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            composition_id = %self.composition_id,
            mode = %self.mode,
            "Composition warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            composition_id = %self.composition_id,
            mode = %self.mode,
            "Composition error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            composition_id = %self.composition_id,
            mode = %self.mode,
            "Composition completed: {}", message
        );
    }

    pub fn composition_id(&self) -> &str {
        &self.composition_id
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Span that composition futures are instrumented with.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "composition",
            composition_id = %self.composition_id,
            mode = %self.mode
        )
    }
}

/// Install a global tracing subscriber.
///
/// Output is JSON when `LOG_FORMAT=json`, human-readable otherwise. Filtering
/// follows `RUST_LOG` with `bsforge=info` added. Returns `false` when a
/// subscriber was already installed.
pub fn init_tracing() -> bool {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = "bsforge=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .with(env_filter)
            .try_init()
            .is_ok()
    }
}
