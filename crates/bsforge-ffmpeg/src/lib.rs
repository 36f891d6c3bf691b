//! FFmpeg backend for BSForge.
//!
//! Provides [`FfmpegRenderer`], the production [`bsforge_compose::Renderer`],
//! along with the command builder, ffprobe helpers and the filtergraph syntax
//! it renders plans with.

pub mod command;
pub mod error;
pub mod filter_syntax;
pub mod probe;
pub mod renderer;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegInput, FfmpegRunner};
pub use error::{FfmpegError, FfmpegResult};
pub use probe::{get_duration, probe_media, MediaInfo};
pub use renderer::{FfmpegRenderer, DEFAULT_STAGE_TIMEOUT_SECS};
