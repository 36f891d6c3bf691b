//! Visual assets sourced for scenes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::color::Rgb;

/// Kind of visual asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VisualAssetKind {
    StockVideo,
    StockImage,
    AiImage,
    SolidColor,
    Gradient,
}

impl VisualAssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisualAssetKind::StockVideo => "stock_video",
            VisualAssetKind::StockImage => "stock_image",
            VisualAssetKind::AiImage => "ai_image",
            VisualAssetKind::SolidColor => "solid_color",
            VisualAssetKind::Gradient => "gradient",
        }
    }

    /// Whether assets of this kind are generated rather than loaded from a file.
    pub fn is_generated(&self) -> bool {
        matches!(self, VisualAssetKind::SolidColor | VisualAssetKind::Gradient)
    }
}

/// A visual asset, possibly not yet downloaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VisualAsset {
    pub kind: VisualAssetKind,
    /// Local file, once downloaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Native play length for videos
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Fill color for generated assets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
}

impl VisualAsset {
    pub fn video(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            kind: VisualAssetKind::StockVideo,
            path: Some(path.into()),
            duration: Some(duration),
            width: None,
            height: None,
            color: None,
        }
    }

    pub fn image(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: VisualAssetKind::StockImage,
            path: Some(path.into()),
            duration: None,
            width: None,
            height: None,
            color: None,
        }
    }

    pub fn solid(color: Rgb) -> Self {
        Self {
            kind: VisualAssetKind::SolidColor,
            path: None,
            duration: None,
            width: None,
            height: None,
            color: Some(color),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn is_video(&self) -> bool {
        self.kind == VisualAssetKind::StockVideo
    }

    /// Whether the asset can be rendered: generated, or downloaded to an existing file.
    pub fn is_available(&self) -> bool {
        if self.kind.is_generated() {
            return true;
        }
        self.path.as_ref().map(|p| p.is_file()).unwrap_or(false)
    }
}

/// Visual sourcing output for one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneVisualResult {
    pub scene_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<VisualAsset>,
    pub duration: f64,
    #[serde(default)]
    pub start_offset: f64,
}

impl SceneVisualResult {
    pub fn new(scene_index: usize, asset: Option<VisualAsset>, duration: f64) -> Self {
        Self {
            scene_index,
            asset,
            duration,
            start_offset: 0.0,
        }
    }
}
