use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError};
use crate::style::{SceneStyle, StyleChoice};

/// Phase of the generation state machine. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationPhase {
    Idle,
    DescribingScene,
    RenderingImage,
    Complete,
    Failed,
}

impl GenerationPhase {
    /// `true` while a pipeline call is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            GenerationPhase::DescribingScene | GenerationPhase::RenderingImage
        )
    }
}

/// Output aspect ratio requested from the image stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Widescreen,
    #[serde(rename = "4:3")]
    Standard,
}

impl AspectRatio {
    /// Viewports narrower than this get the 4:3 ratio.
    pub const MOBILE_BREAKPOINT_PX: u32 = 768;

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Widescreen => "16:9",
            AspectRatio::Standard => "4:3",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "16:9" => Some(AspectRatio::Widescreen),
            "4:3" => Some(AspectRatio::Standard),
            _ => None,
        }
    }

    /// Pick the ratio for a viewport the way the TV frame is laid out:
    /// 4:3 on narrow screens, 16:9 otherwise.
    pub fn for_viewport_width(width_px: u32) -> Self {
        if width_px < Self::MOBILE_BREAKPOINT_PX {
            AspectRatio::Standard
        } else {
            AspectRatio::Widescreen
        }
    }
}

/// Resolution tier passed to the image model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::OneK => "1K",
            ImageSize::TwoK => "2K",
        }
    }
}

/// Image configuration sent alongside the stage-2 prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: AspectRatio,
    pub image_size: ImageSize,
}

impl ImageConfig {
    pub fn new(aspect_ratio: AspectRatio) -> Self {
        Self {
            aspect_ratio,
            image_size: ImageSize::default(),
        }
    }
}

/// Validated input for one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Dialogue as the user typed it. Never blank.
    pub dialogue_text: String,
    pub style: StyleChoice,
    pub aspect_ratio: AspectRatio,
}

impl GenerationRequest {
    /// Build a request, rejecting blank or whitespace-only dialogue.
    pub fn new(
        dialogue_text: impl Into<String>,
        style: StyleChoice,
        aspect_ratio: AspectRatio,
    ) -> Result<Self> {
        let dialogue_text = dialogue_text.into();
        if dialogue_text.trim().is_empty() {
            return Err(SceneError::InvalidRequest(
                "dialogue text must not be blank".to_string(),
            ));
        }
        Ok(Self {
            dialogue_text,
            style,
            aspect_ratio,
        })
    }
}

/// Result of one successful end-to-end generation.
///
/// Immutable once built. The console replaces it wholesale on every new
/// success and drops it on reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedScene {
    /// Displayable image reference, a `data:` URI.
    pub image_url: String,
    /// The dialogue exactly as submitted.
    pub original_text: String,
    /// Stage-1 output that stage 2 rendered.
    pub scene_description: String,
    /// Concrete style used for both stages.
    pub style: SceneStyle,
    pub aspect_ratio: AspectRatio,
}

/// Which pipeline stage is about to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Describe,
    Render,
}

/// Progress notification emitted by the pipeline at the start of each stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationProgress {
    pub stage: GenerationStage,
    pub style: SceneStyle,
}
