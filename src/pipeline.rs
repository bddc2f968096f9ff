use std::sync::atomic::{AtomicBool, Ordering};

use crate::client::{ContentPart, ImageGenerator, TextGenerator};
use crate::error::{Result, SceneError};
use crate::prompt;
use crate::style::{SceneStyle, StyleChoice};
use crate::types::{
    AspectRatio, GeneratedScene, GenerationProgress, GenerationRequest, GenerationStage,
    ImageConfig,
};

/// Description used when the text collaborator answers with nothing.
pub const FALLBACK_DESCRIPTION: &str = "A generic 8-bit pixel art background.";

/// Two-stage scene generator: dialogue to description, description to pixel art.
///
/// The stages always run in sequence because the image prompt embeds the
/// description. A `RANDOM` style is resolved once per run so both stages see
/// the same theme.
#[derive(Debug, Clone)]
pub struct ScenePipeline<T, I> {
    text: T,
    image: I,
}

impl<T, I> ScenePipeline<T, I>
where
    T: TextGenerator,
    I: ImageGenerator,
{
    pub fn new(text: T, image: I) -> Self {
        Self { text, image }
    }

    pub fn text_generator(&self) -> &T {
        &self.text
    }

    pub fn image_generator(&self) -> &I {
        &self.image
    }

    /// Stage 1: expand a line of dialogue into a scene description.
    ///
    /// An empty answer is replaced with [`FALLBACK_DESCRIPTION`]; a failed
    /// call becomes [`SceneError::DescriptionGenerationFailed`].
    pub async fn describe_scene(&self, dialogue: &str, style: SceneStyle) -> Result<String> {
        let prompt = prompt::description_prompt(dialogue, style.definition());

        let response = self.text.generate_text(&prompt).await.map_err(|e| {
            tracing::error!(error = %e, %style, "Scene description failed");
            SceneError::DescriptionGenerationFailed(e.to_string())
        })?;

        match response {
            Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            _ => {
                tracing::warn!(%style, "Empty scene description, using fallback");
                Ok(FALLBACK_DESCRIPTION.to_string())
            }
        }
    }

    /// Stage 2: render a scene description as pixel art.
    ///
    /// Returns the first inline image part as a `data:` URI. A failed call or
    /// a response without image data is [`SceneError::ImageGenerationFailed`].
    pub async fn render_image(
        &self,
        description: &str,
        style: SceneStyle,
        aspect_ratio: AspectRatio,
    ) -> Result<String> {
        let prompt = prompt::image_prompt(description, style.definition());

        let parts = self
            .image
            .generate_image(&prompt, ImageConfig::new(aspect_ratio))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, %style, "Image generation failed");
                SceneError::ImageGenerationFailed(e.to_string())
            })?;

        first_image_data_uri(&parts).ok_or_else(|| {
            tracing::error!(%style, parts = parts.len(), "No image data in response");
            SceneError::ImageGenerationFailed("No image data found in response.".to_string())
        })
    }

    /// Run both stages for one line of dialogue.
    pub async fn run(
        &self,
        dialogue: &str,
        style: StyleChoice,
        aspect_ratio: AspectRatio,
    ) -> Result<GeneratedScene> {
        let request = GenerationRequest::new(dialogue, style, aspect_ratio)?;
        let never_cancelled = AtomicBool::new(false);
        self.run_with_progress(&request, &never_cancelled, |_| {})
            .await
    }

    /// Run both stages with a progress callback and a cancellation flag.
    ///
    /// The callback fires at the start of each stage. The flag is checked
    /// before each stage; once set, the run stops with
    /// [`SceneError::Cancelled`] and no further collaborator call is made.
    pub async fn run_with_progress<F>(
        &self,
        request: &GenerationRequest,
        cancel: &AtomicBool,
        mut on_progress: F,
    ) -> Result<GeneratedScene>
    where
        F: FnMut(GenerationProgress),
    {
        let style = request.style.resolve();
        tracing::info!(
            %style,
            requested = request.style.id(),
            aspect_ratio = request.aspect_ratio.as_str(),
            "Starting scene generation"
        );

        check_cancelled(cancel)?;
        on_progress(GenerationProgress {
            stage: GenerationStage::Describe,
            style,
        });
        let description = self.describe_scene(&request.dialogue_text, style).await?;

        check_cancelled(cancel)?;
        on_progress(GenerationProgress {
            stage: GenerationStage::Render,
            style,
        });
        let image_url = self
            .render_image(&description, style, request.aspect_ratio)
            .await?;

        tracing::info!(%style, "Scene generation complete");
        Ok(GeneratedScene {
            image_url,
            original_text: request.dialogue_text.clone(),
            scene_description: description,
            style,
            aspect_ratio: request.aspect_ratio,
        })
    }
}

fn check_cancelled(cancel: &AtomicBool) -> Result<()> {
    if cancel.load(Ordering::Relaxed) {
        return Err(SceneError::Cancelled);
    }
    Ok(())
}

/// First inline-data part as a displayable `data:` URI.
fn first_image_data_uri(parts: &[ContentPart]) -> Option<String> {
    parts.iter().find_map(|part| match part {
        ContentPart::InlineData { mime_type, data } if !data.is_empty() => {
            Some(format!("data:{};base64,{}", mime_type, data))
        }
        _ => None,
    })
}
