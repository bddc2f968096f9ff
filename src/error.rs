use thiserror::Error;

/// Errors produced while generating, displaying or exporting a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    /// The daily generation quota is used up. Raised before any network call.
    #[error("Daily generation limit reached")]
    QuotaExceeded,

    /// Stage 1 (dialogue to scene description) failed.
    #[error("{0}")]
    DescriptionGenerationFailed(String),

    /// Stage 2 (scene description to pixel art) failed or returned no image.
    #[error("{0}")]
    ImageGenerationFailed(String),

    /// Rendering or writing the exported screenshot failed.
    #[error("Export failed: {0}")]
    ExportFailed(String),

    /// No credential for the generation service was configured.
    #[error("API key not configured")]
    NotConfigured,

    /// The caller supplied an unusable request (blank text, unknown style, ...).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The generation service returned a non-success HTTP status.
    #[error("Generation service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The generation was abandoned because the console was reset.
    #[error("Generation was cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for SceneError {
    fn from(err: anyhow::Error) -> Self {
        SceneError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SceneError>;
