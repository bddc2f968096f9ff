//! HTTP front for the two generation stages.
//!
//! `POST /generate-description` and `POST /generate-image` each run
//! one stage with the server's credential, so browsers never see the key.

use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::client::{GeminiClient, ImageGenerator, TextGenerator};
use crate::config::ServerConfig;
use crate::error::SceneError;
use crate::pipeline::ScenePipeline;
use crate::style::SceneStyle;
use crate::types::AspectRatio;

impl IntoResponse for SceneError {
    fn into_response(self) -> Response {
        let status = match &self {
            SceneError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Shared handler state. Cheap to clone.
pub struct AppState<T, I> {
    pipeline: Arc<ScenePipeline<T, I>>,
    configured: bool,
}

impl<T, I> Clone for AppState<T, I> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            configured: self.configured,
        }
    }
}

impl<T, I> AppState<T, I> {
    /// `configured = false` makes every endpoint answer "API key not configured".
    pub fn new(pipeline: ScenePipeline<T, I>, configured: bool) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            configured,
        }
    }

    fn require_configured(&self) -> Result<(), SceneError> {
        if self.configured {
            Ok(())
        } else {
            Err(SceneError::NotConfigured)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionRequest {
    pub user_text: String,
    #[serde(default)]
    pub style: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DescriptionResponse {
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    pub scene_description: String,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub image_url: String,
}

/// Concrete theme for a style id. Unknown or missing ids (including
/// `RANDOM`, which clients resolve themselves) fall back to the school theme.
fn style_or_default(style: Option<&str>) -> SceneStyle {
    style.and_then(SceneStyle::parse).unwrap_or_default()
}

async fn generate_description<T, I>(
    State(state): State<AppState<T, I>>,
    Json(req): Json<DescriptionRequest>,
) -> Result<Json<DescriptionResponse>, SceneError>
where
    T: TextGenerator + 'static,
    I: ImageGenerator + 'static,
{
    state.require_configured()?;
    if req.user_text.trim().is_empty() {
        return Err(SceneError::InvalidRequest("userText must not be blank".into()));
    }
    let style = style_or_default(req.style.as_deref());
    let description = state.pipeline.describe_scene(&req.user_text, style).await?;
    Ok(Json(DescriptionResponse { description }))
}

async fn generate_image<T, I>(
    State(state): State<AppState<T, I>>,
    Json(req): Json<ImageRequest>,
) -> Result<Json<ImageResponse>, SceneError>
where
    T: TextGenerator + 'static,
    I: ImageGenerator + 'static,
{
    state.require_configured()?;
    let aspect_ratio = match req.aspect_ratio.as_deref() {
        None => AspectRatio::default(),
        Some(raw) => AspectRatio::parse(raw).ok_or_else(|| {
            SceneError::InvalidRequest(format!("unsupported aspectRatio '{}'", raw))
        })?,
    };
    let style = style_or_default(req.style.as_deref());
    let image_url = state
        .pipeline
        .render_image(&req.scene_description, style, aspect_ratio)
        .await?;
    Ok(Json(ImageResponse { image_url }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// Routes without middleware.
pub fn router<T, I>(state: AppState<T, I>) -> Router
where
    T: TextGenerator + 'static,
    I: ImageGenerator + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/generate-description", post(generate_description::<T, I>))
        .route("/generate-image", post(generate_image::<T, I>))
        .with_state(state)
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %o, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Full application: routes plus tracing and CORS layers.
pub fn app<T, I>(state: AppState<T, I>, cors_origins: &[String]) -> Router
where
    T: TextGenerator + 'static,
    I: ImageGenerator + 'static,
{
    router(state)
        .layer(build_cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    use anyhow::Context;

    let configured = config.gemini.is_configured();
    if !configured {
        tracing::warn!("GEMINI_API_KEY is not set; generation endpoints will return 500");
    }
    let client = GeminiClient::new(config.gemini.clone());
    let state = AppState::new(ScenePipeline::new(client.clone(), client), configured);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", config.host, config.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app(state, &config.cors_origins))
        .await
        .context("server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ContentPart;
    use crate::types::ImageConfig;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct FakeText {
        prompts: Mutex<Vec<String>>,
    }

    impl TextGenerator for FakeText {
        async fn generate_text(&self, prompt: &str) -> crate::error::Result<Option<String>> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(Some("A rainy rooftop at dusk.".into()))
        }
    }

    #[derive(Default)]
    struct FakeImage {
        configs: Mutex<Vec<ImageConfig>>,
    }

    impl ImageGenerator for FakeImage {
        async fn generate_image(
            &self,
            _prompt: &str,
            config: ImageConfig,
        ) -> crate::error::Result<Vec<ContentPart>> {
            self.configs.lock().unwrap().push(config);
            Ok(vec![ContentPart::InlineData {
                mime_type: "image/png".into(),
                data: "AAAA".into(),
            }])
        }
    }

    fn test_app(configured: bool) -> Router {
        let pipeline = ScenePipeline::new(FakeText::default(), FakeImage::default());
        router(AppState::new(pipeline, configured))
    }

    async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_generate_description_ok() {
        let (status, json) = post_json(
            test_app(true),
            "/generate-description",
            json!({ "userText": "I will wait for you", "style": "MEDIEVAL_FANTASY" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["description"], "A rainy rooftop at dusk.");
    }

    #[tokio::test]
    async fn test_generate_image_ok() {
        let (status, json) = post_json(
            test_app(true),
            "/generate-image",
            json!({ "sceneDescription": "A castle", "style": "CASSETTE_FUTURISM", "aspectRatio": "4:3" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["imageUrl"], "data:image/png;base64,AAAA");
    }

    #[tokio::test]
    async fn test_missing_key_returns_500() {
        let (status, json) = post_json(
            test_app(false),
            "/generate-description",
            json!({ "userText": "hello" }),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "API key not configured");
    }

    #[tokio::test]
    async fn test_bad_aspect_ratio_is_400() {
        let (status, json) = post_json(
            test_app(true),
            "/generate-image",
            json!({ "sceneDescription": "A castle", "aspectRatio": "21:9" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("21:9"));
    }

    #[test]
    fn test_style_or_default() {
        assert_eq!(style_or_default(Some("MILLENNIUM_CITY")), SceneStyle::MillenniumCity);
        assert_eq!(style_or_default(Some("RANDOM")), SceneStyle::JapaneseSchool);
        assert_eq!(style_or_default(None), SceneStyle::JapaneseSchool);
    }
}
