use reqwest::Client;
use serde_json::{json, Value};
use std::future::Future;

use crate::config::GeminiConfig;
use crate::error::{Result, SceneError};
use crate::types::ImageConfig;

/// One content part returned by the image collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    /// Base64-encoded binary payload with its MIME type.
    InlineData { mime_type: String, data: String },
}

/// Text-to-text collaborator used by the description stage.
///
/// `Ok(None)` (or empty text) is a degenerate but acceptable answer; the
/// pipeline substitutes a fallback description.
pub trait TextGenerator: Send + Sync {
    fn generate_text(&self, prompt: &str) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// Text-to-image collaborator used by the render stage.
pub trait ImageGenerator: Send + Sync {
    fn generate_image(
        &self,
        prompt: &str,
        config: ImageConfig,
    ) -> impl Future<Output = Result<Vec<ContentPart>>> + Send;
}

/// Async client for the Gemini `generateContent` REST API.
///
/// Implements both collaborator traits: the text model for scene
/// descriptions and the image model for pixel art.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    async fn generate_content(&self, model: &str, body: &Value) -> Result<Value> {
        let api_key = match self.config.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => key,
            _ => return Err(SceneError::NotConfigured),
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            model
        );
        tracing::debug!(%model, "Calling generateContent");

        let resp = self
            .http
            .post(&url)
            .timeout(self.config.timeout)
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| SceneError::Network {
                context: format!("Failed to reach generation service at {}", self.config.endpoint),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(SceneError::Http {
                status,
                body: error_message(&text),
            });
        }

        resp.json().await.map_err(|e| SceneError::Network {
            context: "Failed to parse generateContent response".into(),
            source: e,
        })
    }
}

impl TextGenerator for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> Result<Option<String>> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });
        let response = self.generate_content(&self.config.text_model, &body).await?;
        Ok(extract_text(&response))
    }
}

impl ImageGenerator for GeminiClient {
    async fn generate_image(&self, prompt: &str, config: ImageConfig) -> Result<Vec<ContentPart>> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
                "imageConfig": config,
            },
        });
        let response = self.generate_content(&self.config.image_model, &body).await?;
        Ok(extract_parts(&response))
    }
}

/// Parts of the first candidate, in order. Unknown part kinds are skipped.
fn extract_parts(response: &Value) -> Vec<ContentPart> {
    let parts = match response
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
    {
        Some(parts) => parts,
        None => return Vec::new(),
    };

    parts
        .iter()
        .filter_map(|part| {
            if let Some(inline) = part.get("inlineData").or_else(|| part.get("inline_data")) {
                let data = inline.get("data").and_then(|d| d.as_str())?;
                let mime_type = inline
                    .get("mimeType")
                    .or_else(|| inline.get("mime_type"))
                    .and_then(|m| m.as_str())
                    .unwrap_or("image/png");
                return Some(ContentPart::InlineData {
                    mime_type: mime_type.to_string(),
                    data: data.to_string(),
                });
            }
            part.get("text")
                .and_then(|t| t.as_str())
                .map(|t| ContentPart::Text(t.to_string()))
        })
        .collect()
}

/// Concatenated text of the first candidate, or `None` when there is none.
fn extract_text(response: &Value) -> Option<String> {
    let text: String = extract_parts(response)
        .into_iter()
        .filter_map(|part| match part {
            ContentPart::Text(t) => Some(t),
            ContentPart::InlineData { .. } => None,
        })
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Pull `error.message` out of a Gemini error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_joins_parts() {
        let response = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "A lone figure " }, { "text": "on a rooftop." }] }
            }]
        });
        assert_eq!(
            extract_text(&response),
            Some("A lone figure on a rooftop.".to_string())
        );
    }

    #[test]
    fn test_extract_text_missing_is_none() {
        assert_eq!(extract_text(&json!({ "candidates": [] })), None);
        let blank = json!({ "candidates": [{ "content": { "parts": [{ "text": "  " }] } }] });
        assert_eq!(extract_text(&blank), None);
    }

    #[test]
    fn test_extract_parts_with_inline_data() {
        let response = json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "Here you go" },
                    { "inlineData": { "mimeType": "image/png", "data": "iVBORw0KGgo=" } }
                ]}
            }]
        });
        let parts = extract_parts(&response);
        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[1],
            ContentPart::InlineData {
                mime_type: "image/png".to_string(),
                data: "iVBORw0KGgo=".to_string(),
            }
        );
    }

    #[test]
    fn test_extract_parts_snake_case_inline_data() {
        let response = json!({
            "candidates": [{
                "content": { "parts": [{ "inline_data": { "mime_type": "image/jpeg", "data": "abc" } }] }
            }]
        });
        assert_eq!(
            extract_parts(&response),
            vec![ContentPart::InlineData {
                mime_type: "image/jpeg".to_string(),
                data: "abc".to_string(),
            }]
        );
    }

    #[test]
    fn test_error_message_from_body() {
        let body = r#"{"error": {"code": 429, "message": "Quota exhausted"}}"#;
        assert_eq!(error_message(body), "Quota exhausted");
        assert_eq!(error_message("plain failure"), "plain failure");
    }

    #[tokio::test]
    async fn test_unconfigured_client_fails_before_network() {
        let client = GeminiClient::new(GeminiConfig::default());
        let result = client.generate_text("hello").await;
        assert!(matches!(result, Err(SceneError::NotConfigured)));
    }
}
