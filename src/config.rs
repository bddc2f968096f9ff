use std::time::Duration;

/// Configuration for the hosted Gemini generation service.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API base URL (default: "https://generativelanguage.googleapis.com")
    pub endpoint: String,
    /// Server-held credential. `None` means "not configured".
    pub api_key: Option<String>,
    /// Model for the dialogue to description stage.
    pub text_model: String,
    /// Model for the description to pixel-art stage.
    pub image_model: String,
    /// Request timeout (default: 120s)
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            api_key: None,
            text_model: "gemini-2.5-pro".to_string(),
            image_model: "gemini-3-pro-image-preview".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl GeminiConfig {
    /// Create a config with the given API key and default models.
    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            ..Default::default()
        }
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `true` when a non-empty API key is present.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// HTTP server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub gemini: GeminiConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                                      |
    /// |------------------------|----------------------------------------------|
    /// | `HOST`                 | `0.0.0.0`                                    |
    /// | `PORT`                 | `3000`                                       |
    /// | `CORS_ORIGINS`         | `http://localhost:3000`                      |
    /// | `GEMINI_API_KEY`       | unset (endpoints answer "not configured")    |
    /// | `GEMINI_ENDPOINT`      | `https://generativelanguage.googleapis.com`  |
    /// | `REQUEST_TIMEOUT_SECS` | `120`                                        |
    pub fn from_env() -> anyhow::Result<Self> {
        use anyhow::Context;

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("PORT must be a valid u16")?;

        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .context("REQUEST_TIMEOUT_SECS must be a valid u64")?;

        let mut gemini = GeminiConfig::default().timeout(Duration::from_secs(timeout_secs));
        gemini.api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        if let Ok(endpoint) = std::env::var("GEMINI_ENDPOINT") {
            gemini = gemini.endpoint(endpoint);
        }

        Ok(Self {
            host,
            port,
            cors_origins,
            gemini,
        })
    }
}
