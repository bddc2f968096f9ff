//! # retro-vision
//!
//! Turn a line of dialogue into an 8-bit game screenshot.
//!
//! ## Features
//!
//! - **Two-stage generation**: dialogue to scene description, then
//!   description to NES-style pixel art, through the Gemini REST API
//! - **Style catalog** of four themes plus `RANDOM`, resolved once per run
//! - **Typewriter subtitles** with a reveal delay, per-character timing and
//!   four layouts
//! - **Daily quota** persisted in a pluggable key-value store, reset on the
//!   first access of each new day
//! - **PNG export** of the scene, raw or with the subtitle panel painted in
//! - **HTTP server** exposing both stages with the key kept server-side
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use retro_vision::{
//!     AspectRatio, GeminiClient, GeminiConfig, ScenePipeline, StyleChoice,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GeminiClient::new(GeminiConfig::with_api_key("your-key"));
//!     let pipeline = ScenePipeline::new(client.clone(), client);
//!
//!     let scene = pipeline
//!         .run("I will wait for you", StyleChoice::Random, AspectRatio::Widescreen)
//!         .await?;
//!
//!     println!("{} -> {}", scene.style, scene.scene_description);
//!     Ok(())
//! }
//! ```
//!
//! ## Console session
//!
//! [`RetroConsole`] holds the UI state machine. It refuses a second submit
//! while one is in flight, consumes a credit only on success, and drops late
//! results after a reset.

pub mod client;
pub mod config;
pub mod console;
pub mod error;
pub mod export;
pub mod i18n;
pub mod machine;
pub mod pipeline;
pub mod prompt;
pub mod quota;
pub mod server;
pub mod style;
pub mod typewriter;
pub mod types;

pub use client::{ContentPart, GeminiClient, ImageGenerator, TextGenerator};
pub use config::{GeminiConfig, ServerConfig};
pub use console::{RetroConsole, ScreenSnapshot, SubmitOutcome};
pub use error::{Result, SceneError};
pub use export::{ComposedScene, ExportConfig, SceneExporter};
pub use i18n::{Language, UiText};
pub use machine::{ConsoleEvent, GenerationJob, GenerationMachine, SubmitDecision};
pub use pipeline::{ScenePipeline, FALLBACK_DESCRIPTION};
pub use quota::{FileStore, KeyValueStore, MemoryStore, QuotaLimiter, DAILY_MAX};
pub use style::{SceneStyle, StyleChoice};
pub use typewriter::{SubtitleConfig, SubtitleLayout, SubtitlePlayer, SubtitleTypewriter};
pub use types::{
    AspectRatio, GeneratedScene, GenerationPhase, GenerationProgress, GenerationRequest,
    GenerationStage, ImageConfig, ImageSize,
};
