//! The console session: state machine, pipeline, subtitle player and
//! exporter wired together.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::client::{ImageGenerator, TextGenerator};
use crate::export::{ComposedScene, ExportConfig, SceneExporter};
use crate::i18n::Language;
use crate::machine::{GenerationMachine, SubmitDecision};
use crate::pipeline::ScenePipeline;
use crate::quota::QuotaLimiter;
use crate::style::StyleChoice;
use crate::typewriter::{SubtitleFrame, SubtitleLayout, SubtitlePlayer};
use crate::types::{AspectRatio, GeneratedScene, GenerationPhase, GenerationStage};

/// What happened to one call to [`RetroConsole::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed(GeneratedScene),
    /// The run failed; the message is what the screen shows.
    Failed(String),
    QuotaExceeded(String),
    /// Blank input or a generation already in flight.
    Ignored,
    /// The console was reset before the run finished.
    Discarded,
}

/// Everything the screen needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenSnapshot {
    pub phase: GenerationPhase,
    pub caption: Option<&'static str>,
    pub error_message: Option<String>,
    pub scene: Option<GeneratedScene>,
    /// Present only when a scene is on screen.
    pub subtitle: Option<SubtitleFrame>,
    pub layout: SubtitleLayout,
    pub language: Language,
    pub style: StyleChoice,
    pub remaining_credits: u32,
    pub daily_max: u32,
}

pub struct RetroConsole<T, I> {
    machine: Mutex<GenerationMachine>,
    pipeline: Arc<ScenePipeline<T, I>>,
    player: Mutex<SubtitlePlayer>,
    exporter: SceneExporter,
}

impl<T, I> RetroConsole<T, I>
where
    T: TextGenerator,
    I: ImageGenerator,
{
    pub fn new(pipeline: ScenePipeline<T, I>, quota: QuotaLimiter, export: ExportConfig) -> Self {
        Self::with_player(pipeline, quota, export, SubtitlePlayer::new(SubtitleLayout::default()))
    }

    /// Use a pre-built subtitle player (custom reveal timing).
    pub fn with_player(
        pipeline: ScenePipeline<T, I>,
        quota: QuotaLimiter,
        export: ExportConfig,
        player: SubtitlePlayer,
    ) -> Self {
        let machine = GenerationMachine::new(quota);
        player.set_layout(machine.layout());
        Self {
            machine: Mutex::new(machine),
            pipeline: Arc::new(pipeline),
            player: Mutex::new(player),
            exporter: SceneExporter::new(export),
        }
    }

    fn machine(&self) -> MutexGuard<'_, GenerationMachine> {
        match self.machine.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn player(&self) -> MutexGuard<'_, SubtitlePlayer> {
        match self.player.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn pipeline(&self) -> &ScenePipeline<T, I> {
        &self.pipeline
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.machine().set_input(text);
    }

    pub fn select_style(&self, style: StyleChoice) {
        self.machine().select_style(style);
    }

    /// Run one generation from the current input.
    pub async fn submit(&self, aspect_ratio: AspectRatio) -> SubmitOutcome {
        let job = {
            let mut machine = self.machine();
            match machine.submit(aspect_ratio) {
                SubmitDecision::Started(job) => job,
                SubmitDecision::Ignored => return SubmitOutcome::Ignored,
                SubmitDecision::QuotaExceeded => {
                    return SubmitOutcome::QuotaExceeded(
                        machine.error_message().unwrap_or_default().to_string(),
                    )
                }
            }
        };
        let ticket = job.ticket;

        let result = self
            .pipeline
            .run_with_progress(&job.request, &job.cancel, |progress| {
                if progress.stage == GenerationStage::Render {
                    self.machine().description_ready(ticket);
                }
            })
            .await;

        let mut machine = self.machine();
        match result {
            Ok(scene) => {
                if !machine.complete(ticket, scene.clone()) {
                    return SubmitOutcome::Discarded;
                }
                let mut player = self.player();
                player.set_layout(machine.layout());
                player.set_user_hidden(!machine.subtitles_visible());
                player.show(scene.original_text.clone());
                SubmitOutcome::Completed(scene)
            }
            Err(e) => {
                if !machine.fail(ticket, &e) {
                    return SubmitOutcome::Discarded;
                }
                SubmitOutcome::Failed(machine.error_message().unwrap_or_default().to_string())
            }
        }
    }

    /// Back to `Idle`; any in-flight run is cancelled and its result dropped.
    pub fn reset(&self) {
        self.machine().reset();
        self.player().clear();
    }

    pub fn toggle_subtitles(&self) -> bool {
        let visible = self.machine().toggle_subtitles();
        self.player().set_user_hidden(!visible);
        visible
    }

    pub fn cycle_layout(&self) -> SubtitleLayout {
        let layout = self.machine().cycle_layout();
        self.player().set_layout(layout);
        layout
    }

    pub fn toggle_language(&self) -> Language {
        self.machine().toggle_language()
    }

    pub fn snapshot(&self) -> ScreenSnapshot {
        let machine = self.machine();
        let scene = match machine.phase() {
            GenerationPhase::Complete => machine.result().cloned(),
            _ => None,
        };
        let subtitle = scene.as_ref().map(|_| self.player().frame());
        ScreenSnapshot {
            phase: machine.phase(),
            caption: machine.caption(),
            error_message: machine.error_message().map(str::to_string),
            scene,
            subtitle,
            layout: machine.layout(),
            language: machine.language(),
            style: machine.style(),
            remaining_credits: machine.remaining_credits(),
            daily_max: machine.quota().daily_max(),
        }
    }

    /// Export exactly what is on screen: the subtitle as currently revealed
    /// in the current layout, or the raw image while it is hidden.
    ///
    /// Returns `None` when there is nothing to save or the export failed.
    pub async fn save(&self, stem: &str) -> Option<PathBuf> {
        let composed = {
            let machine = self.machine();
            let scene = match (machine.phase(), machine.result()) {
                (GenerationPhase::Complete, Some(scene)) => scene,
                _ => {
                    tracing::debug!("Nothing to save");
                    return None;
                }
            };
            let frame = self.player().frame();
            ComposedScene::from_frame(scene.image_url.clone(), &frame)
        };
        self.exporter.export(composed, stem).await
    }

    pub fn is_saving(&self) -> bool {
        self.exporter.is_busy()
    }
}
