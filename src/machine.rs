use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::SceneError;
use crate::i18n::{self, Language, UiText};
use crate::quota::QuotaLimiter;
use crate::style::StyleChoice;
use crate::typewriter::SubtitleLayout;
use crate::types::{AspectRatio, GeneratedScene, GenerationPhase, GenerationRequest};

/// Message shown when a failure carries no text of its own.
pub const FALLBACK_ERROR_MESSAGE: &str = "Game Over. Check cartridge.";

/// Work handed out by [`GenerationMachine::submit`].
///
/// The ticket identifies the run; results reported with an older ticket
/// are discarded. The cancel flag is raised when the run is superseded.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub ticket: u64,
    pub request: GenerationRequest,
    pub cancel: Arc<AtomicBool>,
}

/// Outcome of [`GenerationMachine::submit`].
#[derive(Debug, Clone)]
pub enum SubmitDecision {
    Started(GenerationJob),
    /// Blank input or a run already in flight. Nothing changed.
    Ignored,
    /// Daily limit hit; the machine is now `Failed`.
    QuotaExceeded,
}

impl SubmitDecision {
    pub fn into_job(self) -> Option<GenerationJob> {
        match self {
            SubmitDecision::Started(job) => Some(job),
            _ => None,
        }
    }
}

/// Everything that can happen to the console, for [`GenerationMachine::dispatch`].
#[derive(Debug)]
pub enum ConsoleEvent {
    InputChanged(String),
    StyleSelected(StyleChoice),
    Submit(AspectRatio),
    DescriptionReady { ticket: u64 },
    Completed { ticket: u64, scene: GeneratedScene },
    Failed { ticket: u64, error: SceneError },
    Reset,
    ToggleSubtitles,
    CycleLayout,
    ToggleLanguage,
}

/// UI state of the console and the rules for moving between phases.
///
/// Events are plain method calls that run to completion. The machine never
/// performs I/O itself apart from consulting the quota limiter.
#[derive(Debug)]
pub struct GenerationMachine {
    quota: QuotaLimiter,
    phase: GenerationPhase,
    input: String,
    style: StyleChoice,
    result: Option<GeneratedScene>,
    error_message: Option<String>,
    subtitles_visible: bool,
    layout: SubtitleLayout,
    language: Language,
    ticket: u64,
    cancel: Arc<AtomicBool>,
}

impl GenerationMachine {
    pub fn new(quota: QuotaLimiter) -> Self {
        Self {
            quota,
            phase: GenerationPhase::Idle,
            input: String::new(),
            style: StyleChoice::default(),
            result: None,
            error_message: None,
            subtitles_visible: true,
            layout: SubtitleLayout::default(),
            language: Language::default(),
            ticket: 0,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn phase(&self) -> GenerationPhase {
        self.phase
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn style(&self) -> StyleChoice {
        self.style
    }

    pub fn result(&self) -> Option<&GeneratedScene> {
        self.result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn subtitles_visible(&self) -> bool {
        self.subtitles_visible
    }

    pub fn layout(&self) -> SubtitleLayout {
        self.layout
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn quota(&self) -> &QuotaLimiter {
        &self.quota
    }

    pub fn remaining_credits(&self) -> u32 {
        self.quota.remaining()
    }

    /// Ticket of the most recent submit (0 before the first).
    pub fn current_ticket(&self) -> u64 {
        self.ticket
    }

    /// Loading caption for the current phase, if any.
    pub fn caption(&self) -> Option<&'static str> {
        match self.phase {
            GenerationPhase::DescribingScene => {
                Some(i18n::text(self.language, UiText::ReadingCartridge))
            }
            GenerationPhase::RenderingImage => {
                Some(i18n::text(self.language, UiText::RenderingGraphics))
            }
            _ => None,
        }
    }

    /// Apply one event. Only a submit that starts a run yields a job.
    pub fn dispatch(&mut self, event: ConsoleEvent) -> Option<GenerationJob> {
        match event {
            ConsoleEvent::InputChanged(text) => self.set_input(text),
            ConsoleEvent::StyleSelected(style) => self.select_style(style),
            ConsoleEvent::Submit(aspect_ratio) => return self.submit(aspect_ratio).into_job(),
            ConsoleEvent::DescriptionReady { ticket } => {
                self.description_ready(ticket);
            }
            ConsoleEvent::Completed { ticket, scene } => {
                self.complete(ticket, scene);
            }
            ConsoleEvent::Failed { ticket, error } => {
                self.fail(ticket, &error);
            }
            ConsoleEvent::Reset => self.reset(),
            ConsoleEvent::ToggleSubtitles => {
                self.toggle_subtitles();
            }
            ConsoleEvent::CycleLayout => {
                self.cycle_layout();
            }
            ConsoleEvent::ToggleLanguage => {
                self.toggle_language();
            }
        }
        None
    }

    /// Update the dialogue input. Locked while a generation is in flight.
    pub fn set_input(&mut self, text: impl Into<String>) {
        if self.phase.is_loading() {
            return;
        }
        self.input = text.into();
    }

    pub fn select_style(&mut self, style: StyleChoice) {
        self.style = style;
    }

    /// Start a generation from the current input.
    ///
    /// Ignored while loading or when the input is blank. With the quota used
    /// up the machine goes straight to `Failed` and no job is handed out.
    pub fn submit(&mut self, aspect_ratio: AspectRatio) -> SubmitDecision {
        if self.phase.is_loading() {
            tracing::debug!(phase = ?self.phase, "Submit ignored while loading");
            return SubmitDecision::Ignored;
        }
        let request = match GenerationRequest::new(self.input.clone(), self.style, aspect_ratio) {
            Ok(request) => request,
            Err(_) => {
                tracing::debug!("Submit ignored for blank input");
                return SubmitDecision::Ignored;
            }
        };

        if self.quota.is_limit_reached() {
            tracing::info!(daily_max = self.quota.daily_max(), "Daily quota exhausted");
            self.transition(GenerationPhase::Failed);
            self.error_message = Some(i18n::daily_limit_message(
                self.language,
                self.quota.daily_max(),
            ));
            return SubmitDecision::QuotaExceeded;
        }

        self.supersede();
        self.error_message = None;
        self.transition(GenerationPhase::DescribingScene);

        SubmitDecision::Started(GenerationJob {
            ticket: self.ticket,
            request,
            cancel: Arc::clone(&self.cancel),
        })
    }

    /// Stage 1 finished for `ticket`. Returns `false` if the event was stale.
    pub fn description_ready(&mut self, ticket: u64) -> bool {
        if !self.accepts(ticket) || self.phase != GenerationPhase::DescribingScene {
            return false;
        }
        self.transition(GenerationPhase::RenderingImage);
        true
    }

    /// Both stages succeeded for `ticket`. Consumes one credit.
    pub fn complete(&mut self, ticket: u64, scene: GeneratedScene) -> bool {
        if !self.accepts(ticket) {
            tracing::debug!(ticket, current = self.ticket, "Discarding stale result");
            return false;
        }
        let remaining = self.quota.increment();
        tracing::info!(style = %scene.style, remaining, "Scene ready");
        self.result = Some(scene);
        self.subtitles_visible = true;
        self.transition(GenerationPhase::Complete);
        true
    }

    /// The run for `ticket` failed. Cancellations are not failures and are ignored.
    pub fn fail(&mut self, ticket: u64, error: &SceneError) -> bool {
        if !self.accepts(ticket) || matches!(error, SceneError::Cancelled) {
            return false;
        }
        let message = error.to_string();
        self.error_message = Some(if message.trim().is_empty() {
            FALLBACK_ERROR_MESSAGE.to_string()
        } else {
            message
        });
        self.transition(GenerationPhase::Failed);
        true
    }

    /// Return to `Idle`, dropping the result, error and input, and abandoning
    /// any run still in flight.
    pub fn reset(&mut self) {
        self.supersede();
        self.result = None;
        self.error_message = None;
        self.input.clear();
        self.transition(GenerationPhase::Idle);
    }

    pub fn toggle_subtitles(&mut self) -> bool {
        self.subtitles_visible = !self.subtitles_visible;
        self.subtitles_visible
    }

    pub fn cycle_layout(&mut self) -> SubtitleLayout {
        self.layout = self.layout.next();
        self.layout
    }

    pub fn toggle_language(&mut self) -> Language {
        self.language = self.language.toggle();
        self.language
    }

    fn accepts(&self, ticket: u64) -> bool {
        ticket == self.ticket && self.phase.is_loading()
    }

    /// Cancel the current run and issue a new ticket.
    fn supersede(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        self.cancel = Arc::new(AtomicBool::new(false));
        self.ticket += 1;
    }

    fn transition(&mut self, to: GenerationPhase) {
        if self.phase != to {
            tracing::debug!(from = ?self.phase, to = ?to, ticket = self.ticket, "Phase change");
        }
        self.phase = to;
    }
}
