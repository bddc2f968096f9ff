//! Typewriter subtitle overlay.
//!
//! [`SubtitleTypewriter`] is the timing model: it only moves when told how
//! much time has passed, so it can be driven by real timers or by tests.
//! [`SubtitlePlayer`] drives it from tokio timers scoped to the displayed text.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::i18n::{self, Language, UiText};

/// Delay between a scene appearing and its subtitle panel appearing.
pub const DEFAULT_REVEAL_DELAY: Duration = Duration::from_millis(2000);

/// Time per revealed character.
pub const DEFAULT_REVEAL_INTERVAL: Duration = Duration::from_millis(80);

/// Presentation variant of the subtitle overlay. Does not affect timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubtitleLayout {
    /// Bottom dialog box with the white-bordered black panel.
    #[default]
    Horizontal,
    /// Bottom text only, outlined for legibility.
    #[serde(rename = "HORIZONTAL_NO_BG")]
    HorizontalNoPanel,
    /// Vertical column on the left with a panel.
    VerticalLeft,
    #[serde(rename = "VERTICAL_LEFT_NO_BG")]
    VerticalLeftNoPanel,
}

impl SubtitleLayout {
    /// Next layout in the fixed rotation, wrapping around.
    pub fn next(self) -> Self {
        match self {
            SubtitleLayout::Horizontal => SubtitleLayout::HorizontalNoPanel,
            SubtitleLayout::HorizontalNoPanel => SubtitleLayout::VerticalLeft,
            SubtitleLayout::VerticalLeft => SubtitleLayout::VerticalLeftNoPanel,
            SubtitleLayout::VerticalLeftNoPanel => SubtitleLayout::Horizontal,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(
            self,
            SubtitleLayout::VerticalLeft | SubtitleLayout::VerticalLeftNoPanel
        )
    }

    pub fn has_panel(self) -> bool {
        matches!(self, SubtitleLayout::Horizontal | SubtitleLayout::VerticalLeft)
    }

    pub fn label(self, language: Language) -> &'static str {
        let key = match self {
            SubtitleLayout::Horizontal => UiText::HorizontalText,
            SubtitleLayout::HorizontalNoPanel => UiText::HorizontalNoBg,
            SubtitleLayout::VerticalLeft => UiText::VerticalText,
            SubtitleLayout::VerticalLeftNoPanel => UiText::VerticalNoBg,
        };
        i18n::text(language, key)
    }
}

/// Where the reveal sequence is for the current text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealPhase {
    /// Waiting out the initial delay.
    Hidden,
    Revealing,
    FullyRevealed,
}

/// Settings for one displayed subtitle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleConfig {
    pub text: String,
    pub layout: SubtitleLayout,
    pub reveal_delay: Duration,
    pub reveal_interval: Duration,
}

impl SubtitleConfig {
    pub fn new(text: impl Into<String>, layout: SubtitleLayout) -> Self {
        Self {
            text: text.into(),
            layout,
            reveal_delay: DEFAULT_REVEAL_DELAY,
            reveal_interval: DEFAULT_REVEAL_INTERVAL,
        }
    }

    pub fn with_reveal_delay(mut self, delay: Duration) -> Self {
        self.reveal_delay = delay;
        self
    }

    pub fn with_reveal_interval(mut self, interval: Duration) -> Self {
        self.reveal_interval = interval;
        self
    }
}

/// Number of characters shown `elapsed` after the text was set.
///
/// Zero until `delay` has passed, then one more character per `interval`,
/// capped at `text_len`. A zero interval reveals everything at once.
pub fn revealed_length(
    elapsed: Duration,
    delay: Duration,
    interval: Duration,
    text_len: usize,
) -> usize {
    let Some(since_visible) = elapsed.checked_sub(delay) else {
        return 0;
    };
    if interval.is_zero() {
        return text_len;
    }
    let steps = since_visible.as_nanos() / interval.as_nanos();
    usize::try_from(steps).unwrap_or(usize::MAX).min(text_len)
}

/// Timing model of the typewriter overlay.
#[derive(Debug, Clone)]
pub struct SubtitleTypewriter {
    config: SubtitleConfig,
    char_count: usize,
    elapsed: Duration,
    user_hidden: bool,
}

impl SubtitleTypewriter {
    pub fn new(config: SubtitleConfig) -> Self {
        let char_count = config.text.chars().count();
        Self {
            config,
            char_count,
            elapsed: Duration::ZERO,
            user_hidden: false,
        }
    }

    pub fn config(&self) -> &SubtitleConfig {
        &self.config
    }

    pub fn text(&self) -> &str {
        &self.config.text
    }

    pub fn layout(&self) -> SubtitleLayout {
        self.config.layout
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Replace the text and restart the whole sequence from `Hidden`.
    /// Setting the same text again is a no-op.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text == self.config.text {
            return;
        }
        self.char_count = text.chars().count();
        self.config.text = text;
        self.elapsed = Duration::ZERO;
    }

    /// Restart the reveal for the current text.
    pub fn restart(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    pub fn advance(&mut self, delta: Duration) {
        self.elapsed = self.elapsed.saturating_add(delta);
    }

    /// Jump to an absolute time since the text was set.
    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    pub fn displayed_len(&self) -> usize {
        revealed_length(
            self.elapsed,
            self.config.reveal_delay,
            self.config.reveal_interval,
            self.char_count,
        )
    }

    /// The revealed prefix, cut on character boundaries.
    pub fn displayed_text(&self) -> &str {
        let len = self.displayed_len();
        match self.config.text.char_indices().nth(len) {
            Some((byte_idx, _)) => &self.config.text[..byte_idx],
            None => &self.config.text,
        }
    }

    pub fn phase(&self) -> RevealPhase {
        if self.elapsed < self.config.reveal_delay {
            RevealPhase::Hidden
        } else if self.displayed_len() < self.char_count {
            RevealPhase::Revealing
        } else {
            RevealPhase::FullyRevealed
        }
    }

    /// Whether the overlay is on screen: past the delay and not hidden by the user.
    pub fn is_visible(&self) -> bool {
        !self.user_hidden && self.phase() != RevealPhase::Hidden
    }

    /// Hide or show the overlay without touching the reveal timers.
    pub fn set_user_hidden(&mut self, hidden: bool) {
        self.user_hidden = hidden;
    }

    pub fn is_user_hidden(&self) -> bool {
        self.user_hidden
    }

    pub fn toggle_hidden(&mut self) {
        self.user_hidden = !self.user_hidden;
    }

    pub fn set_layout(&mut self, layout: SubtitleLayout) {
        self.config.layout = layout;
    }

    pub fn cycle_layout(&mut self) -> SubtitleLayout {
        self.config.layout = self.config.layout.next();
        self.config.layout
    }

    /// Time from now until the next visible change, or `None` once fully
    /// revealed or when the schedule overflows `Duration`.
    fn next_change_in(&self) -> Option<Duration> {
        let delay = self.config.reveal_delay;
        if self.elapsed < delay {
            return Some(delay - self.elapsed);
        }
        if self.displayed_len() >= self.char_count || self.config.reveal_interval.is_zero() {
            return None;
        }
        let step = u32::try_from(self.displayed_len()).ok()?.checked_add(1)?;
        let next_at = self.config.reveal_interval.checked_mul(step)?.checked_add(delay)?;
        Some(next_at.saturating_sub(self.elapsed))
    }

    pub fn frame(&self) -> SubtitleFrame {
        SubtitleFrame {
            text: self.displayed_text().to_string(),
            visible: self.is_visible(),
            phase: self.phase(),
            layout: self.config.layout,
        }
    }
}

/// What the overlay currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleFrame {
    pub text: String,
    pub visible: bool,
    pub phase: RevealPhase,
    pub layout: SubtitleLayout,
}

/// Drives a [`SubtitleTypewriter`] from tokio timers.
///
/// Each call to [`SubtitlePlayer::show`] aborts the previous timer task
/// before starting a new one, so a stale timer can never touch a newer text.
/// Dropping the player aborts its task.
#[derive(Debug)]
pub struct SubtitlePlayer {
    state: Arc<Mutex<SubtitleTypewriter>>,
    task: Option<JoinHandle<()>>,
    reveal_delay: Duration,
    reveal_interval: Duration,
}

impl SubtitlePlayer {
    pub fn new(layout: SubtitleLayout) -> Self {
        Self::with_timing(layout, DEFAULT_REVEAL_DELAY, DEFAULT_REVEAL_INTERVAL)
    }

    pub fn with_timing(layout: SubtitleLayout, delay: Duration, interval: Duration) -> Self {
        let config = SubtitleConfig::new("", layout)
            .with_reveal_delay(delay)
            .with_reveal_interval(interval);
        Self {
            state: Arc::new(Mutex::new(SubtitleTypewriter::new(config))),
            task: None,
            reveal_delay: delay,
            reveal_interval: interval,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SubtitleTypewriter> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Start revealing `text` from scratch. Must be called inside a tokio runtime.
    pub fn show(&mut self, text: impl Into<String>) {
        self.cancel();
        let text = text.into();
        {
            let mut state = self.lock();
            let layout = state.layout();
            let hidden = state.is_user_hidden();
            let config = SubtitleConfig::new(text, layout)
                .with_reveal_delay(self.reveal_delay)
                .with_reveal_interval(self.reveal_interval);
            *state = SubtitleTypewriter::new(config);
            state.set_user_hidden(hidden);
        }
        tracing::debug!("Subtitle reveal started");
        self.task = Some(tokio::spawn(run_reveal(Arc::clone(&self.state))));
    }

    /// Stop the timers and blank the overlay.
    pub fn clear(&mut self) {
        self.cancel();
        let mut state = self.lock();
        state.set_text("");
        state.restart();
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// `true` while a timer task is still scheduled.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn set_user_hidden(&self, hidden: bool) {
        self.lock().set_user_hidden(hidden);
    }

    pub fn set_layout(&self, layout: SubtitleLayout) {
        self.lock().set_layout(layout);
    }

    pub fn frame(&self) -> SubtitleFrame {
        self.lock().frame()
    }
}

impl Drop for SubtitlePlayer {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_reveal(state: Arc<Mutex<SubtitleTypewriter>>) {
    let start = Instant::now();
    loop {
        let wait = {
            let Ok(mut typewriter) = state.lock() else {
                return;
            };
            typewriter.set_elapsed(start.elapsed());
            match typewriter.next_change_in() {
                Some(wait) => wait,
                None => return,
            }
        };
        tokio::time::sleep(wait).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(2000);
    const RATE: Duration = Duration::from_millis(80);

    fn typewriter(text: &str) -> SubtitleTypewriter {
        SubtitleTypewriter::new(
            SubtitleConfig::new(text, SubtitleLayout::Horizontal)
                .with_reveal_delay(DELAY)
                .with_reveal_interval(RATE),
        )
    }

    #[test]
    fn test_revealed_length_pure() {
        assert_eq!(revealed_length(Duration::ZERO, DELAY, RATE, 5), 0);
        assert_eq!(revealed_length(DELAY - Duration::from_millis(1), DELAY, RATE, 5), 0);
        assert_eq!(revealed_length(DELAY, DELAY, RATE, 5), 0);
        assert_eq!(revealed_length(DELAY + RATE * 3, DELAY, RATE, 5), 3);
        assert_eq!(revealed_length(DELAY + RATE * 50, DELAY, RATE, 5), 5);
        assert_eq!(revealed_length(DELAY, DELAY, Duration::ZERO, 5), 5);
    }

    #[test]
    fn test_initial_state_hidden_and_empty() {
        let tw = typewriter("I will wait for you");
        assert_eq!(tw.displayed_len(), 0);
        assert!(!tw.is_visible());
        assert_eq!(tw.phase(), RevealPhase::Hidden);
    }

    #[test]
    fn test_visible_after_delay_with_nothing_revealed() {
        let mut tw = typewriter("hello");
        tw.advance(DELAY);
        assert!(tw.is_visible());
        assert_eq!(tw.displayed_len(), 0);
        assert_eq!(tw.phase(), RevealPhase::Revealing);
    }

    #[test]
    fn test_reveals_one_char_per_interval() {
        let mut tw = typewriter("hello");
        tw.advance(DELAY);
        for n in 1..=7 {
            tw.advance(RATE);
            assert_eq!(tw.displayed_len(), n.min(5));
        }
        assert_eq!(tw.displayed_text(), "hello");
        assert_eq!(tw.phase(), RevealPhase::FullyRevealed);
    }

    #[test]
    fn test_multibyte_text_cut_on_char_boundary() {
        let mut tw = typewriter("我会等你");
        tw.advance(DELAY + RATE * 2);
        assert_eq!(tw.displayed_text(), "我会");
    }

    #[test]
    fn test_text_change_restarts_sequence() {
        let mut tw = typewriter("first");
        tw.advance(DELAY + RATE * 10);
        assert_eq!(tw.phase(), RevealPhase::FullyRevealed);

        tw.set_text("second line");
        assert_eq!(tw.displayed_len(), 0);
        assert!(!tw.is_visible());
        tw.advance(DELAY);
        assert!(tw.is_visible());
        assert_eq!(tw.displayed_len(), 0);
    }

    #[test]
    fn test_user_hide_is_independent_of_timers() {
        let mut tw = typewriter("hello");
        tw.toggle_hidden();
        tw.advance(DELAY + RATE * 2);
        assert!(!tw.is_visible());
        assert_eq!(tw.displayed_len(), 2);

        tw.toggle_hidden();
        assert!(tw.is_visible());
        assert_eq!(tw.displayed_text(), "he");
    }

    #[test]
    fn test_empty_text_is_immediately_complete_after_delay() {
        let mut tw = typewriter("");
        tw.advance(DELAY);
        assert_eq!(tw.phase(), RevealPhase::FullyRevealed);
        assert_eq!(tw.next_change_in(), None);
    }

    #[test]
    fn test_layout_rotation_wraps() {
        let mut layout = SubtitleLayout::Horizontal;
        let mut seen = vec![layout];
        for _ in 0..4 {
            layout = layout.next();
            seen.push(layout);
        }
        assert_eq!(
            seen,
            vec![
                SubtitleLayout::Horizontal,
                SubtitleLayout::HorizontalNoPanel,
                SubtitleLayout::VerticalLeft,
                SubtitleLayout::VerticalLeftNoPanel,
                SubtitleLayout::Horizontal,
            ]
        );
    }

    #[test]
    fn test_layout_does_not_change_timing() {
        let mut a = typewriter("timing");
        let mut b = typewriter("timing");
        b.cycle_layout();
        b.cycle_layout();
        a.advance(DELAY + RATE * 4);
        b.advance(DELAY + RATE * 4);
        assert_eq!(a.displayed_len(), b.displayed_len());
        assert!(b.layout().is_vertical());
    }

    #[test]
    fn test_next_change_schedule() {
        let mut tw = typewriter("abc");
        assert_eq!(tw.next_change_in(), Some(DELAY));
        tw.advance(DELAY + RATE + Duration::from_millis(30));
        assert_eq!(tw.next_change_in(), Some(Duration::from_millis(50)));
        tw.advance(RATE * 10);
        assert_eq!(tw.next_change_in(), None);
    }

    #[test]
    fn test_next_change_overflow_stops_schedule() {
        let mut tw = SubtitleTypewriter::new(
            SubtitleConfig::new("abc", SubtitleLayout::Horizontal)
                .with_reveal_delay(DELAY)
                .with_reveal_interval(Duration::MAX),
        );
        tw.advance(DELAY);
        assert_eq!(tw.displayed_len(), 0);
        assert_eq!(tw.next_change_in(), None);
    }

    #[test]
    fn test_layout_serde_names() {
        assert_eq!(
            serde_json::to_string(&SubtitleLayout::HorizontalNoPanel).unwrap(),
            "\"HORIZONTAL_NO_BG\""
        );
        assert_eq!(
            serde_json::to_string(&SubtitleLayout::VerticalLeft).unwrap(),
            "\"VERTICAL_LEFT\""
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_player_reveals_on_virtual_time() {
        let mut player = SubtitlePlayer::with_timing(SubtitleLayout::Horizontal, DELAY, RATE);
        player.show("abc");
        assert!(!player.frame().visible);

        tokio::time::sleep(DELAY + Duration::from_millis(1)).await;
        let frame = player.frame();
        assert!(frame.visible);
        assert_eq!(frame.text, "");

        tokio::time::sleep(RATE * 2).await;
        assert_eq!(player.frame().text, "ab");

        tokio::time::sleep(RATE * 5).await;
        assert_eq!(player.frame().phase, RevealPhase::FullyRevealed);
        tokio::task::yield_now().await;
        assert!(!player.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_player_show_cancels_stale_timer() {
        let mut player = SubtitlePlayer::with_timing(SubtitleLayout::Horizontal, DELAY, RATE);
        player.show("old text");
        tokio::time::sleep(DELAY + RATE * 3 + Duration::from_millis(1)).await;
        assert_eq!(player.frame().text, "old");

        player.show("new");
        let frame = player.frame();
        assert_eq!(frame.text, "");
        assert!(!frame.visible);

        tokio::time::sleep(DELAY - Duration::from_millis(10)).await;
        assert!(!player.frame().visible);
        tokio::time::sleep(Duration::from_millis(11)).await;
        assert!(player.frame().visible);
        assert_eq!(player.frame().text, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_player_clear_stops_timers() {
        let mut player = SubtitlePlayer::with_timing(SubtitleLayout::Horizontal, DELAY, RATE);
        player.show("abc");
        player.clear();
        tokio::task::yield_now().await;
        assert!(!player.is_running());
        tokio::time::sleep(DELAY * 2).await;
        let frame = player.frame();
        assert!(!frame.visible);
        assert_eq!(frame.text, "");
    }
}
