use serde::{Deserialize, Serialize};

/// Supported UI languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    /// The language toggle only ever flips between the two.
    pub fn toggle(self) -> Self {
        match self {
            Language::En => Language::Zh,
            Language::Zh => Language::En,
        }
    }
}

/// UI strings the core needs to surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiText {
    InsertCoin,
    EnterDialogue,
    ReadingCartridge,
    RenderingGraphics,
    SystemError,
    ResetSystem,
    DailyLimitReached,
    RemainingCredits,
    HideText,
    ShowText,
    Save,
    HorizontalText,
    HorizontalNoBg,
    VerticalText,
    VerticalNoBg,
}

/// Look up a UI string.
pub fn text(language: Language, key: UiText) -> &'static str {
    use UiText::*;
    match language {
        Language::En => match key {
            InsertCoin => "INSERT COIN",
            EnterDialogue => "PLEASE ENTER DIALOGUE BELOW",
            ReadingCartridge => "READING CARTRIDGE...",
            RenderingGraphics => "RENDERING GRAPHICS...",
            SystemError => "SYSTEM ERROR",
            ResetSystem => "RESET SYSTEM",
            DailyLimitReached => "DAILY LIMIT REACHED",
            RemainingCredits => "CREDITS:",
            HideText => "HIDE TEXT",
            ShowText => "SHOW TEXT",
            Save => "SAVE",
            HorizontalText => "Horizontal Text",
            HorizontalNoBg => "Horizontal (No BG)",
            VerticalText => "Vertical Text",
            VerticalNoBg => "Vertical (No BG)",
        },
        Language::Zh => match key {
            InsertCoin => "投入代币",
            EnterDialogue => "请在下方输入对话",
            ReadingCartridge => "读取卡带中...",
            RenderingGraphics => "渲染画面中...",
            SystemError => "系统错误",
            ResetSystem => "重启系统",
            DailyLimitReached => "今日次数已用完",
            RemainingCredits => "剩余次数:",
            HideText => "隐藏字幕",
            ShowText => "显示字幕",
            Save => "保存截图",
            HorizontalText => "横向字幕",
            HorizontalNoBg => "横向字幕 (无背景)",
            VerticalText => "竖向字幕",
            VerticalNoBg => "竖向字幕 (无背景)",
        },
    }
}

/// Quota message with the limit rendered from the actual constant, e.g.
/// `DAILY LIMIT REACHED (10/10)`.
pub fn daily_limit_message(language: Language, daily_max: u32) -> String {
    format!(
        "{} ({}/{})",
        text(language, UiText::DailyLimitReached),
        daily_max,
        daily_max
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_round_trips() {
        assert_eq!(Language::En.toggle(), Language::Zh);
        assert_eq!(Language::En.toggle().toggle(), Language::En);
    }

    #[test]
    fn test_daily_limit_message_uses_constant() {
        assert_eq!(
            daily_limit_message(Language::En, 10),
            "DAILY LIMIT REACHED (10/10)"
        );
        assert!(daily_limit_message(Language::Zh, 10).ends_with("(10/10)"));
    }
}
