//! Style catalog: the fixed set of visual themes and their prompt fragments.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SceneError};
use crate::i18n::Language;

/// A concrete visual theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SceneStyle {
    #[default]
    JapaneseSchool,
    MedievalFantasy,
    MillenniumCity,
    CassetteFuturism,
}

impl SceneStyle {
    /// Every concrete style, in catalog order. `Random` samples from this.
    pub const ALL: [SceneStyle; 4] = [
        SceneStyle::JapaneseSchool,
        SceneStyle::MedievalFantasy,
        SceneStyle::MillenniumCity,
        SceneStyle::CassetteFuturism,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            SceneStyle::JapaneseSchool => "JAPANESE_SCHOOL",
            SceneStyle::MedievalFantasy => "MEDIEVAL_FANTASY",
            SceneStyle::MillenniumCity => "MILLENNIUM_CITY",
            SceneStyle::CassetteFuturism => "CASSETTE_FUTURISM",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|style| style.id() == s.trim())
    }

    /// Full theme definition for this style.
    pub fn definition(&self) -> &'static ThemeDefinition {
        match self {
            SceneStyle::JapaneseSchool => &THEMES[0],
            SceneStyle::MedievalFantasy => &THEMES[1],
            SceneStyle::MillenniumCity => &THEMES[2],
            SceneStyle::CassetteFuturism => &THEMES[3],
        }
    }

    pub fn label(&self, language: Language) -> &'static str {
        self.definition().label(language)
    }
}

impl fmt::Display for SceneStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// What the user picked in the style selector: a concrete style or `RANDOM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StyleChoice {
    Style(SceneStyle),
    Random,
}

impl StyleChoice {
    pub const RANDOM_ID: &'static str = "RANDOM";

    pub fn id(&self) -> &'static str {
        match self {
            StyleChoice::Style(style) => style.id(),
            StyleChoice::Random => Self::RANDOM_ID,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        if s.trim() == Self::RANDOM_ID {
            return Some(StyleChoice::Random);
        }
        SceneStyle::parse(s).map(StyleChoice::Style)
    }

    pub fn label(&self, language: Language) -> &'static str {
        match self {
            StyleChoice::Style(style) => style.label(language),
            StyleChoice::Random => match language {
                Language::En => "Random Style",
                Language::Zh => "随机风格",
            },
        }
    }

    /// Resolve to a concrete style using the thread-local RNG.
    pub fn resolve(&self) -> SceneStyle {
        self.resolve_with(&mut rand::rng())
    }

    /// Resolve to a concrete style. `Random` samples uniformly over
    /// [`SceneStyle::ALL`] and never yields itself.
    pub fn resolve_with<R: Rng + ?Sized>(&self, rng: &mut R) -> SceneStyle {
        match self {
            StyleChoice::Style(style) => *style,
            StyleChoice::Random => SceneStyle::ALL[rng.random_range(0..SceneStyle::ALL.len())],
        }
    }

    /// Selector entries in display order, `RANDOM` last.
    pub fn options() -> [StyleChoice; 5] {
        [
            StyleChoice::Style(SceneStyle::JapaneseSchool),
            StyleChoice::Style(SceneStyle::MedievalFantasy),
            StyleChoice::Style(SceneStyle::MillenniumCity),
            StyleChoice::Style(SceneStyle::CassetteFuturism),
            StyleChoice::Random,
        ]
    }
}

impl Default for StyleChoice {
    fn default() -> Self {
        StyleChoice::Style(SceneStyle::default())
    }
}

impl From<SceneStyle> for StyleChoice {
    fn from(style: SceneStyle) -> Self {
        StyleChoice::Style(style)
    }
}

impl TryFrom<String> for StyleChoice {
    type Error = SceneError;

    fn try_from(value: String) -> Result<Self> {
        StyleChoice::parse(&value)
            .ok_or_else(|| SceneError::InvalidRequest(format!("unknown style '{}'", value)))
    }
}

impl From<StyleChoice> for String {
    fn from(choice: StyleChoice) -> Self {
        choice.id().to_string()
    }
}

/// Static prompt material and labels for one style.
#[derive(Debug)]
pub struct ThemeDefinition {
    pub style: SceneStyle,
    /// Guidance embedded in the stage-1 (description) prompt.
    pub description_fragment: &'static str,
    /// Guidance embedded in the stage-2 (image) prompt.
    pub image_fragment: &'static str,
    pub label_en: &'static str,
    pub label_zh: &'static str,
}

impl ThemeDefinition {
    pub fn label(&self, language: Language) -> &'static str {
        match language {
            Language::En => self.label_en,
            Language::Zh => self.label_zh,
        }
    }
}

static THEMES: [ThemeDefinition; 4] = [
    ThemeDefinition {
        style: SceneStyle::JapaneseSchool,
        description_fragment: "Japanese high school, classroom, hallway, rooftop, cherry blossoms, nostalgic, sentimental.",
        image_fragment: "Japanese adventure game (AVG) background, uniforms, clean pixel lines, nostalgic atmosphere, cherry blossom petals, hard shadows.",
        label_en: "Japanese School",
        label_zh: "日式校园",
    },
    ThemeDefinition {
        style: SceneStyle::MedievalFantasy,
        description_fragment: "Medieval fantasy RPG, stone castles, dungeons, forests, torches, knights, magic, Dragon Quest style.",
        image_fragment: "Medieval fantasy RPG (Dragon Quest IV style), stone brick textures, medieval architecture, pixelated torchlight using dithering, high contrast shadows, chiptune aesthetic.",
        label_en: "Medieval Fantasy",
        label_zh: "中世纪冒险",
    },
    ThemeDefinition {
        style: SceneStyle::MillenniumCity,
        description_fragment: "Early 2000s Asian metropolis (like Tokyo, Taipei, or Seoul). Nostalgic urban memory, Kairosoft simulation game style. Dense streets, overhead power lines against the sky, vending machines, small shops, concrete apartments with balconies, outdoor air conditioning units. Realistic everyday life, not sci-fi.",
        image_fragment: "Detailed isometric pixel art, Asian city aesthetic (Tokyo/Seoul), PS1/GBA era pre-rendered background style. Features: Dense urban landscape, overhead power lines, air conditioning units, vending machines, tiled concrete. Colors: Urban greys, faded signage colors, hard edges, no blur.",
        label_en: "Millennium City",
        label_zh: "千禧年都市",
    },
    ThemeDefinition {
        style: SceneStyle::CassetteFuturism,
        description_fragment: "80s retro-futurism, analog tech, CRT monitors, wires, industrial sci-fi, beige and orange plastics, Metal Gear/Snatcher style.",
        image_fragment: "Cassette futurism, NES sci-fi (like Metal Gear or Snatcher), industrial pipes, green screen terminals, retro tech atmosphere, cold florescent lighting using solid colors, limited palette.",
        label_en: "Cassette Futurism",
        label_zh: "磁带未来主义",
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_definitions_match_their_style() {
        for style in SceneStyle::ALL {
            assert_eq!(style.definition().style, style);
        }
    }

    #[test]
    fn test_concrete_choice_resolves_to_itself() {
        let choice = StyleChoice::Style(SceneStyle::MillenniumCity);
        assert_eq!(choice.resolve(), SceneStyle::MillenniumCity);
    }

    #[test]
    fn test_random_covers_every_concrete_style() {
        let mut rng = StdRng::seed_from_u64(7);
        let seen: HashSet<SceneStyle> = (0..400)
            .map(|_| StyleChoice::Random.resolve_with(&mut rng))
            .collect();
        assert_eq!(seen.len(), SceneStyle::ALL.len());
    }

    #[test]
    fn test_parse_ids() {
        assert_eq!(StyleChoice::parse("RANDOM"), Some(StyleChoice::Random));
        assert_eq!(
            StyleChoice::parse("CASSETTE_FUTURISM"),
            Some(StyleChoice::Style(SceneStyle::CassetteFuturism))
        );
        assert_eq!(StyleChoice::parse("VAPORWAVE"), None);
    }

    #[test]
    fn test_style_choice_serde() {
        let json = serde_json::to_string(&StyleChoice::Random).unwrap();
        assert_eq!(json, "\"RANDOM\"");
        let parsed: StyleChoice = serde_json::from_str("\"MEDIEVAL_FANTASY\"").unwrap();
        assert_eq!(parsed, StyleChoice::Style(SceneStyle::MedievalFantasy));
        assert!(serde_json::from_str::<StyleChoice>("\"NOPE\"").is_err());
    }

    #[test]
    fn test_labels_per_language() {
        assert_eq!(SceneStyle::JapaneseSchool.label(Language::En), "Japanese School");
        assert_eq!(SceneStyle::JapaneseSchool.label(Language::Zh), "日式校园");
        assert_eq!(StyleChoice::Random.label(Language::Zh), "随机风格");
    }

    #[test]
    fn test_options_end_with_random() {
        let options = StyleChoice::options();
        assert_eq!(options.len(), SceneStyle::ALL.len() + 1);
        assert_eq!(options[4], StyleChoice::Random);
    }
}
