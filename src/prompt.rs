use crate::style::ThemeDefinition;

const DESCRIPTION_TEMPLATE: &str = r#"You are an expert at directing retro 8-bit video game scenes (Famicom/NES style).

User's dialogue line: "{dialogue}"
Selected Style: {style} ({style_guidance})

Task: Create a visual description of a video game scene that captures the *emotion* and *story* of the dialogue.

{dynamics}

{requirements}

Output only the description."#;

const CHARACTER_DYNAMICS: [&str; 4] = [
    "Analyze the dialogue to determine the characters.",
    "IF MULTIPLE CHARACTERS ARE PRESENT: They should be **INTERACTING**.",
    "Describe specific body language (e.g., pointing, holding hands, handing an item, comforting).",
    "If solitary: Describe the character engaging with the environment (looking at the sky, sitting at a desk, etc.).",
];

const DESCRIPTION_REQUIREMENTS: [&str; 6] = [
    "Style: 8-bit pixel art, Famicom/NES color palette.",
    "Perspective: **Isometric view** (like Final Fantasy Tactics, Tactics Ogre, Solstice, or Landstalker).",
    "Mood: Match the emotion of the text (e.g., lonely, hopeful, tense, cozy).",
    "Content: Describe the environment and the characters' placement/interaction. Use lighting and weather to tell the story.",
    "IMPORTANT: Do NOT include any text bubbles or text inside the image description. The text will be added later via UI.",
    "Keep it concise (under 50 words).",
];

const IMAGE_TEMPLATE: &str = r#"Create an authentic 8-bit NES/Famicom video game screenshot.

Scene Context: {description}
Style Specifics: {style_guidance}

{rules}

{negative}"#;

const VISUAL_RULES: [&str; 6] = [
    "HARDWARE LIMITATIONS: Simulate the NES 54-color palette limitation. Use high contrast.",
    "PIXELATION: The image must look like it was drawn pixel-by-pixel. MACRO PIXELS.",
    "SHADING: Use DITHERING (checkerboard patterns) for shading. DO NOT use gradients, soft light, or bloom.",
    "EDGES: Hard, aliased edges only. NO anti-aliasing.",
    "VIEWPOINT: Top-down Isometric perspective. The view should be zoomed out (not too close) to capture the scene. Ensure correct proportions and scale for all objects.",
    "NO TEXT: The image must contain NO text, labels, or HUD elements.",
];

const NEGATIVE_PROMPT: &str = "Vector art, smooth lines, anti-aliasing, blur, bloom, glow effects, modern indie game style, high resolution details, photorealism, 3D rendering, gradients, soft shadows, oil painting, watercolor, text, UI overlay, glitch, noise, chromatic aberration.";

/// Stage-1 prompt: expand a dialogue line into a scene description.
pub fn description_prompt(dialogue: &str, theme: &ThemeDefinition) -> String {
    render(
        DESCRIPTION_TEMPLATE,
        &[
            ("dialogue", dialogue),
            ("style", theme.style.id()),
            ("style_guidance", theme.description_fragment),
            (
                "dynamics",
                &section(
                    "CRITICAL - Character Dynamics & Interaction",
                    &bullet_list(&CHARACTER_DYNAMICS),
                ),
            ),
            (
                "requirements",
                &section("Requirements", &bullet_list(&DESCRIPTION_REQUIREMENTS)),
            ),
        ],
    )
}

/// Stage-2 prompt: render a scene description as NES pixel art.
pub fn image_prompt(description: &str, theme: &ThemeDefinition) -> String {
    render(
        IMAGE_TEMPLATE,
        &[
            ("description", description),
            ("style_guidance", theme.image_fragment),
            (
                "rules",
                &section(
                    "VISUAL RULES (STRICTLY ENFORCE)",
                    &numbered_list(&VISUAL_RULES),
                ),
            ),
            ("negative", &section("Negative Prompt", NEGATIVE_PROMPT)),
        ],
    )
}

/// Replace `{key}` placeholders in a single pass.
///
/// Substituted values are never rescanned, so user text containing `{...}`
/// comes through untouched. Unknown placeholders are left as-is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match vars.iter().find(|(k, _)| *k == key) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Create a numbered list from items (1-indexed).
pub fn numbered_list(items: &[&str]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn bullet_list(items: &[&str]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Labeled section: `LABEL:` followed by the content.
pub fn section(label: &str, content: &str) -> String {
    format!("{}:\n{}", label, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::SceneStyle;

    #[test]
    fn test_render_basic() {
        let result = render("Hello {name}, process {input}", &[("name", "Alice"), ("input", "data")]);
        assert_eq!(result, "Hello Alice, process data");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let result = render("{known} + {missing}", &[("known", "x")]);
        assert_eq!(result, "x + {missing}");
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        let result = render("say {dialogue}", &[("dialogue", "{style}"), ("style", "boom")]);
        assert_eq!(result, "say {style}");
    }

    #[test]
    fn test_render_unclosed_brace() {
        assert_eq!(render("open { brace", &[]), "open { brace");
    }

    #[test]
    fn test_numbered_list() {
        assert_eq!(numbered_list(&["First", "Second"]), "1. First\n2. Second");
        assert_eq!(numbered_list(&[]), "");
    }

    #[test]
    fn test_description_prompt_embeds_dialogue_and_theme() {
        let theme = SceneStyle::MedievalFantasy.definition();
        let prompt = description_prompt("Run, the dragon is here!", theme);
        assert!(prompt.contains("User's dialogue line: \"Run, the dragon is here!\""));
        assert!(prompt.contains("Selected Style: MEDIEVAL_FANTASY"));
        assert!(prompt.contains(theme.description_fragment));
        assert!(prompt.contains("under 50 words"));
        assert!(prompt.contains("Do NOT include any text bubbles"));
    }

    #[test]
    fn test_image_prompt_embeds_rules() {
        let theme = SceneStyle::CassetteFuturism.definition();
        let prompt = image_prompt("A hacker at a green terminal.", theme);
        assert!(prompt.contains("Scene Context: A hacker at a green terminal."));
        assert!(prompt.contains(theme.image_fragment));
        assert!(prompt.contains("1. HARDWARE LIMITATIONS"));
        assert!(prompt.contains("NO anti-aliasing"));
        assert!(prompt.contains("Negative Prompt:\nVector art"));
    }
}
