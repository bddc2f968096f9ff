use retro_vision::{
    AspectRatio, ComposedScene, ExportConfig, GeminiClient, GeminiConfig, SceneExporter,
    ScenePipeline, StyleChoice,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let text = std::env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: basic_generation <dialogue> [style]");
        std::process::exit(1);
    });
    let style = std::env::args()
        .nth(2)
        .and_then(|raw| StyleChoice::parse(&raw))
        .unwrap_or(StyleChoice::Random);

    let api_key = std::env::var("GEMINI_API_KEY")?;
    let client = GeminiClient::new(GeminiConfig::with_api_key(api_key));
    let pipeline = ScenePipeline::new(client.clone(), client);

    println!("Generating a scene for \"{}\"...", text);
    let scene = pipeline.run(&text, style, AspectRatio::Widescreen).await?;

    println!("Style: {}", scene.style);
    println!("Description: {}", scene.scene_description);

    let exporter = SceneExporter::new(ExportConfig::new("."));
    match exporter.export(ComposedScene::raw(scene.image_url), "retro-scene").await {
        Some(path) => println!("Saved {}", path.display()),
        None => eprintln!("Export failed"),
    }

    Ok(())
}
