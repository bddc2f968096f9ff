use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use retro_vision::quota::SystemClock;
use retro_vision::{
    AspectRatio, ExportConfig, FileStore, GeminiClient, QuotaLimiter, RetroConsole,
    ScenePipeline, ServerConfig, StyleChoice, SubmitOutcome, SubtitleLayout, SubtitlePlayer,
};

#[derive(Parser)]
#[command(name = "retro-vision")]
#[command(about = "Turn a line of dialogue into an 8-bit game screenshot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (configured from the environment)
    Serve,
    /// Generate one scene and save it as PNG
    Generate {
        /// Dialogue line to illustrate
        #[arg(short, long)]
        text: String,
        /// Style id (JAPANESE_SCHOOL, MEDIEVAL_FANTASY, MILLENNIUM_CITY, CASSETTE_FUTURISM, RANDOM)
        #[arg(short, long, default_value = "JAPANESE_SCHOOL")]
        style: String,
        /// Aspect ratio, 16:9 or 4:3
        #[arg(short, long, default_value = "16:9")]
        aspect: String,
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
        /// Pixel font for the subtitle text
        #[arg(long)]
        font: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = LayoutArg::Horizontal)]
        layout: LayoutArg,
        /// Save the raw image without subtitles
        #[arg(long)]
        no_subtitles: bool,
        /// Where the daily quota record is kept
        #[arg(long, default_value = ".retro-vision")]
        state_dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LayoutArg {
    Horizontal,
    HorizontalNoBg,
    Vertical,
    VerticalNoBg,
}

impl From<LayoutArg> for SubtitleLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Horizontal => SubtitleLayout::Horizontal,
            LayoutArg::HorizontalNoBg => SubtitleLayout::HorizontalNoPanel,
            LayoutArg::Vertical => SubtitleLayout::VerticalLeft,
            LayoutArg::VerticalNoBg => SubtitleLayout::VerticalLeftNoPanel,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "retro_vision=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::from_env()?;

    match cli.command {
        Commands::Serve => retro_vision::server::serve(config).await,
        Commands::Generate {
            text,
            style,
            aspect,
            out,
            font,
            layout,
            no_subtitles,
            state_dir,
        } => {
            let style = StyleChoice::parse(&style)
                .with_context(|| format!("unknown style '{}'", style))?;
            let aspect = AspectRatio::parse(&aspect)
                .with_context(|| format!("unsupported aspect ratio '{}'", aspect))?;

            let mut export = ExportConfig::new(out);
            if let Some(font) = font {
                export = export.with_font(font);
            }
            let options = GenerateOptions {
                text,
                style,
                aspect,
                layout: layout.into(),
                subtitles: !no_subtitles,
                state_dir,
                export,
            };
            run_generate(config, options).await
        }
    }
}

struct GenerateOptions {
    text: String,
    style: StyleChoice,
    aspect: AspectRatio,
    layout: SubtitleLayout,
    subtitles: bool,
    state_dir: PathBuf,
    export: ExportConfig,
}

async fn run_generate(config: ServerConfig, options: GenerateOptions) -> Result<()> {
    if !config.gemini.is_configured() {
        bail!("GEMINI_API_KEY is not set");
    }
    let client = GeminiClient::new(config.gemini);
    let quota = QuotaLimiter::new(
        Arc::new(FileStore::new(options.state_dir)),
        Arc::new(SystemClock),
    );
    let console = RetroConsole::with_player(
        ScenePipeline::new(client.clone(), client),
        quota,
        options.export,
        SubtitlePlayer::new(options.layout),
    );

    while console.snapshot().layout != options.layout {
        console.cycle_layout();
    }
    console.select_style(options.style);
    console.set_input(options.text);

    match console.submit(options.aspect).await {
        SubmitOutcome::Completed(scene) => {
            println!("Style:       {}", scene.style);
            println!("Description: {}", scene.scene_description);
        }
        SubmitOutcome::Failed(message) | SubmitOutcome::QuotaExceeded(message) => bail!(message),
        SubmitOutcome::Ignored => bail!("dialogue text must not be blank"),
        SubmitOutcome::Discarded => bail!("generation was cancelled"),
    }

    if !options.subtitles {
        console.toggle_subtitles();
    }
    let stem = format!("retro-scene-{}", chrono::Utc::now().timestamp_millis());
    match console.save(&stem).await {
        Some(path) => println!("Saved:       {}", path.display()),
        None => bail!("export failed"),
    }
    println!("Credits left today: {}", console.snapshot().remaining_credits);
    Ok(())
}
