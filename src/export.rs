//! PNG export of the composed scene.
//!
//! The scene image is decoded from its `data:` URI, upscaled with
//! nearest-neighbour sampling to keep pixel edges sharp, and the visible
//! subtitle is painted on top the way the overlay shows it on screen.

use base64::Engine;
use fontdue::layout::{
    CoordinateSystem, HorizontalAlign, Layout, LayoutSettings, TextStyle, VerticalAlign, WrapStyle,
};
use fontdue::{Font, FontSettings};
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, SceneError};
use crate::typewriter::{SubtitleFrame, SubtitleLayout};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    /// Integer upscale factor applied before the overlay is drawn.
    pub scale: u32,
    /// Pixel font used for subtitle text. Without one only the panel is drawn.
    pub font_path: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            scale: 2,
            font_path: None,
        }
    }
}

impl ExportConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale.max(1);
        self
    }

    pub fn with_font(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }
}

/// Subtitle as currently shown over the scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySnapshot {
    pub text: String,
    pub layout: SubtitleLayout,
}

/// Everything visible on screen that ends up in the exported file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedScene {
    pub image_url: String,
    /// `None` when the subtitle is hidden, so the export is the raw image.
    pub overlay: Option<OverlaySnapshot>,
}

impl ComposedScene {
    pub fn raw(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            overlay: None,
        }
    }

    pub fn with_overlay(mut self, text: impl Into<String>, layout: SubtitleLayout) -> Self {
        self.overlay = Some(OverlaySnapshot {
            text: text.into(),
            layout,
        });
        self
    }

    /// Capture the subtitle exactly as `frame` shows it: raw while hidden,
    /// otherwise the revealed prefix in the frame's layout.
    pub fn from_frame(image_url: impl Into<String>, frame: &SubtitleFrame) -> Self {
        let scene = Self::raw(image_url);
        if frame.visible {
            scene.with_overlay(frame.text.clone(), frame.layout)
        } else {
            scene
        }
    }

    /// File name for this scene: `<stem>_scene.png` with an overlay, `<stem>_raw.png` without.
    pub fn file_name(&self, stem: &str) -> String {
        match self.overlay {
            Some(_) => format!("{}_scene.png", stem),
            None => format!("{}_raw.png", stem),
        }
    }
}

/// Axis-aligned rectangle in output pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PanelRect {
    fn inset(&self, by: f32) -> Self {
        Self {
            x: self.x + by,
            y: self.y + by,
            width: (self.width - by * 2.0).max(0.0),
            height: (self.height - by * 2.0).max(0.0),
        }
    }
}

/// Area the subtitle occupies for `layout` on a `width` x `height` canvas.
///
/// Horizontal: 5% side and bottom margins, 25% of the height.
/// Vertical: a left column 5% in, 18% wide and 90% tall.
pub fn panel_rect(layout: SubtitleLayout, width: u32, height: u32) -> PanelRect {
    let (w, h) = (width as f32, height as f32);
    if layout.is_vertical() {
        PanelRect {
            x: w * 0.05,
            y: h * 0.05,
            width: w * 0.18,
            height: h * 0.9,
        }
    } else {
        let box_height = h * 0.25;
        PanelRect {
            x: w * 0.05,
            y: h - box_height - h * 0.05,
            width: w - w * 0.1,
            height: box_height,
        }
    }
}

/// Decode a base64 `data:` URI into raw bytes.
pub fn decode_data_uri(url: &str) -> Result<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| SceneError::ExportFailed("image is not a data: URI".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| SceneError::ExportFailed("malformed data: URI".into()))?;
    if !header.ends_with(";base64") {
        return Err(SceneError::ExportFailed(
            "data: URI is not base64-encoded".into(),
        ));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| SceneError::ExportFailed(format!("invalid base64 image: {}", e)))
}

/// Rasterizes a [`ComposedScene`] into an RGBA image.
#[derive(Clone)]
pub struct SceneRasterizer {
    scale: u32,
    font: Option<Arc<Font>>,
}

impl std::fmt::Debug for SceneRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneRasterizer")
            .field("scale", &self.scale)
            .field("has_font", &self.font.is_some())
            .finish()
    }
}

impl SceneRasterizer {
    pub fn new(scale: u32, font: Option<Arc<Font>>) -> Self {
        Self {
            scale: scale.max(1),
            font,
        }
    }

    pub fn compose(&self, scene: &ComposedScene) -> Result<RgbaImage> {
        let bytes = decode_data_uri(&scene.image_url)?;
        let source = image::load_from_memory(&bytes)
            .map_err(|e| SceneError::ExportFailed(format!("failed to decode image: {}", e)))?
            .to_rgba8();

        let (width, height) = match (
            source.width().checked_mul(self.scale),
            source.height().checked_mul(self.scale),
        ) {
            (Some(width), Some(height)) => (width, height),
            _ => return Err(SceneError::ExportFailed("scaled image too large".into())),
        };
        let mut canvas = imageops::resize(&source, width, height, FilterType::Nearest);

        if let Some(overlay) = &scene.overlay {
            self.draw_overlay(&mut canvas, overlay);
        }
        Ok(canvas)
    }

    fn draw_overlay(&self, canvas: &mut RgbaImage, overlay: &OverlaySnapshot) {
        let (width, height) = canvas.dimensions();
        let rect = panel_rect(overlay.layout, width, height);
        let font_size = (height as f32 * 0.05).floor().max(1.0);

        let text_area = if overlay.layout.has_panel() {
            let border = (width as f32 * 0.005).max(2.0);
            fill_rect(canvas, rect, WHITE);
            fill_rect(canvas, rect.inset(border), BLACK);
            let inner = rect.inset(border * 2.0);
            stroke_rect(canvas, inner, border, WHITE);
            inner.inset(font_size)
        } else {
            rect.inset(font_size * 0.5)
        };

        let Some(font) = &self.font else {
            tracing::debug!("No export font configured, subtitle text omitted");
            return;
        };

        let text = if overlay.layout.is_vertical() {
            stack_vertically(&overlay.text)
        } else {
            overlay.text.clone()
        };

        if overlay.layout.has_panel() {
            draw_text(canvas, font, &text, text_area, font_size, WHITE);
        } else {
            let outline = (font_size / 12.0).round().max(1.0);
            for (dx, dy) in [
                (-1.0, -1.0),
                (0.0, -1.0),
                (1.0, -1.0),
                (-1.0, 0.0),
                (1.0, 0.0),
                (-1.0, 1.0),
                (0.0, 1.0),
                (1.0, 1.0),
            ] {
                let shifted = PanelRect {
                    x: text_area.x + dx * outline,
                    y: text_area.y + dy * outline,
                    ..text_area
                };
                draw_text(canvas, font, &text, shifted, font_size, BLACK);
            }
            draw_text(canvas, font, &text, text_area, font_size, WHITE);
        }
    }
}

/// One character per line, for the vertical column layouts.
fn stack_vertically(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .map(String::from)
        .collect::<Vec<_>>()
        .join("\n")
}

fn fill_rect(canvas: &mut RgbaImage, rect: PanelRect, color: Rgba<u8>) {
    let (width, height) = canvas.dimensions();
    let x0 = rect.x.round().max(0.0) as u32;
    let y0 = rect.y.round().max(0.0) as u32;
    let x1 = ((rect.x + rect.width).round().max(0.0) as u32).min(width);
    let y1 = ((rect.y + rect.height).round().max(0.0) as u32).min(height);
    for y in y0..y1 {
        for x in x0..x1 {
            canvas.put_pixel(x, y, color);
        }
    }
}

/// Outline centred on the rectangle's edges.
fn stroke_rect(canvas: &mut RgbaImage, rect: PanelRect, line_width: f32, color: Rgba<u8>) {
    let half = line_width / 2.0;
    let edges = [
        PanelRect { x: rect.x - half, y: rect.y - half, width: rect.width + line_width, height: line_width },
        PanelRect { x: rect.x - half, y: rect.y + rect.height - half, width: rect.width + line_width, height: line_width },
        PanelRect { x: rect.x - half, y: rect.y - half, width: line_width, height: rect.height + line_width },
        PanelRect { x: rect.x + rect.width - half, y: rect.y - half, width: line_width, height: rect.height + line_width },
    ];
    for edge in edges {
        fill_rect(canvas, edge, color);
    }
}

/// Lay out `text` inside `area`, wrapping per character, and blend it in.
fn draw_text(
    canvas: &mut RgbaImage,
    font: &Font,
    text: &str,
    area: PanelRect,
    font_size: f32,
    color: Rgba<u8>,
) {
    let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
    layout.reset(&LayoutSettings {
        x: area.x,
        y: area.y,
        max_width: Some(area.width.max(font_size)),
        max_height: None,
        horizontal_align: HorizontalAlign::Left,
        vertical_align: VerticalAlign::Top,
        line_height: 1.5,
        wrap_style: WrapStyle::Letter,
        wrap_hard_breaks: true,
    });
    layout.append(&[font], &TextStyle::new(text, font_size, 0));

    for glyph in layout.glyphs() {
        if glyph.width == 0 || glyph.height == 0 {
            continue;
        }
        let (_, bitmap) = font.rasterize_config(glyph.key);
        blend_glyph(
            canvas,
            glyph.x.round() as i32,
            glyph.y.round() as i32,
            glyph.width,
            glyph.height,
            &bitmap,
            color,
        );
    }
}

fn blend_glyph(
    canvas: &mut RgbaImage,
    x: i32,
    y: i32,
    glyph_width: usize,
    glyph_height: usize,
    bitmap: &[u8],
    color: Rgba<u8>,
) {
    let (width, height) = canvas.dimensions();
    for row in 0..glyph_height {
        let py = y + row as i32;
        if py < 0 || py >= height as i32 {
            continue;
        }
        for col in 0..glyph_width {
            let px = x + col as i32;
            if px < 0 || px >= width as i32 {
                continue;
            }
            let coverage = bitmap.get(row * glyph_width + col).copied().unwrap_or(0);
            if coverage == 0 {
                continue;
            }
            let pixel = canvas.get_pixel_mut(px as u32, py as u32);
            let alpha = u16::from(coverage);
            let inv = 255 - alpha;
            for channel in 0..3 {
                let src = u16::from(color.0[channel]);
                let dst = u16::from(pixel.0[channel]);
                pixel.0[channel] = ((src * alpha + dst * inv) / 255) as u8;
            }
            pixel.0[3] = 255;
        }
    }
}

/// Load a TTF/OTF font for subtitle text.
pub fn load_font(path: &Path) -> Result<Font> {
    let bytes = std::fs::read(path).map_err(|e| {
        SceneError::ExportFailed(format!("failed to read font {}: {}", path.display(), e))
    })?;
    Font::from_bytes(bytes, FontSettings::default()).map_err(|e| {
        SceneError::ExportFailed(format!("failed to parse font {}: {}", path.display(), e))
    })
}

/// Writes composed scenes to PNG files on a blocking worker.
///
/// Only one export runs at a time; a second request while busy is refused.
/// Failures are logged and reported as `None`, never as an error.
#[derive(Debug, Clone)]
pub struct SceneExporter {
    config: ExportConfig,
    rasterizer: SceneRasterizer,
    busy: Arc<AtomicBool>,
}

/// Clears the busy flag when the export finishes or is dropped.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SceneExporter {
    /// Build an exporter, loading the configured font. A font that cannot be
    /// loaded is logged and exports continue without text.
    pub fn new(config: ExportConfig) -> Self {
        let font = config.font_path.as_deref().and_then(|path| match load_font(path) {
            Ok(font) => Some(Arc::new(font)),
            Err(e) => {
                tracing::warn!(error = %e, "Export font unavailable");
                None
            }
        });
        let rasterizer = SceneRasterizer::new(config.scale, font);
        Self {
            config,
            rasterizer,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Export `scene` as `<stem>_scene.png` or `<stem>_raw.png`.
    ///
    /// Returns the written path, or `None` if the exporter was busy or the
    /// export failed.
    pub async fn export(&self, scene: ComposedScene, stem: &str) -> Option<PathBuf> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Export already in progress");
            return None;
        }
        let guard = BusyGuard(Arc::clone(&self.busy));

        let path = self.config.output_dir.join(scene.file_name(stem));
        let rasterizer = self.rasterizer.clone();
        let target = path.clone();
        let result = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            write_scene(&rasterizer, &scene, &target)
        })
        .await
        .map_err(|e| SceneError::ExportFailed(format!("export task failed: {}", e)))
        .and_then(|inner| inner);

        match result {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Scene exported");
                Some(path)
            }
            Err(e) => {
                tracing::error!(error = %e, "Scene export failed");
                None
            }
        }
    }
}

fn write_scene(rasterizer: &SceneRasterizer, scene: &ComposedScene, path: &Path) -> Result<()> {
    let image = rasterizer.compose(scene)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| SceneError::ExportFailed(format!("cannot create output dir: {}", e)))?;
    }
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| SceneError::ExportFailed(format!("failed to write {}: {}", path.display(), e)))
}
