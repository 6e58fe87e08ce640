//! Pure Rust rasterizer backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG) | `image::ImageReader::with_guessed_format` (content sniffing) |
//! | Decode (SVG) | `resvg` / `usvg` into a `tiny_skia::Pixmap`, then demultiplied |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` |
//! | Compose | `image::imageops::overlay` onto a filled canvas |
//! | Encode PNG / ICO | `image::RgbaImage::save_with_format` |
//!
//! Uploads arrive under temporary names with no reliable extension, so the
//! format is always taken from the file's bytes.

use super::backend::{BackendError, Dimensions, IconBackend};
use super::calculations::calculate_vector_scale;
use super::params::{Background, CanvasParams, OutputFormat};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use resvg::{tiny_skia, usvg};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Vector sources render with at least this many pixels on the longer edge.
pub const MIN_VECTOR_EDGE: u32 = 1024;

/// Vector sources render with at most this many pixels on the longer edge,
/// whatever size the document declares.
pub const MAX_VECTOR_EDGE: u32 = 2048;

/// Pure Rust backend using `image` and `resvg`.
///
/// Holds the most recently decoded source so a catalog decodes its logo once
/// and every variant renders from the same pixels. Create one per catalog.
#[derive(Default)]
pub struct RustBackend {
    decoded: Mutex<Option<(PathBuf, Arc<DynamicImage>)>>,
}

impl RustBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn source(&self, path: &Path) -> Result<Arc<DynamicImage>, BackendError> {
        let mut slot = self.decoded.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((cached, image)) = slot.as_ref() {
            if cached == path {
                return Ok(Arc::clone(image));
            }
        }
        let image = Arc::new(load_image(path)?);
        *slot = Some((path.to_path_buf(), Arc::clone(&image)));
        Ok(image)
    }
}

/// Whether the leading bytes look like an SVG document.
pub fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    text.starts_with('<') && text.contains("<svg")
}

/// Load and decode a source image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    let bytes = std::fs::read(path)?;
    if looks_like_svg(&bytes) {
        return render_svg(path, &bytes);
    }
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()
        .map_err(|e| decode_error(path, e))
}

fn decode_error(path: &Path, reason: impl std::fmt::Display) -> BackendError {
    BackendError::Decode {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Rasterize an SVG document into straight-alpha RGBA.
fn render_svg(path: &Path, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    let tree = usvg::Tree::from_data(bytes, &usvg::Options::default())
        .map_err(|e| decode_error(path, e))?;
    let size = tree.size();
    let scale = calculate_vector_scale(
        (size.width(), size.height()),
        MIN_VECTOR_EDGE,
        MAX_VECTOR_EDGE,
    );
    let width = (size.width() * scale).round().clamp(1.0, MAX_VECTOR_EDGE as f32) as u32;
    let height = (size.height() * scale).round().clamp(1.0, MAX_VECTOR_EDGE as f32) as u32;

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| decode_error(path, format!("cannot allocate {width}x{height} canvas")))?;
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    // tiny-skia stores premultiplied alpha; the image crate expects straight.
    let pixels: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();

    RgbaImage::from_raw(width, height, pixels)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| decode_error(path, "rendered buffer has the wrong length"))
}

fn save_canvas(
    canvas: RgbaImage,
    background: Background,
    path: &Path,
    format: OutputFormat,
) -> Result<(), BackendError> {
    let encoded = match (format, background) {
        (OutputFormat::Png, Background::Opaque(_)) => DynamicImage::ImageRgba8(canvas)
            .to_rgb8()
            .save_with_format(path, ImageFormat::Png),
        (OutputFormat::Png, Background::Transparent) => {
            canvas.save_with_format(path, ImageFormat::Png)
        }
        (OutputFormat::Ico, _) => canvas.save_with_format(path, ImageFormat::Ico),
    };
    encoded.map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to encode {}: {}", path.display(), e))
    })
}

impl IconBackend for RustBackend {
    fn identify(&self, source: &Path) -> Result<Dimensions, BackendError> {
        let image = self.source(source)?;
        Ok(Dimensions {
            width: image.width(),
            height: image.height(),
        })
    }

    fn render(&self, params: &CanvasParams) -> Result<(), BackendError> {
        let image = self.source(&params.source)?;
        let content = image
            .resize_exact(
                params.content_width,
                params.content_height,
                FilterType::Lanczos3,
            )
            .to_rgba8();

        let mut canvas = RgbaImage::from_pixel(
            params.canvas_width,
            params.canvas_height,
            Rgba(params.background.rgba()),
        );
        image::imageops::overlay(
            &mut canvas,
            &content,
            i64::from(params.offset_x),
            i64::from(params.offset_y),
        );

        save_canvas(canvas, params.background, &params.output, params.format)
    }
}
