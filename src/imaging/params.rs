//! Parameter types for rasterizer operations.
//!
//! These structs describe *what* to draw, not *how*. They are the interface
//! between [`operations`](super::operations), which decides the catalog, and
//! the [`backend`](super::backend), which does the pixel work. A mock backend
//! can therefore check every planned canvas without touching pixels.
//!
//! ## Types
//!
//! - [`Background`]: transparent padding or an opaque RGB fill.
//! - [`OutputFormat`]: PNG for every catalog entry, ICO for the legacy favicon.
//! - [`CanvasParams`]: source, output, canvas size, content box and offset.

use std::path::PathBuf;

/// Canvas fill behind the scaled source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    Transparent,
    Opaque([u8; 3]),
}

impl Background {
    pub fn rgba(self) -> [u8; 4] {
        match self {
            Background::Transparent => [0, 0, 0, 0],
            Background::Opaque([r, g, b]) => [r, g, b, 255],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Ico,
}

impl OutputFormat {
    pub fn mime(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Ico => "image/x-icon",
        }
    }
}

/// Full specification of one rendered file.
///
/// The source is resized to exactly `content_width × content_height` and
/// drawn at (`offset_x`, `offset_y`) on a `canvas_width × canvas_height`
/// canvas filled with `background`.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub content_width: u32,
    pub content_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
    pub background: Background,
    pub format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparent_background_has_zero_alpha() {
        assert_eq!(Background::Transparent.rgba()[3], 0);
    }

    #[test]
    fn opaque_background_has_full_alpha() {
        assert_eq!(Background::Opaque([1, 2, 3]).rgba(), [1, 2, 3, 255]);
    }

    #[test]
    fn format_mime_types() {
        assert_eq!(OutputFormat::Png.mime(), "image/png");
        assert_eq!(OutputFormat::Ico.mime(), "image/x-icon");
    }
}
