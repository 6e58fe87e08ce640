//! Rasterizer backend trait and shared types.
//!
//! The [`IconBackend`] trait defines the two operations every backend must
//! support: identify a source and render one canvas.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate for raster sources and `resvg` for SVG.

use super::params::CanvasParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for rasterizer backends.
///
/// `identify` must fully decode the source: a file that identifies is a file
/// that renders, so a broken upload fails the whole catalog up front instead
/// of every variant one by one.
pub trait IconBackend: Sync {
    fn identify(&self, source: &Path) -> Result<Dimensions, BackendError>;

    /// Draw the source into a fresh canvas and write it to `params.output`.
    fn render(&self, params: &CanvasParams) -> Result<(), BackendError>;
}
