//! Icon rasterization: one logo in, a fixed catalog of icons out.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | full decode via `image` or `resvg` |
//! | **Square icons** | contain + transparent padding, PNG |
//! | **Social card** | fit within fill bounds on an opaque canvas, PNG |
//! | **Legacy favicon** | 32 px square, ICO |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for canvas geometry (unit testable)
//! - **Parameters**: Data structures describing one render
//! - **Backend**: [`IconBackend`] trait + [`RustBackend`]
//! - **Operations**: Catalog planning and parallel execution

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, IconBackend};
pub use calculations::{
    calculate_center_offset, calculate_contain_dimensions, calculate_fill_bounds,
    calculate_fit_within, calculate_vector_scale,
};
pub use operations::{RasterizeError, get_dimensions, rasterize_catalog};
pub use params::{Background, CanvasParams, OutputFormat};
pub use rust_backend::RustBackend;
