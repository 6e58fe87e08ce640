//! Pure calculation functions for canvas geometry.
//!
//! All functions here are pure and testable without any I/O or images.

/// Scale `source` to fit inside `target` while preserving aspect ratio.
///
/// One edge matches the target exactly, the other is equal or smaller.
/// Small sources are enlarged: square icons always fill their canvas.
/// Neither edge drops below 1 px.
///
/// # Examples
/// ```
/// # use seo_forge::imaging::calculate_contain_dimensions;
/// // 400x200 into a 32px square -> 32x16
/// assert_eq!(calculate_contain_dimensions((400, 200), (32, 32)), (32, 16));
/// ```
pub fn calculate_contain_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;
    if src_w == 0 || src_h == 0 {
        return target;
    }

    let scale = (tgt_w as f64 / src_w as f64).min(tgt_h as f64 / src_h as f64);
    scaled(source, scale, target)
}

/// Like [`calculate_contain_dimensions`] but never enlarges the source.
pub fn calculate_fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return (1, 1);
    }

    let scale = (bounds.0 as f64 / src_w as f64)
        .min(bounds.1 as f64 / src_h as f64)
        .min(1.0);
    scaled(source, scale, bounds)
}

fn scaled(source: (u32, u32), scale: f64, limit: (u32, u32)) -> (u32, u32) {
    let w = ((source.0 as f64 * scale).round() as u32).clamp(1, limit.0.max(1));
    let h = ((source.1 as f64 * scale).round() as u32).clamp(1, limit.1.max(1));
    (w, h)
}

/// Largest box the social-preview logo may occupy on its canvas.
pub fn calculate_fill_bounds(canvas: (u32, u32), max_fill: f32) -> (u32, u32) {
    let fill = max_fill.clamp(0.0, 1.0) as f64;
    (
        ((canvas.0 as f64 * fill).floor() as u32).max(1),
        ((canvas.1 as f64 * fill).floor() as u32).max(1),
    )
}

/// Top-left offset that centers `content` on `canvas`.
pub fn calculate_center_offset(canvas: (u32, u32), content: (u32, u32)) -> (u32, u32) {
    (
        canvas.0.saturating_sub(content.0) / 2,
        canvas.1.saturating_sub(content.1) / 2,
    )
}

/// Scale factor for rendering a vector source so its longer edge lands in
/// `min_edge..=max_edge` pixels. Documents already inside that range render
/// at their natural size; oversized ones are scaled down.
pub fn calculate_vector_scale(size: (f32, f32), min_edge: u32, max_edge: u32) -> f32 {
    let longer = size.0.max(size.1);
    if !longer.is_finite() || longer <= 0.0 {
        return 1.0;
    }
    if longer < min_edge as f32 {
        min_edge as f32 / longer
    } else if longer > max_edge as f32 {
        max_edge as f32 / longer
    } else {
        1.0
    }
}
