//! High-level rasterizer operations.
//!
//! These functions combine calculations with backend execution. They take
//! the icon configuration, plan one canvas per catalog entry, render the
//! plans in parallel with rayon and assemble an [`IconCatalog`].
//!
//! A catalog entry that fails to render is logged and recorded as a
//! [`VariantOutcome::Skipped`]; only an unreadable source aborts the catalog.

use super::backend::{BackendError, Dimensions, IconBackend};
use super::calculations::{
    calculate_center_offset, calculate_contain_dimensions, calculate_fill_bounds,
    calculate_fit_within,
};
use super::params::{Background, CanvasParams, OutputFormat};
use crate::config::{IconVariant, IconsConfig, SocialConfig, parse_hex_color};
use crate::session::{ICONS_DIR, Session, SessionId};
use crate::types::{IconCatalog, IconDescriptor, IconGroup, VariantOutcome};
use rayon::prelude::*;
use std::path::Path;
use thiserror::Error;

/// File stem of the social-preview image.
pub const SOCIAL_NAME: &str = "og-image";
/// File stem of the legacy multi-resolution icon.
pub const LEGACY_NAME: &str = "favicon";

#[derive(Error, Debug)]
pub enum RasterizeError {
    #[error("source image cannot be used: {0}")]
    Source(#[source] BackendError),
}

/// Which catalog slot a plan fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Square(IconGroup),
    Legacy,
    Social,
}

/// One planned catalog entry: the canvas to render and the descriptor it
/// becomes once rendered.
#[derive(Debug, Clone)]
struct Planned {
    slot: Slot,
    params: CanvasParams,
    descriptor: IconDescriptor,
}

/// Get source dimensions using the backend.
pub fn get_dimensions(backend: &impl IconBackend, source: &Path) -> Result<(u32, u32), BackendError> {
    let dims = backend.identify(source)?;
    Ok((dims.width, dims.height))
}

/// Plan a transparent square of `size` pixels with the source contained and centered.
pub fn plan_square(
    source: &Path,
    output: &Path,
    size: u32,
    dims: Dimensions,
    format: OutputFormat,
) -> CanvasParams {
    let canvas = (size, size);
    let content = calculate_contain_dimensions((dims.width, dims.height), canvas);
    let offset = calculate_center_offset(canvas, content);
    CanvasParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        canvas_width: size,
        canvas_height: size,
        content_width: content.0,
        content_height: content.1,
        offset_x: offset.0,
        offset_y: offset.1,
        background: Background::Transparent,
        format,
    }
}

/// Plan the social-preview card: the source shrunk to fit the fill bounds,
/// never enlarged, centered on an opaque canvas.
pub fn plan_social(
    source: &Path,
    output: &Path,
    dims: Dimensions,
    config: &SocialConfig,
) -> CanvasParams {
    let canvas = (config.width, config.height);
    let bounds = calculate_fill_bounds(canvas, config.max_fill);
    let content = calculate_fit_within((dims.width, dims.height), bounds);
    let offset = calculate_center_offset(canvas, content);
    let background = parse_hex_color(&config.background).unwrap_or([255, 255, 255]);
    CanvasParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        canvas_width: canvas.0,
        canvas_height: canvas.1,
        content_width: content.0,
        content_height: content.1,
        offset_x: offset.0,
        offset_y: offset.1,
        background: Background::Opaque(background),
        format: OutputFormat::Png,
    }
}

fn descriptor(
    session_id: &SessionId,
    name: &str,
    params: &CanvasParams,
    group: IconGroup,
) -> IconDescriptor {
    let extension = match params.format {
        OutputFormat::Png => "png",
        OutputFormat::Ico => "ico",
    };
    let file_name = format!("{name}.{extension}");
    IconDescriptor {
        name: name.to_string(),
        internal_path: format!("/sessions/{session_id}/{ICONS_DIR}/{file_name}"),
        external_path: format!("/{ICONS_DIR}/{file_name}"),
        file_name,
        width: params.canvas_width,
        height: params.canvas_height,
        mime: params.format.mime().to_string(),
        rel: group.rel(),
        group,
    }
}

fn plan_catalog(
    source: &Path,
    session: &Session,
    dims: Dimensions,
    icons: &IconsConfig,
    social: &SocialConfig,
) -> Vec<Planned> {
    let icons_dir = session.icons_dir();
    let mut plans: Vec<Planned> = icons
        .variants
        .iter()
        .map(|IconVariant { name, size, group }| {
            let output = icons_dir.join(format!("{name}.png"));
            let params = plan_square(source, &output, *size, dims, OutputFormat::Png);
            Planned {
                slot: Slot::Square(*group),
                descriptor: descriptor(&session.id, name, &params, *group),
                params,
            }
        })
        .collect();

    let legacy_output = icons_dir.join(format!("{LEGACY_NAME}.ico"));
    let legacy = plan_square(source, &legacy_output, icons.legacy_size, dims, OutputFormat::Ico);
    plans.push(Planned {
        slot: Slot::Legacy,
        descriptor: descriptor(&session.id, LEGACY_NAME, &legacy, IconGroup::Favicon),
        params: legacy,
    });

    let social_output = icons_dir.join(format!("{SOCIAL_NAME}.png"));
    let card = plan_social(source, &social_output, dims, social);
    plans.push(Planned {
        slot: Slot::Social,
        descriptor: descriptor(&session.id, SOCIAL_NAME, &card, IconGroup::Favicon),
        params: card,
    });

    plans
}

/// Rasterize the whole catalog for one session.
///
/// Blocking; the async pipeline calls this from `spawn_blocking`. Entries
/// render in parallel on the rayon pool, and the catalog keeps plan order.
pub fn rasterize_catalog(
    backend: &impl IconBackend,
    source: &Path,
    session: &Session,
    icons: &IconsConfig,
    social: &SocialConfig,
) -> Result<IconCatalog, RasterizeError> {
    let dims = backend.identify(source).map_err(RasterizeError::Source)?;
    let plans = plan_catalog(source, session, dims, icons, social);

    let rendered: Vec<(Planned, Result<(), BackendError>)> = plans
        .into_par_iter()
        .map(|plan| {
            let result = backend.render(&plan.params);
            (plan, result)
        })
        .collect();

    let mut catalog = IconCatalog {
        icons: Vec::new(),
        legacy: None,
        social: None,
        outcomes: Vec::with_capacity(rendered.len()),
    };

    for (plan, result) in rendered {
        let name = plan.descriptor.name.clone();
        match result {
            Ok(()) => {
                tracing::debug!(session = %session.id, icon = %name, "rendered");
                match plan.slot {
                    Slot::Square(_) => catalog.icons.push(plan.descriptor),
                    Slot::Legacy => catalog.legacy = Some(plan.descriptor),
                    Slot::Social => catalog.social = Some(plan.descriptor),
                }
                catalog.outcomes.push(VariantOutcome::Produced { name });
            }
            Err(e) => {
                tracing::warn!(session = %session.id, icon = %name, error = %e, "icon skipped");
                catalog.outcomes.push(VariantOutcome::Skipped {
                    name,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(catalog)
}
