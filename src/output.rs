//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Generate
//!
//! ```text
//! Session 3fQ9...x1
//!     Title: My Site
//!     Site: https://example.com
//! Links
//! 001 https://example.com (homepage)
//! 002 https://example.com/about
//! Icons
//!     favicon-16x16.png 16x16
//!     favicon-48x48: skipped (decode failed)
//! Artifacts
//!     complete.html: written
//!     robots.txt: failed (permission denied)
//!
//! Generated 8 artifacts, 15 icons
//! ```
//!
//! ## Sweep
//!
//! ```text
//! Removed 2 sessions, kept 5
//!     failed: 3fQ9...x1 (permission denied)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::session::ReclaimReport;
use crate::types::{SiteAssetBundle, VariantOutcome};
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

pub fn format_generate_output(bundle: &SiteAssetBundle) -> Vec<String> {
    let mut lines = vec![
        format!("Session {}", bundle.session_id),
        format!("{}Title: {}", indent(1), truncate(&bundle.title, 60)),
        format!("{}Site: {}", indent(1), bundle.site_url),
        "Links".to_string(),
    ];

    for (i, link) in bundle.site_links.iter().enumerate() {
        let suffix = if i == 0 { " (homepage)" } else { "" };
        lines.push(format!("{} {}{}", format_index(i + 1), link, suffix));
    }

    let mut icon_count = 0;
    if let Some(catalog) = &bundle.icons {
        lines.push("Icons".to_string());
        for icon in catalog.all() {
            icon_count += 1;
            lines.push(format!("{}{} {}", indent(1), icon.file_name, icon.sizes()));
        }
        for outcome in catalog.skipped() {
            if let VariantOutcome::Skipped { name, reason } = outcome {
                lines.push(format!(
                    "{}{}: skipped ({})",
                    indent(1),
                    name,
                    truncate(reason, 60)
                ));
            }
        }
    }

    lines.push("Artifacts".to_string());
    let mut written = 0;
    for artifact in &bundle.artifacts {
        let status = match (&artifact.written, &artifact.error) {
            (true, _) => {
                written += 1;
                "written".to_string()
            }
            (false, Some(e)) => format!("failed ({})", truncate(e, 60)),
            (false, None) => "failed".to_string(),
        };
        lines.push(format!(
            "{}{}: {}",
            indent(1),
            artifact.kind.file_name(),
            status
        ));
    }

    lines.push(String::new());
    let mut summary = format!("Generated {}", plural(written, "artifact"));
    if bundle.icons.is_some() {
        summary.push_str(&format!(", {}", plural(icon_count, "icon")));
    }
    lines.push(summary);
    lines
}

pub fn print_generate_output(bundle: &SiteAssetBundle) {
    for line in format_generate_output(bundle) {
        println!("{}", line);
    }
}

pub fn format_package_output(archive: &Path) -> Vec<String> {
    vec![format!("Archive → {}", archive.display())]
}

pub fn print_package_output(archive: &Path) {
    for line in format_package_output(archive) {
        println!("{}", line);
    }
}

pub fn format_sweep_output(report: &ReclaimReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Removed {}, kept {}",
        plural(report.removed.len(), "session"),
        report.kept
    )];
    for (name, error) in &report.failed {
        lines.push(format!("{}failed: {} ({})", indent(1), name, truncate(error, 60)));
    }
    lines
}

pub fn print_sweep_output(report: &ReclaimReport) {
    for line in format_sweep_output(report) {
        println!("{}", line);
    }
}
