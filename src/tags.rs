//! Tag group builders: basic meta, Open Graph and Twitter.
//!
//! Each builder returns one HTML fragment, one tag per line, ready to paste
//! into a `<head>`. Inputs are already sanitized; nothing here escapes again.
//!
//! Icon links appear only when a catalog exists, and image tags only when
//! the catalog has a social preview. Every icon reference uses the
//! descriptor's external path; absolute URLs are the canonical site URL
//! followed by that path.

use crate::config::WebAppConfig;
use crate::types::{IconCatalog, IconDescriptor, IconGroup, TagGroups};
use std::fmt::Write;

/// External path of the web-app manifest.
pub const MANIFEST_PATH: &str = "/site.webmanifest";
/// External path of the tile descriptor.
pub const BROWSERCONFIG_PATH: &str = "/browserconfig.xml";

/// Normalized text fields shared by every builder.
#[derive(Debug, Clone, Copy)]
pub struct SiteFields<'a> {
    pub title: &'a str,
    pub description: &'a str,
    /// Canonical, no trailing slash.
    pub site_url: &'a str,
}

impl SiteFields<'_> {
    /// Absolute URL of a root-relative path.
    pub fn absolute(&self, path: &str) -> String {
        format!("{}{}", self.site_url, path)
    }
}

/// Build all three groups.
pub fn build_tag_groups(
    fields: SiteFields<'_>,
    catalog: Option<&IconCatalog>,
    webapp: &WebAppConfig,
) -> TagGroups {
    TagGroups {
        basic: basic_tags(fields, catalog, webapp),
        open_graph: open_graph_tags(fields, catalog.and_then(|c| c.social.as_ref())),
        twitter: twitter_tags(fields, catalog.and_then(|c| c.social.as_ref())),
    }
}

pub fn basic_tags(
    fields: SiteFields<'_>,
    catalog: Option<&IconCatalog>,
    webapp: &WebAppConfig,
) -> String {
    let mut out = String::new();
    line(&mut out, r#"<meta charset="UTF-8">"#);
    line(
        &mut out,
        r#"<meta name="viewport" content="width=device-width, initial-scale=1.0">"#,
    );
    line(&mut out, &format!("<title>{}</title>", fields.title));
    line(
        &mut out,
        &format!(r#"<meta name="description" content="{}">"#, fields.description),
    );
    line(
        &mut out,
        &format!(r#"<link rel="canonical" href="{}">"#, fields.site_url),
    );

    let Some(catalog) = catalog else {
        return out;
    };

    if let Some(ico) = &catalog.legacy {
        line(
            &mut out,
            &format!(r#"<link rel="icon" href="{}" sizes="any">"#, ico.external_path),
        );
    }
    for icon in catalog.in_group(IconGroup::Favicon) {
        line(&mut out, &icon_link(icon, true));
    }
    for icon in catalog.in_group(IconGroup::Touch) {
        line(&mut out, &icon_link(icon, false));
    }
    line(
        &mut out,
        &format!(r#"<link rel="manifest" href="{MANIFEST_PATH}">"#),
    );
    line(
        &mut out,
        &format!(
            r#"<meta name="msapplication-TileColor" content="{}">"#,
            webapp.tile_color
        ),
    );
    if let Some(tile) = catalog.in_group(IconGroup::Tile).find(|d| d.width == 144) {
        line(
            &mut out,
            &format!(
                r#"<meta name="msapplication-TileImage" content="{}">"#,
                tile.external_path
            ),
        );
    }
    line(
        &mut out,
        &format!(r#"<meta name="msapplication-config" content="{BROWSERCONFIG_PATH}">"#),
    );
    line(
        &mut out,
        &format!(r#"<meta name="theme-color" content="{}">"#, webapp.theme_color),
    );
    out
}

fn icon_link(icon: &IconDescriptor, with_type: bool) -> String {
    let mut tag = format!(r#"<link rel="{}""#, icon.rel.as_str());
    if with_type {
        let _ = write!(tag, r#" type="{}""#, icon.mime);
    }
    let _ = write!(
        tag,
        r#" sizes="{}" href="{}">"#,
        icon.sizes(),
        icon.external_path
    );
    tag
}

pub fn open_graph_tags(fields: SiteFields<'_>, social: Option<&IconDescriptor>) -> String {
    let mut out = String::new();
    property(&mut out, "og:type", "website");
    property(&mut out, "og:url", fields.site_url);
    property(&mut out, "og:title", fields.title);
    property(&mut out, "og:description", fields.description);
    property(&mut out, "og:site_name", fields.title);
    property(&mut out, "og:locale", "en_US");
    if let Some(image) = social {
        property(&mut out, "og:image", &fields.absolute(&image.external_path));
        property(&mut out, "og:image:type", &image.mime);
        property(&mut out, "og:image:width", &image.width.to_string());
        property(&mut out, "og:image:height", &image.height.to_string());
        property(&mut out, "og:image:alt", fields.title);
    }
    out
}

pub fn twitter_tags(fields: SiteFields<'_>, social: Option<&IconDescriptor>) -> String {
    let mut out = String::new();
    let card = if social.is_some() {
        "summary_large_image"
    } else {
        "summary"
    };
    named(&mut out, "twitter:card", card);
    named(&mut out, "twitter:url", fields.site_url);
    named(&mut out, "twitter:title", fields.title);
    named(&mut out, "twitter:description", fields.description);
    if let Some(image) = social {
        named(&mut out, "twitter:image", &fields.absolute(&image.external_path));
        named(&mut out, "twitter:image:alt", fields.title);
    }
    out
}

fn line(out: &mut String, tag: &str) {
    out.push_str(tag);
    out.push('\n');
}

fn property(out: &mut String, key: &str, value: &str) {
    line(
        out,
        &format!(r#"<meta property="{key}" content="{value}">"#),
    );
}

fn named(out: &mut String, key: &str, value: &str) {
    line(out, &format!(r#"<meta name="{key}" content="{value}">"#));
}
