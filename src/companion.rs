//! Companion descriptors derived from an icon catalog.
//!
//! `site.webmanifest` lists the Android icons; `browserconfig.xml` lists the
//! Windows tiles. Both reference external icon paths only.

use crate::config::WebAppConfig;
use crate::links::sanitize_text;
use crate::types::{IconCatalog, IconGroup};
use serde::Serialize;

/// Longest `short_name` launchers display without truncating.
pub const SHORT_NAME_MAX: usize = 12;

#[derive(Debug, Serialize)]
struct WebManifest<'a> {
    name: &'a str,
    short_name: String,
    description: &'a str,
    start_url: &'static str,
    display: &'a str,
    theme_color: &'a str,
    background_color: &'a str,
    icons: Vec<ManifestIcon<'a>>,
}

#[derive(Debug, Serialize)]
struct ManifestIcon<'a> {
    src: &'a str,
    sizes: String,
    #[serde(rename = "type")]
    mime: &'a str,
}

/// At most [`SHORT_NAME_MAX`] displayed characters of a sanitized `title`.
///
/// Counted on the unescaped text so a cut never lands inside `&lt;` or `&gt;`.
pub fn short_name(title: &str) -> String {
    let raw = title.replace("&lt;", "<").replace("&gt;", ">");
    let cut: String = raw.chars().take(SHORT_NAME_MAX).collect();
    sanitize_text(&cut)
}

/// Render `site.webmanifest` as pretty-printed JSON.
pub fn webmanifest(
    title: &str,
    description: &str,
    catalog: &IconCatalog,
    webapp: &WebAppConfig,
) -> Result<String, serde_json::Error> {
    let manifest = WebManifest {
        name: title,
        short_name: short_name(title),
        description,
        start_url: "/",
        display: &webapp.display,
        theme_color: &webapp.theme_color,
        background_color: &webapp.background_color,
        icons: catalog
            .in_group(IconGroup::Android)
            .map(|icon| ManifestIcon {
                src: &icon.external_path,
                sizes: icon.sizes(),
                mime: &icon.mime,
            })
            .collect(),
    };
    serde_json::to_string_pretty(&manifest)
}

/// Tile element names keyed by edge length.
const TILE_ELEMENTS: &[(u32, &str)] = &[
    (70, "square70x70logo"),
    (150, "square150x150logo"),
    (310, "square310x310logo"),
];

/// Render `browserconfig.xml` from the produced tile icons.
pub fn browserconfig(catalog: &IconCatalog, webapp: &WebAppConfig) -> String {
    let mut tiles = String::new();
    for (size, element) in TILE_ELEMENTS {
        if let Some(icon) = catalog.in_group(IconGroup::Tile).find(|d| d.width == *size) {
            tiles.push_str(&format!(
                "            <{element} src=\"{}\"/>\n",
                icon.external_path
            ));
        }
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <browserconfig>\n\
         \x20   <msapplication>\n\
         \x20       <tile>\n\
         {tiles}\
         \x20           <TileColor>{}</TileColor>\n\
         \x20       </tile>\n\
         \x20   </msapplication>\n\
         </browserconfig>\n",
        webapp.tile_color
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::sample_catalog;

    const ID: &str = "AbCdEfGhIjKlMnOpQrStUvWxYz012345";

    #[test]
    fn short_name_truncates_on_char_boundary() {
        assert_eq!(short_name("Short"), "Short");
        assert_eq!(short_name("A Very Long Site Title"), "A Very Long");
        assert_eq!(short_name("Ünïcödé Wörld Sïte"), "Ünïcödé Wörl");
    }

    #[test]
    fn short_name_never_splits_an_escape() {
        assert_eq!(short_name("Acme Shop &lt;1&gt;"), "Acme Shop &lt;1");
        assert_eq!(short_name("&lt;b&gt; Bold Tools"), "&lt;b&gt; Bold Too");
    }

    #[test]
    fn manifest_lists_android_icons_only() {
        let catalog = sample_catalog(ID);
        let json = webmanifest("My Site", "A site.", &catalog, &WebAppConfig::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let icons = value["icons"].as_array().unwrap();
        assert_eq!(icons.len(), 2);
        assert_eq!(icons[0]["src"], "/icons/android-chrome-192x192.png");
        assert_eq!(icons[0]["sizes"], "192x192");
        assert_eq!(icons[0]["type"], "image/png");
        assert_eq!(icons[1]["sizes"], "512x512");
        assert_eq!(value["start_url"], "/");
        assert_eq!(value["short_name"], "My Site");
        assert!(!json.contains(ID));
    }

    #[test]
    fn browserconfig_lists_tiles_and_color() {
        let catalog = sample_catalog(ID);
        let xml = browserconfig(&catalog, &WebAppConfig::default());
        assert!(xml.contains(r#"<square70x70logo src="/icons/mstile-70x70.png"/>"#));
        assert!(xml.contains(r#"<square150x150logo src="/icons/mstile-150x150.png"/>"#));
        assert!(xml.contains(r#"<square310x310logo src="/icons/mstile-310x310.png"/>"#));
        assert!(xml.contains("<TileColor>#2b5797</TileColor>"));
        assert!(!xml.contains(ID));
    }

    #[test]
    fn browserconfig_omits_missing_tiles() {
        let mut catalog = sample_catalog(ID);
        catalog.icons.retain(|d| d.name != "mstile-310x310");
        let xml = browserconfig(&catalog, &WebAppConfig::default());
        assert!(!xml.contains("square310x310logo"));
        assert!(xml.contains("square150x150logo"));
    }
}
