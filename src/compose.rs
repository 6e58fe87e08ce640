//! Asset composition: raw request fields in, a [`SiteAssetBundle`] out.
//!
//! [`compose`] is pure and deterministic for a fixed timestamp; [`persist`]
//! writes the bundle's text artifacts into a session namespace.
//!
//! ## Persisted files
//!
//! ```text
//! sessions/<id>/
//! ├── complete.html
//! ├── meta-tags.html
//! ├── opengraph-tags.html
//! ├── twitter-tags.html
//! ├── structured-data.json
//! ├── robots.txt
//! ├── sitemap.xml
//! ├── site.webmanifest        # only with icons
//! ├── browserconfig.xml       # only with icons
//! └── bundle.json             # the bundle itself, for packaging by id
//! ```
//!
//! Every artifact is written independently. A failed write is logged and
//! recorded in [`SiteAssetBundle::artifacts`]; it never fails the request.

use crate::companion;
use crate::config::WebAppConfig;
use crate::documents;
use crate::links::{canonicalize_url, parse_site_links, sanitize_text};
use crate::session::SessionId;
use crate::tags::{SiteFields, build_tag_groups};
use crate::types::{ArtifactKind, ArtifactWrite, IconCatalog, SiteAssetBundle};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::path::Path;
use thiserror::Error;

/// Name of the serialized bundle inside a namespace.
pub const BUNDLE_FILE: &str = "bundle.json";

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Unprocessed request fields, exactly as the user typed them.
#[derive(Debug, Clone, Copy)]
pub struct RawFields<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub site_url: &'a str,
    /// Newline-delimited; may be empty.
    pub site_links: &'a str,
}

/// Build every text artifact for one generation.
pub fn compose(
    raw: RawFields<'_>,
    catalog: Option<IconCatalog>,
    session_id: SessionId,
    generated_at: DateTime<Utc>,
    webapp: &WebAppConfig,
) -> Result<SiteAssetBundle, ComposeError> {
    let title = sanitize_text(raw.title);
    let description = sanitize_text(raw.description);
    let site_url = canonicalize_url(raw.site_url);
    let site_links = parse_site_links(raw.site_links, &site_url);

    let fields = SiteFields {
        title: &title,
        description: &description,
        site_url: &site_url,
    };

    let tags = build_tag_groups(fields, catalog.as_ref(), webapp);
    let structured_data = documents::structured_data(fields);
    let complete_html = documents::complete_html(fields, &tags, &structured_data, generated_at);
    let robots_txt = documents::robots_txt(&site_url);
    let sitemap_xml = documents::sitemap_xml(&site_links, generated_at);

    let (webmanifest, browserconfig) = match &catalog {
        Some(catalog) => (
            Some(companion::webmanifest(&title, &description, catalog, webapp)?),
            Some(companion::browserconfig(catalog, webapp)),
        ),
        None => (None, None),
    };

    Ok(SiteAssetBundle {
        session_id,
        generated_at,
        title,
        description,
        site_url,
        site_links,
        tags,
        structured_data,
        complete_html,
        robots_txt,
        sitemap_xml,
        webmanifest,
        browserconfig,
        icons: catalog,
        artifacts: Vec::new(),
    })
}

async fn write_artifact(namespace: &Path, kind: ArtifactKind, text: &str) -> ArtifactWrite {
    let path = namespace.join(kind.file_name());
    match tokio::fs::write(&path, text).await {
        Ok(()) => ArtifactWrite {
            kind,
            written: true,
            error: None,
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "artifact not written");
            ArtifactWrite {
                kind,
                written: false,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Write the bundle's artifacts into `namespace` concurrently, then
/// `bundle.json` with the write results filled in.
pub async fn persist(bundle: &mut SiteAssetBundle, namespace: &Path) {
    let writes = bundle
        .present_artifacts()
        .map(|(kind, text)| write_artifact(namespace, kind, text));
    let results = join_all(writes).await;
    bundle.artifacts = results;

    let bundle_path = namespace.join(BUNDLE_FILE);
    let written = match serde_json::to_vec_pretty(&*bundle) {
        Ok(json) => tokio::fs::write(&bundle_path, json)
            .await
            .map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    if let Err(error) = written {
        tracing::warn!(path = %bundle_path.display(), %error, "bundle not written");
    }
}

/// Load a persisted bundle from a namespace.
pub async fn load_bundle(namespace: &Path) -> std::io::Result<SiteAssetBundle> {
    let bytes = tokio::fs::read(namespace.join(BUNDLE_FILE)).await?;
    serde_json::from_slice(&bytes).map_err(std::io::Error::other)
}
