//! Shared types passed between the rasterizer, composer, packager and callers.
//!
//! Everything here is plain data with serde derives: a [`SiteAssetBundle`] is
//! returned to the caller and also persisted as `bundle.json` in the session
//! namespace, so packaging by session id can rebuild its guides later.

use crate::session::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Link relation an icon is advertised with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconRel {
    Icon,
    TouchIcon,
}

impl IconRel {
    pub fn as_str(self) -> &'static str {
        match self {
            IconRel::Icon => "icon",
            IconRel::TouchIcon => "apple-touch-icon",
        }
    }
}

/// Which deliverable document references an icon.
///
/// | Group | Referenced from |
/// |---|---|
/// | `Favicon` | `<link rel="icon">` in the head |
/// | `Touch` | `<link rel="apple-touch-icon">` in the head |
/// | `Android` | `site.webmanifest` |
/// | `Tile` | `browserconfig.xml` and `msapplication-TileImage` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconGroup {
    Favicon,
    Touch,
    Android,
    Tile,
}

impl IconGroup {
    pub fn rel(self) -> IconRel {
        match self {
            IconGroup::Touch => IconRel::TouchIcon,
            _ => IconRel::Icon,
        }
    }
}

/// One rasterized file in an [`IconCatalog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconDescriptor {
    /// Logical name, e.g. `favicon-32x32`.
    pub name: String,
    /// File name inside `icons/`.
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub mime: String,
    pub rel: IconRel,
    pub group: IconGroup,
    /// Session-scoped path, valid only while the session lives.
    pub internal_path: String,
    /// Root-relative deploy path, independent of the session.
    pub external_path: String,
}

impl IconDescriptor {
    /// `WxH` as used in `sizes` attributes.
    pub fn sizes(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// What happened to one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VariantOutcome {
    Produced { name: String },
    Skipped { name: String, reason: String },
}

impl VariantOutcome {
    pub fn name(&self) -> &str {
        match self {
            VariantOutcome::Produced { name } | VariantOutcome::Skipped { name, .. } => name,
        }
    }

    pub fn is_produced(&self) -> bool {
        matches!(self, VariantOutcome::Produced { .. })
    }
}

/// Rasterized variants derived from one source image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconCatalog {
    /// Square variants that were produced, in catalog order.
    pub icons: Vec<IconDescriptor>,
    /// Best-effort `favicon.ico`.
    pub legacy: Option<IconDescriptor>,
    /// Social-preview image.
    pub social: Option<IconDescriptor>,
    /// One outcome per attempted entry, including the legacy and social files.
    pub outcomes: Vec<VariantOutcome>,
}

impl IconCatalog {
    /// Squares belonging to `group`, in catalog order.
    pub fn in_group(&self, group: IconGroup) -> impl Iterator<Item = &IconDescriptor> {
        self.icons.iter().filter(move |d| d.group == group)
    }

    /// Every descriptor: squares, then the legacy icon, then the social preview.
    pub fn all(&self) -> impl Iterator<Item = &IconDescriptor> {
        self.icons
            .iter()
            .chain(self.legacy.iter())
            .chain(self.social.iter())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &VariantOutcome> {
        self.outcomes.iter().filter(|o| !o.is_produced())
    }
}

/// The three generated tag groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagGroups {
    pub basic: String,
    pub open_graph: String,
    pub twitter: String,
}

/// Where a text artifact lands in the download archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveSection {
    Html,
    Config,
}

impl ArchiveSection {
    pub fn dir(self) -> &'static str {
        match self {
            ArchiveSection::Html => "html",
            ArchiveSection::Config => "config",
        }
    }
}

/// Every text artifact the composer persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    CompleteHtml,
    MetaTags,
    OpenGraphTags,
    TwitterTags,
    StructuredData,
    Robots,
    Sitemap,
    WebManifest,
    BrowserConfig,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 9] = [
        ArtifactKind::CompleteHtml,
        ArtifactKind::MetaTags,
        ArtifactKind::OpenGraphTags,
        ArtifactKind::TwitterTags,
        ArtifactKind::StructuredData,
        ArtifactKind::Robots,
        ArtifactKind::Sitemap,
        ArtifactKind::WebManifest,
        ArtifactKind::BrowserConfig,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::CompleteHtml => "complete.html",
            ArtifactKind::MetaTags => "meta-tags.html",
            ArtifactKind::OpenGraphTags => "opengraph-tags.html",
            ArtifactKind::TwitterTags => "twitter-tags.html",
            ArtifactKind::StructuredData => "structured-data.json",
            ArtifactKind::Robots => "robots.txt",
            ArtifactKind::Sitemap => "sitemap.xml",
            ArtifactKind::WebManifest => "site.webmanifest",
            ArtifactKind::BrowserConfig => "browserconfig.xml",
        }
    }

    pub fn section(self) -> ArchiveSection {
        match self {
            ArtifactKind::CompleteHtml
            | ArtifactKind::MetaTags
            | ArtifactKind::OpenGraphTags
            | ArtifactKind::TwitterTags => ArchiveSection::Html,
            _ => ArchiveSection::Config,
        }
    }

    /// Name of the plain-text usage guide shipped next to the artifact.
    pub fn guide_name(self) -> &'static str {
        match self {
            ArtifactKind::CompleteHtml => "complete-guide.txt",
            ArtifactKind::MetaTags => "meta-tags-guide.txt",
            ArtifactKind::OpenGraphTags => "opengraph-tags-guide.txt",
            ArtifactKind::TwitterTags => "twitter-tags-guide.txt",
            ArtifactKind::StructuredData => "structured-data-guide.txt",
            ArtifactKind::Robots => "robots-guide.txt",
            ArtifactKind::Sitemap => "sitemap-guide.txt",
            ArtifactKind::WebManifest => "webmanifest-guide.txt",
            ArtifactKind::BrowserConfig => "browserconfig-guide.txt",
        }
    }
}

/// Persistence result for one text artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactWrite {
    pub kind: ArtifactKind,
    pub written: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full output of one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteAssetBundle {
    pub session_id: SessionId,
    pub generated_at: DateTime<Utc>,
    /// Sanitized title.
    pub title: String,
    /// Sanitized description.
    pub description: String,
    /// Canonical site URL, no trailing slash.
    pub site_url: String,
    /// Validated links, homepage first.
    pub site_links: Vec<String>,
    pub tags: TagGroups,
    pub structured_data: String,
    pub complete_html: String,
    pub robots_txt: String,
    pub sitemap_xml: String,
    /// Present only when an icon catalog exists.
    pub webmanifest: Option<String>,
    /// Present only when an icon catalog exists.
    pub browserconfig: Option<String>,
    pub icons: Option<IconCatalog>,
    #[serde(default)]
    pub artifacts: Vec<ArtifactWrite>,
}

impl SiteAssetBundle {
    /// Text content of one artifact, if the bundle carries it.
    pub fn artifact(&self, kind: ArtifactKind) -> Option<&str> {
        match kind {
            ArtifactKind::CompleteHtml => Some(&self.complete_html),
            ArtifactKind::MetaTags => Some(&self.tags.basic),
            ArtifactKind::OpenGraphTags => Some(&self.tags.open_graph),
            ArtifactKind::TwitterTags => Some(&self.tags.twitter),
            ArtifactKind::StructuredData => Some(&self.structured_data),
            ArtifactKind::Robots => Some(&self.robots_txt),
            ArtifactKind::Sitemap => Some(&self.sitemap_xml),
            ArtifactKind::WebManifest => self.webmanifest.as_deref(),
            ArtifactKind::BrowserConfig => self.browserconfig.as_deref(),
        }
    }

    /// Artifacts the bundle carries, in [`ArtifactKind::ALL`] order.
    pub fn present_artifacts(&self) -> impl Iterator<Item = (ArtifactKind, &str)> {
        ArtifactKind::ALL
            .into_iter()
            .filter_map(|kind| self.artifact(kind).map(|text| (kind, text)))
    }
}
