//! Plain-text guides shipped inside the download archive.
//!
//! Each artifact gets a short `*-guide.txt` next to it explaining where the
//! file goes. `README.md` lists the archive; `IMPLEMENTATION-GUIDE.md` walks
//! through deployment and embeds the generated tags verbatim.

use crate::types::{ArtifactKind, IconCatalog, SiteAssetBundle};
use std::fmt::Write;

/// Guide for one artifact.
pub fn artifact_guide(kind: ArtifactKind, site_url: &str) -> String {
    let (what, how) = match kind {
        ArtifactKind::CompleteHtml => (
            "A complete <head> with every generated tag, in one page.",
            "Copy the contents of <head> into the <head> of your site template.\n\
             Keep the comment banners if you like; they do not affect rendering.",
        ),
        ArtifactKind::MetaTags => (
            "Basic meta tags: charset, viewport, title, description, canonical link and icon links.",
            "Paste into the <head> of every page. Put <meta charset> first.",
        ),
        ArtifactKind::OpenGraphTags => (
            "Open Graph tags used by Facebook, LinkedIn, Slack and most link previews.",
            "Paste into the <head> after the basic meta tags.\n\
             og:image must stay reachable at its absolute URL.",
        ),
        ArtifactKind::TwitterTags => (
            "Twitter / X card tags.",
            "Paste into the <head> after the Open Graph tags.",
        ),
        ArtifactKind::StructuredData => (
            "schema.org WebSite record in JSON-LD, including a site-search action.",
            "Wrap in <script type=\"application/ld+json\"> ... </script> inside <head>,\n\
             or use complete.html which already does this.",
        ),
        ArtifactKind::Robots => (
            "Crawler directives: everything allowed, three aggressive crawlers refused.",
            "Upload to the web root so it is served at /robots.txt.",
        ),
        ArtifactKind::Sitemap => (
            "XML sitemap of the links you provided, homepage first.",
            "Upload to the web root so it is served at /sitemap.xml,\n\
             then submit that URL in your search console.",
        ),
        ArtifactKind::WebManifest => (
            "Web app manifest used by Android and installable web apps.",
            "Upload to the web root so it is served at /site.webmanifest.",
        ),
        ArtifactKind::BrowserConfig => (
            "Windows tile configuration.",
            "Upload to the web root so it is served at /browserconfig.xml.",
        ),
    };

    format!(
        "{name}\n{underline}\n\n{what}\n\n{how}\n\nSite: {site_url}\n",
        name = kind.file_name(),
        underline = "=".repeat(kind.file_name().len()),
    )
}

pub fn icons_guide(catalog: &IconCatalog) -> String {
    let mut out = String::from(
        "ICONS\n=====\n\nUpload every file in this folder to /icons/ on your site.\n\
         The generated tags already point there.\n\n",
    );
    for icon in catalog.all() {
        let _ = writeln!(out, "  {:<32} {:>9}  {}", icon.file_name, icon.sizes(), icon.mime);
    }
    let skipped: Vec<_> = catalog.skipped().collect();
    if !skipped.is_empty() {
        out.push_str("\nNot generated:\n");
        for outcome in skipped {
            let _ = writeln!(out, "  {}", outcome.name());
        }
    }
    out
}

pub fn readme(bundle: &SiteAssetBundle) -> String {
    let mut out = format!(
        "# SEO assets for {}\n\nGenerated {} for {}.\n\n## Contents\n\n",
        bundle.title,
        bundle.generated_at.format("%Y-%m-%d %H:%M UTC"),
        bundle.site_url
    );
    out.push_str("- `html/`: tag groups and a complete `<head>`, each with a guide\n");
    out.push_str("- `config/`: structured data, robots, sitemap");
    if bundle.webmanifest.is_some() {
        out.push_str(", web manifest, tile config");
    }
    out.push_str(", each with a guide\n");
    if let Some(catalog) = &bundle.icons {
        let _ = writeln!(
            out,
            "- `icons/`: {} image files and `ICONS-GUIDE.txt`",
            catalog.all().count()
        );
    }
    out.push_str("- `IMPLEMENTATION-GUIDE.md`: step-by-step deployment\n");
    out
}

pub fn implementation_guide(bundle: &SiteAssetBundle) -> String {
    let mut out = format!("# Implementation guide\n\nSite: {}\n\n", bundle.site_url);
    let mut step = 1;
    let mut section = |out: &mut String, title: &str, body: &str| {
        let _ = write!(out, "## {step}. {title}\n\n{body}\n");
        step += 1;
    };

    section(
        &mut out,
        "Basic meta tags",
        &format!(
            "Add to the `<head>` of every page:\n\n```html\n{}```\n",
            bundle.tags.basic
        ),
    );
    section(
        &mut out,
        "Open Graph",
        &format!("```html\n{}```\n", bundle.tags.open_graph),
    );
    section(
        &mut out,
        "Twitter cards",
        &format!("```html\n{}```\n", bundle.tags.twitter),
    );
    section(
        &mut out,
        "Structured data",
        &format!(
            "```html\n<script type=\"application/ld+json\">\n{}\n</script>\n```\n",
            bundle.structured_data
        ),
    );
    section(
        &mut out,
        "Root files",
        "Upload `config/robots.txt` and `config/sitemap.xml` to the web root.\n",
    );
    if bundle.icons.is_some() {
        section(
            &mut out,
            "Icons",
            "Upload `icons/*` to `/icons/`, and `config/site.webmanifest` and\n\
             `config/browserconfig.xml` to the web root.\n",
        );
    }
    section(
        &mut out,
        "Verify",
        &format!(
            "Open {}/robots.txt and {}/sitemap.xml in a browser, then check a\n\
             link preview with any Open Graph debugger.\n",
            bundle.site_url, bundle.site_url
        ),
    );
    out
}
