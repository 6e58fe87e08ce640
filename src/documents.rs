//! Whole-document artifacts: structured data, the consolidated HTML page,
//! robots directives and the sitemap.
//!
//! ## Consolidated page
//!
//! `complete.html` is a maud template. The tag groups arrive as finished
//! HTML fragments, so they go in through [`PreEscaped`], each behind a
//! comment banner:
//!
//! ```text
//! <!DOCTYPE html>
//! <html lang="en">
//!   <head>
//!     <!-- generation banner -->
//!     <!-- Basic Meta Tags -->        basic group
//!     <!-- Open Graph Tags -->        Open Graph group
//!     <!-- Twitter Card Tags -->      Twitter group
//!     <!-- Structured Data -->        JSON-LD script
//!   </head>
//!   <body>title and description</body>
//! </html>
//! ```

use crate::links::with_trailing_slash;
use crate::tags::SiteFields;
use crate::types::TagGroups;
use chrono::{DateTime, Utc};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use serde_json::json;

/// Crawlers refused by `robots.txt`.
pub const BLOCKED_CRAWLERS: &[&str] = &["AhrefsBot", "SemrushBot", "MJ12bot"];

/// schema.org `WebSite` record with a site-search action.
pub fn structured_data(fields: SiteFields<'_>) -> String {
    let record = json!({
        "@context": "https://schema.org",
        "@type": "WebSite",
        "name": fields.title,
        "description": fields.description,
        "url": fields.site_url,
        "potentialAction": {
            "@type": "SearchAction",
            "target": format!("{}/search?q={{search_term_string}}", fields.site_url),
            "query-input": "required name=search_term_string",
        },
    });
    // Serializing a json! value cannot fail.
    serde_json::to_string_pretty(&record).unwrap_or_else(|_| record.to_string())
}

fn banner(label: &str) -> Markup {
    PreEscaped(format!("<!-- {label} -->\n"))
}

/// Consolidated page with every head group in fixed order.
pub fn complete_html(
    fields: SiteFields<'_>,
    tags: &TagGroups,
    structured: &str,
    generated_at: DateTime<Utc>,
) -> String {
    let stamp = generated_at.format("%Y-%m-%d %H:%M:%S UTC");
    let markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                (banner(&format!("SEO assets generated by seo-forge on {stamp}")))
                (banner("Basic Meta Tags"))
                (PreEscaped(&tags.basic))
                (banner("Open Graph Tags"))
                (PreEscaped(&tags.open_graph))
                (banner("Twitter Card Tags"))
                (PreEscaped(&tags.twitter))
                (banner("Structured Data"))
                script type="application/ld+json" { (PreEscaped(structured)) }
            }
            body {
                h1 { (PreEscaped(fields.title)) }
                p { (PreEscaped(fields.description)) }
            }
        }
    };
    markup.into_string()
}

pub fn robots_txt(site_url: &str) -> String {
    let mut out = format!("User-agent: *\nAllow: /\n\nSitemap: {site_url}/sitemap.xml\n");
    for crawler in BLOCKED_CRAWLERS {
        out.push_str(&format!("\nUser-agent: {crawler}\nDisallow: /\n"));
    }
    out
}

fn xml_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// One `<url>` per link; the first link is the homepage.
pub fn sitemap_xml(links: &[String], generated_at: DateTime<Utc>) -> String {
    let lastmod = generated_at.format("%Y-%m-%d").to_string();
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for (index, link) in links.iter().enumerate() {
        let (priority, changefreq) = if index == 0 {
            ("1.0", "daily")
        } else {
            ("0.8", "weekly")
        };
        out.push_str(&format!(
            "  <url>\n    <loc>{}</loc>\n    <lastmod>{lastmod}</lastmod>\n    \
             <changefreq>{changefreq}</changefreq>\n    <priority>{priority}</priority>\n  </url>\n",
            xml_escape(&with_trailing_slash(link))
        ));
    }
    out.push_str("</urlset>\n");
    out
}
