//! # SEO Forge
//!
//! Generates the SEO asset set for a website from a handful of form fields and
//! an optional logo: meta, Open Graph and Twitter tags, JSON-LD structured
//! data, `robots.txt`, `sitemap.xml`, a full icon set with its web manifest and
//! tile config, and a ready-to-download ZIP with implementation guides.
//!
//! # Architecture: Session-Scoped Pipeline
//!
//! Every request runs in its own session namespace on disk:
//!
//! ```text
//! 1. Allocate   SessionStore     →  sessions/{id}/          (unique, private)
//! 2. Rasterize  logo             →  sessions/{id}/icons/    (rayon, best effort)
//! 3. Compose    fields + icons   →  SiteAssetBundle         (pure)
//! 4. Persist    bundle           →  sessions/{id}/*.html …  (async, per file)
//! 5. Package    bundle or id     →  sessions/{id}/temp/seo-assets-{id}.zip
//! ```
//!
//! A background [`session::Reclaimer`] deletes namespaces older than the
//! configured TTL. Nothing is shared between sessions, so concurrent requests
//! never see each other's files.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`service`] | The three entry points: `generate`, `enhance_description`, `package_for_download` |
//! | [`session`] | Session ids, namespaces, the injectable clock, TTL reclamation |
//! | [`imaging`] | Icon and social-card rasterization behind the `IconBackend` trait |
//! | [`compose`] | Pure bundle assembly plus async persistence into the namespace |
//! | [`links`] | Field sanitizing, URL canonicalization, site-link parsing |
//! | [`tags`] | Basic, Open Graph and Twitter tag groups |
//! | [`documents`] | `complete.html`, JSON-LD, `robots.txt`, `sitemap.xml` |
//! | [`companion`] | `site.webmanifest` and `browserconfig.xml` |
//! | [`guides`] | README, implementation guide, per-file guides |
//! | [`package`] | ZIP layout and atomic archive writes |
//! | [`credits`] | Credit ledger contract and the in-memory ledger |
//! | [`enhance`] | Description enhancement through a chat completions API |
//! | [`upload`] | Uploaded logo validation and cleanup |
//! | [`config`] | `seo-forge.toml` loading, validation, stock config |
//! | [`types`] | Shared types: icon catalog, artifacts, the bundle |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Best-Effort Icons
//!
//! One broken size never costs the user the whole set. Each variant renders
//! independently and reports `Produced` or `Skipped`. Tags and the manifest only
//! reference what was produced, so every emitted `/icons/…` path exists.
//!
//! ## Pure Composition
//!
//! [`compose::compose`] takes values and returns values. All I/O lives at the
//! edges (rasterize before, persist after), which keeps the document builders
//! testable without a filesystem and makes output a function of input plus the
//! clock.
//!
//! ## Maud for HTML
//!
//! `complete.html` is built with [Maud](https://maud.lambda.xyz/). Interpolation
//! is escaped by default. The tag groups are inserted pre-escaped because they
//! are built from already-sanitized fields.
//!
//! ## Pure-Rust Imaging
//!
//! PNG, JPEG and ICO go through the `image` crate, SVG through `resvg`. No
//! ImageMagick, no system libraries.

pub mod companion;
pub mod compose;
pub mod config;
pub mod credits;
pub mod documents;
pub mod enhance;
pub mod guides;
pub mod imaging;
pub mod links;
pub mod output;
pub mod package;
pub mod service;
pub mod session;
pub mod tags;
pub mod types;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;
