//! Shared test utilities for the seo-forge unit tests.
//!
//! Provides synthetic source images, canned catalogs and bundles, and a
//! fully wired [`SeoService`] backed by a temp directory.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let fx = FixtureService::new(&tmp);
//! let bundle = fx.service.generate(request()).await.unwrap();
//! assert_eq!(fx.namespace_count(), 1);
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use crate::compose::{RawFields, compose};
use crate::config::{ForgeConfig, IconsConfig, SocialConfig, WebAppConfig};
use crate::credits::MemoryLedger;
use crate::enhance::{EnhanceError, TextEnhancer};
use crate::imaging::backend::tests::MockBackend;
use crate::imaging::rasterize_catalog;
use crate::service::{GenerateRequest, SeoService};
use crate::session::{Session, SessionId, SessionStore, SystemClock};
use crate::types::{IconCatalog, SiteAssetBundle};
use crate::upload::Upload;

// =========================================================================
// Filesystem
// =========================================================================

/// Set a file or directory's modification time.
pub fn set_mtime(path: &Path, time: SystemTime) {
    std::fs::File::open(path)
        .and_then(|f| f.set_modified(time))
        .unwrap_or_else(|e| panic!("set_mtime({}): {e}", path.display()));
}

// =========================================================================
// Synthetic sources
// =========================================================================

/// Solid opaque PNG.
pub fn write_png(path: &Path, width: u32, height: u32) {
    image::RgbaImage::from_pixel(width, height, image::Rgba([51, 102, 204, 255]))
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}

/// Solid JPEG.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]))
        .save_with_format(path, image::ImageFormat::Jpeg)
        .unwrap();
}

/// SVG document filled edge to edge with one opaque rectangle.
pub fn write_svg(path: &Path, width: u32, height: u32) {
    let svg = format!(
        r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">
  <rect x="0" y="0" width="{width}" height="{height}" fill="#3366cc"/>
</svg>
"##
    );
    std::fs::write(path, svg).unwrap();
}

/// A PNG upload inside `tmp`, as the HTTP layer would hand it over.
pub fn png_upload(tmp: &TempDir, width: u32, height: u32) -> Upload {
    let path = tmp.path().join(format!("upload-{width}x{height}"));
    write_png(&path, width, height);
    Upload {
        size: std::fs::metadata(&path).unwrap().len(),
        path,
        original_name: "logo.png".to_string(),
        mime: "image/png".to_string(),
    }
}

// =========================================================================
// Canned data
// =========================================================================

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 9, 12, 30, 0).unwrap()
}

/// Default catalog for session `id`, planned through a mock backend.
pub fn sample_catalog(id: &str) -> IconCatalog {
    let session = Session {
        id: SessionId::parse(id).unwrap(),
        namespace: PathBuf::from(format!("/sessions/{id}")),
        created_at: SystemTime::UNIX_EPOCH,
    };
    rasterize_catalog(
        &MockBackend::with_dimensions(512, 512),
        Path::new("/logo.png"),
        &session,
        &IconsConfig::default(),
        &SocialConfig::default(),
    )
    .unwrap()
}

pub fn sample_bundle(id: &str, with_icons: bool) -> SiteAssetBundle {
    compose(
        RawFields {
            title: "My Site",
            description: "A site.",
            site_url: "https://example.com/",
            site_links: "https://example.com/about",
        },
        with_icons.then(|| sample_catalog(id)),
        SessionId::parse(id).unwrap(),
        fixed_time(),
        &WebAppConfig::default(),
    )
    .unwrap()
}

/// A valid request with no logo.
pub fn request() -> GenerateRequest {
    GenerateRequest {
        title: "My Site <script>".to_string(),
        description: "A site.".to_string(),
        site_url: "https://example.com/".to_string(),
        site_links: "https://example.com/about\nhttps://example.com/blog".to_string(),
        image: None,
    }
}

// =========================================================================
// Service fixture
// =========================================================================

/// Enhancer that counts calls and echoes or fails.
#[derive(Default)]
pub struct RecordingEnhancer {
    calls: AtomicUsize,
    fail: bool,
}

impl RecordingEnhancer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextEnhancer for RecordingEnhancer {
    async fn enhance(&self, text: &str) -> Result<String, EnhanceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EnhanceError::Empty);
        }
        Ok(format!("Improved: {text}"))
    }
}

pub struct FixtureService {
    pub service: SeoService,
    pub ledger: Arc<MemoryLedger>,
    pub enhancer: Arc<RecordingEnhancer>,
    root: PathBuf,
}

impl FixtureService {
    pub fn new(tmp: &TempDir) -> Self {
        Self::with_enhancer(tmp, RecordingEnhancer::default())
    }

    pub fn with_enhancer(tmp: &TempDir, enhancer: RecordingEnhancer) -> Self {
        let root = tmp.path().join("sessions");
        let store = Arc::new(SessionStore::new(&root, Arc::new(SystemClock)));
        let ledger = Arc::new(MemoryLedger::new());
        let enhancer = Arc::new(enhancer);
        let service = SeoService::new(
            Arc::new(ForgeConfig::default()),
            store,
            ledger.clone(),
            enhancer.clone(),
        );
        Self {
            service,
            ledger,
            enhancer,
            root,
        }
    }

    pub fn sessions_root(&self) -> &Path {
        &self.root
    }

    /// Live namespaces under the sessions root.
    pub fn namespace_count(&self) -> usize {
        match std::fs::read_dir(&self.root) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .filter(|e| SessionId::parse(&e.file_name().to_string_lossy()).is_ok())
                .count(),
            Err(_) => 0,
        }
    }
}
