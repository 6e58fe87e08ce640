//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use seo_forge::config::ForgeConfig;
use seo_forge::credits::MemoryLedger;
use seo_forge::enhance::{EnhanceError, TextEnhancer};
use seo_forge::service::{GenerateRequest, SeoService};
use seo_forge::session::{Clock, SessionId, SessionStore, SystemClock};
use seo_forge::upload::Upload;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Enhancer that upper-cases its input and counts calls.
#[derive(Default)]
pub struct ShoutingEnhancer {
    calls: AtomicUsize,
}

impl ShoutingEnhancer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextEnhancer for ShoutingEnhancer {
    async fn enhance(&self, text: &str) -> Result<String, EnhanceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(text.to_uppercase())
    }
}

pub struct Harness {
    pub service: Arc<SeoService>,
    pub ledger: Arc<MemoryLedger>,
    pub enhancer: Arc<ShoutingEnhancer>,
    pub root: PathBuf,
}

impl Harness {
    pub fn new(tmp: &TempDir) -> Self {
        Self::with_clock(tmp, Arc::new(SystemClock))
    }

    pub fn with_clock(tmp: &TempDir, clock: Arc<dyn Clock>) -> Self {
        let root = tmp.path().join("sessions");
        let store = Arc::new(SessionStore::new(&root, clock));
        let ledger = Arc::new(MemoryLedger::new());
        let enhancer = Arc::new(ShoutingEnhancer::default());
        let service = SeoService::new(
            Arc::new(ForgeConfig::default()),
            store,
            ledger.clone(),
            enhancer.clone(),
        );
        Self {
            service: Arc::new(service),
            ledger,
            enhancer,
            root,
        }
    }

    /// Session directories currently on disk.
    pub fn namespaces(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| SessionId::parse(name).is_ok())
            .collect();
        names.sort();
        names
    }
}

/// Write a solid PNG logo into `dir` and describe it as an upload.
pub fn logo(dir: &Path, size: u32) -> Upload {
    let path = dir.join("logo.png");
    image::RgbaImage::from_pixel(size, size, image::Rgba([20, 120, 200, 255]))
        .save_with_format(&path, image::ImageFormat::Png)
        .unwrap();
    Upload::from_path(&path).unwrap()
}

pub fn request(links: &str) -> GenerateRequest {
    GenerateRequest {
        title: "Acme Tools".to_string(),
        description: "Hand-made tools for makers.".to_string(),
        site_url: "https://acme.example/".to_string(),
        site_links: links.to_string(),
        image: None,
    }
}
