//! Download archive assembly.
//!
//! Every entry is an [`Artifact`]: an archive path plus bytes that live
//! either in memory or on disk. Text artifacts, icons and guides all travel
//! the same way, so the writer has one loop and no special cases.
//!
//! ## Archive layout
//!
//! ```text
//! seo-assets-<id>.zip
//! ├── README.md
//! ├── IMPLEMENTATION-GUIDE.md
//! ├── html/
//! │   ├── complete.html          + complete-guide.txt
//! │   ├── meta-tags.html         + meta-tags-guide.txt
//! │   ├── opengraph-tags.html    + opengraph-tags-guide.txt
//! │   └── twitter-tags.html      + twitter-tags-guide.txt
//! ├── config/
//! │   ├── structured-data.json, robots.txt, sitemap.xml
//! │   ├── site.webmanifest, browserconfig.xml    (only with icons)
//! │   └── one *-guide.txt per file
//! └── icons/                                     (only with icons)
//!     ├── *.png, favicon.ico
//!     └── ICONS-GUIDE.txt
//! ```
//!
//! The archive is written to `<name>.zip.partial` and renamed into place
//! once complete. On any error the partial file is removed, so the returned
//! path never names a truncated archive.

use crate::compose::load_bundle;
use crate::guides;
use crate::session::{ICONS_DIR, SessionId};
use crate::types::SiteAssetBundle;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Archive entry source missing: {}", .0.display())]
    MissingSource(PathBuf),
    #[error("Packaging task failed: {0}")]
    Task(String),
}

/// Where an entry's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    Memory(Vec<u8>),
    Disk(PathBuf),
}

/// One archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Forward-slash path inside the archive.
    pub archive_path: String,
    pub source: ArtifactSource,
}

impl Artifact {
    pub fn memory(archive_path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            archive_path: archive_path.into(),
            source: ArtifactSource::Memory(bytes.into()),
        }
    }

    pub fn disk(archive_path: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            archive_path: archive_path.into(),
            source: ArtifactSource::Disk(path.into()),
        }
    }
}

/// Ordered archive contents.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet {
    entries: Vec<Artifact>,
}

/// File name of the archive for a session.
pub fn archive_name(id: &SessionId) -> String {
    format!("seo-assets-{id}.zip")
}

/// Guide file listing the icon set inside the archive.
pub const ICONS_GUIDE: &str = "ICONS-GUIDE.txt";

impl ArtifactSet {
    /// Text from the in-memory bundle, icons from the namespace on disk.
    pub fn from_bundle(bundle: &SiteAssetBundle, namespace: &Path) -> Self {
        Self::assemble(bundle, namespace, |_, text| {
            ArtifactSource::Memory(text.as_bytes().to_vec())
        })
    }

    /// Everything from the namespace, with `bundle.json` supplying the
    /// guides. Text files missing on disk fall back to the bundle's copy.
    pub async fn from_namespace(namespace: &Path) -> Result<Self, PackageError> {
        let bundle = load_bundle(namespace).await?;
        let set = Self::assemble(&bundle, namespace, |file, text| {
            let path = namespace.join(file);
            if path.is_file() {
                ArtifactSource::Disk(path)
            } else {
                ArtifactSource::Memory(text.as_bytes().to_vec())
            }
        });
        Ok(set)
    }

    fn assemble(
        bundle: &SiteAssetBundle,
        namespace: &Path,
        text_source: impl Fn(&str, &str) -> ArtifactSource,
    ) -> Self {
        let mut set = Self::default();
        set.push(Artifact::memory("README.md", guides::readme(bundle)));
        set.push(Artifact::memory(
            "IMPLEMENTATION-GUIDE.md",
            guides::implementation_guide(bundle),
        ));

        for (kind, text) in bundle.present_artifacts() {
            let dir = kind.section().dir();
            set.push(Artifact {
                archive_path: format!("{dir}/{}", kind.file_name()),
                source: text_source(kind.file_name(), text),
            });
            set.push(Artifact::memory(
                format!("{dir}/{}", kind.guide_name()),
                guides::artifact_guide(kind, &bundle.site_url),
            ));
        }

        if let Some(catalog) = &bundle.icons {
            let icons_dir = namespace.join(ICONS_DIR);
            for icon in catalog.all() {
                set.push(Artifact::disk(
                    format!("{ICONS_DIR}/{}", icon.file_name),
                    icons_dir.join(&icon.file_name),
                ));
            }
            set.push(Artifact::memory(
                format!("{ICONS_DIR}/{ICONS_GUIDE}"),
                guides::icons_guide(catalog),
            ));
        }
        set
    }

    pub fn push(&mut self, artifact: Artifact) {
        self.entries.push(artifact);
    }

    pub fn entries(&self) -> &[Artifact] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    output.with_file_name(name)
}

fn write_zip(entries: &[Artifact], path: &Path) -> Result<(), PackageError> {
    let file = File::create(path)?;
    let mut zip = zip::ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        zip.start_file(entry.archive_path.as_str(), options)?;
        match &entry.source {
            ArtifactSource::Memory(bytes) => zip.write_all(bytes)?,
            ArtifactSource::Disk(source) => {
                let mut input = File::open(source).map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => PackageError::MissingSource(source.clone()),
                    _ => PackageError::Io(e),
                })?;
                std::io::copy(&mut input, &mut zip)?;
            }
        }
    }

    let mut writer = zip.finish()?;
    writer.flush()?;
    Ok(())
}

/// Write `set` to `output` atomically and return `output`.
///
/// The zip work runs on a blocking thread.
pub async fn package_archive(set: ArtifactSet, output: &Path) -> Result<PathBuf, PackageError> {
    let output = output.to_path_buf();
    let partial = partial_path(&output);
    let entry_count = set.len();

    let result = {
        let partial = partial.clone();
        tokio::task::spawn_blocking(move || write_zip(set.entries(), &partial))
            .await
            .map_err(|e| PackageError::Task(e.to_string()))
            .and_then(|written| written)
    };

    let result = match result {
        Ok(()) => tokio::fs::rename(&partial, &output)
            .await
            .map_err(PackageError::from),
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %partial.display(), error = %cleanup, "partial archive left behind");
            }
        }
        return Err(e);
    }

    tracing::info!(path = %output.display(), entries = entry_count, "archive written");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::persist;
    use crate::test_helpers::{sample_bundle, write_png};
    use std::io::Read;
    use tempfile::TempDir;

    const ID: &str = "AbCdEfGhIjKlMnOpQrStUvWxYz012345";

    fn names(path: &Path) -> Vec<String> {
        let archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        names
    }

    fn read_entry(path: &Path, name: &str) -> String {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut text = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut text).unwrap();
        text
    }

    /// Namespace with every icon of `bundle` written as a tiny PNG.
    fn namespace_with_icons(bundle: &SiteAssetBundle) -> TempDir {
        let tmp = TempDir::new().unwrap();
        let icons = tmp.path().join(ICONS_DIR);
        std::fs::create_dir_all(&icons).unwrap();
        if let Some(catalog) = &bundle.icons {
            for icon in catalog.all() {
                write_png(&icons.join(&icon.file_name), 4, 4);
            }
        }
        tmp
    }

    #[test]
    fn bundle_without_icons_omits_icon_section() {
        let bundle = sample_bundle(ID, false);
        let set = ArtifactSet::from_bundle(&bundle, Path::new("/unused"));
        assert!(set
            .entries()
            .iter()
            .all(|a| !a.archive_path.starts_with("icons/")));
        // README + guide + 7 artifacts with 7 guides
        assert_eq!(set.len(), 16);
    }

    #[test]
    fn bundle_with_icons_reads_icons_from_disk() {
        let bundle = sample_bundle(ID, true);
        let set = ArtifactSet::from_bundle(&bundle, Path::new("/ns"));
        let icon = set
            .entries()
            .iter()
            .find(|a| a.archive_path == "icons/favicon-32x32.png")
            .unwrap();
        assert_eq!(
            icon.source,
            ArtifactSource::Disk(PathBuf::from("/ns/icons/favicon-32x32.png"))
        );
        assert!(set
            .entries()
            .iter()
            .any(|a| a.archive_path == "icons/ICONS-GUIDE.txt"));
        assert!(set
            .entries()
            .iter()
            .any(|a| a.archive_path == "config/webmanifest-guide.txt"));
    }

    #[tokio::test]
    async fn archive_has_expected_layout() {
        let bundle = sample_bundle(ID, true);
        let ns = namespace_with_icons(&bundle);
        let out = ns.path().join("out.zip");

        let set = ArtifactSet::from_bundle(&bundle, ns.path());
        let written = package_archive(set, &out).await.unwrap();
        assert_eq!(written, out);
        assert!(!partial_path(&out).exists());

        let names = names(&out);
        for expected in [
            "README.md",
            "IMPLEMENTATION-GUIDE.md",
            "html/complete.html",
            "html/meta-tags.html",
            "html/meta-tags-guide.txt",
            "html/opengraph-tags.html",
            "html/twitter-tags.html",
            "config/structured-data.json",
            "config/robots.txt",
            "config/sitemap.xml",
            "config/site.webmanifest",
            "config/browserconfig.xml",
            "icons/favicon-32x32.png",
            "icons/favicon.ico",
            "icons/og-image.png",
            "icons/ICONS-GUIDE.txt",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
        assert_eq!(read_entry(&out, "config/sitemap.xml"), bundle.sitemap_xml);
    }

    #[tokio::test]
    async fn missing_icon_fails_and_leaves_no_file() {
        let bundle = sample_bundle(ID, true);
        let ns = TempDir::new().unwrap();
        let out = ns.path().join("out.zip");

        let set = ArtifactSet::from_bundle(&bundle, ns.path());
        let err = package_archive(set, &out).await.unwrap_err();
        assert!(matches!(err, PackageError::MissingSource(_)));
        assert!(!out.exists());
        assert!(!partial_path(&out).exists());
    }

    #[tokio::test]
    async fn from_namespace_prefers_files_on_disk() {
        let mut bundle = sample_bundle(ID, true);
        let ns = namespace_with_icons(&bundle);
        persist(&mut bundle, ns.path()).await;
        std::fs::write(ns.path().join("robots.txt"), "edited on disk\n").unwrap();

        let set = ArtifactSet::from_namespace(ns.path()).await.unwrap();
        let out = ns.path().join("temp.zip");
        package_archive(set, &out).await.unwrap();

        assert_eq!(read_entry(&out, "config/robots.txt"), "edited on disk\n");
        assert!(names(&out).iter().any(|n| n == "icons/og-image.png"));
    }

    #[tokio::test]
    async fn from_namespace_without_bundle_is_io_error() {
        let ns = TempDir::new().unwrap();
        assert!(matches!(
            ArtifactSet::from_namespace(ns.path()).await,
            Err(PackageError::Io(_))
        ));
    }

    #[test]
    fn partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("/t/seo-assets-x.zip")),
            PathBuf::from("/t/seo-assets-x.zip.partial")
        );
    }
}
