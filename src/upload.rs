//! Uploaded logo handed over by the HTTP layer.
//!
//! The caller owns the temporary file: it validates the upload before
//! `generate`, and calls [`Upload::discard`] once the request is done,
//! whatever the outcome.

use crate::config::UploadConfig;
use crate::session::SessionId;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File-name prefix of staged uploads. Sweeps ignore it.
pub const STAGED_PREFIX: &str = ".upload-";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UploadError {
    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },
    #[error("file type {0} is not accepted")]
    UnsupportedType(String),
    #[error("file is empty")]
    Empty,
}

/// A file received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub path: PathBuf,
    pub original_name: String,
    /// Declared MIME type.
    pub mime: String,
    pub size: u64,
}

impl Upload {
    /// Describe a file already on disk, guessing the MIME type from its name.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let size = std::fs::metadata(path)?.len();
        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self {
            mime: mime_for_name(&original_name).to_string(),
            path: path.to_path_buf(),
            original_name,
            size,
        })
    }

    /// Copy `source` into `dir` under a fresh private name, the way an HTTP
    /// layer receives a multipart file. Name and MIME come from `source`.
    pub async fn stage(source: &Path, dir: &Path) -> std::io::Result<Self> {
        let declared = Self::from_path(source)?;
        tokio::fs::create_dir_all(dir).await?;
        let staged = dir.join(format!("{STAGED_PREFIX}{}", SessionId::generate()));
        tokio::fs::copy(source, &staged).await?;
        Ok(Self {
            path: staged,
            ..declared
        })
    }

    /// Size and type checks against the configured limits.
    pub fn validate(&self, config: &UploadConfig) -> Result<(), UploadError> {
        if self.size == 0 {
            return Err(UploadError::Empty);
        }
        if self.size > config.max_bytes {
            return Err(UploadError::TooLarge {
                size: self.size,
                limit: config.max_bytes,
            });
        }
        let mime = self.mime.trim().to_ascii_lowercase();
        if !config.allowed_types.iter().any(|t| t.eq_ignore_ascii_case(&mime)) {
            return Err(UploadError::UnsupportedType(self.mime.clone()));
        }
        Ok(())
    }

    /// Delete the temporary file. A file that is already gone is not an error.
    pub async fn discard(&self) -> std::io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// MIME type for a file name, by extension.
pub fn mime_for_name(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
