//! Service configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! serialized to a TOML table and the user file is merged on top of it, so a
//! config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [sessions]
//! root = "sessions"          # Parent directory of every session namespace
//! ttl_secs = 7200            # Namespaces older than this are reclaimed
//! sweep_interval_secs = 900  # How often the reclaimer runs
//!
//! [icons]
//! legacy_size = 32           # Pixel size rendered into favicon.ico
//! # variants = [...]         # Fixed square catalog, see stock_config_toml()
//!
//! [social]
//! width = 1200
//! height = 630
//! background = "#ffffff"     # Opaque canvas behind the logo
//! max_fill = 0.8             # Largest share of the canvas the logo may cover
//!
//! [webapp]
//! display = "standalone"
//! theme_color = "#ffffff"
//! background_color = "#ffffff"
//! tile_color = "#2b5797"
//!
//! [uploads]
//! max_bytes = 5242880
//! allowed_types = ["image/jpeg", "image/png", "image/svg+xml"]
//!
//! [credits]
//! enhance_cost = 1
//!
//! [enhance]
//! endpoint = "https://api.openai.com/v1/chat/completions"
//! model = "gpt-4o-mini"
//! api_key_env = "OPENAI_API_KEY"
//! timeout_secs = 30
//! max_tokens = 200
//!
//! [processing]
//! max_processes = 4          # Max rasterizer threads (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::types::IconGroup;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Service configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForgeConfig {
    /// Session namespace location and lifetime.
    pub sessions: SessionsConfig,
    /// Fixed square icon catalog.
    pub icons: IconsConfig,
    /// Social-preview image settings.
    pub social: SocialConfig,
    /// Installable web-app and tile descriptor settings.
    pub webapp: WebAppConfig,
    /// Upload allow-list and size ceiling.
    pub uploads: UploadConfig,
    /// Credit prices.
    pub credits: CreditsConfig,
    /// External text-enhancement endpoint.
    pub enhance: EnhanceConfig,
    /// Parallel rasterization settings.
    pub processing: ProcessingConfig,
}

impl ForgeConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sessions.ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "sessions.ttl_secs must be non-zero".into(),
            ));
        }
        if self.sessions.sweep_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "sessions.sweep_interval_secs must be non-zero".into(),
            ));
        }
        if self.icons.variants.is_empty() {
            return Err(ConfigError::Validation(
                "icons.variants must not be empty".into(),
            ));
        }
        let mut names = HashSet::new();
        for variant in &self.icons.variants {
            if variant.size == 0 || variant.size > 1024 {
                return Err(ConfigError::Validation(format!(
                    "icons.variants: size of '{}' must be 1-1024",
                    variant.name
                )));
            }
            if !is_file_stem(&variant.name) {
                return Err(ConfigError::Validation(format!(
                    "icons.variants: '{}' is not a valid file name",
                    variant.name
                )));
            }
            if !names.insert(variant.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "icons.variants: duplicate name '{}'",
                    variant.name
                )));
            }
        }
        if self.icons.legacy_size == 0 || self.icons.legacy_size > 256 {
            return Err(ConfigError::Validation(
                "icons.legacy_size must be 1-256".into(),
            ));
        }
        if self.social.width == 0 || self.social.height == 0 {
            return Err(ConfigError::Validation(
                "social.width and social.height must be non-zero".into(),
            ));
        }
        if !(self.social.max_fill > 0.0 && self.social.max_fill <= 1.0) {
            return Err(ConfigError::Validation(
                "social.max_fill must be in (0, 1]".into(),
            ));
        }
        for (key, value) in [
            ("social.background", &self.social.background),
            ("webapp.theme_color", &self.webapp.theme_color),
            ("webapp.background_color", &self.webapp.background_color),
            ("webapp.tile_color", &self.webapp.tile_color),
        ] {
            if parse_hex_color(value).is_none() {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a #rrggbb color, got '{value}'"
                )));
            }
        }
        if self.uploads.allowed_types.is_empty() {
            return Err(ConfigError::Validation(
                "uploads.allowed_types must not be empty".into(),
            ));
        }
        if self.enhance.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "enhance.timeout_secs must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

fn is_file_stem(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Parse `#rrggbb` into RGB components.
pub fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Session namespace settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionsConfig {
    /// Directory holding one sub-directory per live session.
    pub root: PathBuf,
    /// Maximum namespace age before the reclaimer removes it.
    pub ttl_secs: u64,
    /// Interval between reclamation sweeps.
    pub sweep_interval_secs: u64,
}

impl SessionsConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("sessions"),
            ttl_secs: 2 * 60 * 60,
            sweep_interval_secs: 15 * 60,
        }
    }
}

/// One square icon in the fixed catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IconVariant {
    /// File stem; the PNG is written as `icons/<name>.png`.
    pub name: String,
    /// Edge length in pixels.
    pub size: u32,
    /// Where the icon is referenced from.
    pub group: IconGroup,
}

impl IconVariant {
    fn new(name: &str, size: u32, group: IconGroup) -> Self {
        Self {
            name: name.to_string(),
            size,
            group,
        }
    }
}

/// Square icon catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IconsConfig {
    /// Square variants rendered from the source logo, in catalog order.
    pub variants: Vec<IconVariant>,
    /// Edge length rendered into the legacy `favicon.ico`.
    pub legacy_size: u32,
}

impl Default for IconsConfig {
    fn default() -> Self {
        use IconGroup::*;
        Self {
            variants: vec![
                IconVariant::new("favicon-16x16", 16, Favicon),
                IconVariant::new("favicon-32x32", 32, Favicon),
                IconVariant::new("favicon-48x48", 48, Favicon),
                IconVariant::new("favicon-64x64", 64, Favicon),
                IconVariant::new("favicon-96x96", 96, Favicon),
                IconVariant::new("favicon-128x128", 128, Favicon),
                IconVariant::new("favicon-256x256", 256, Favicon),
                IconVariant::new("mstile-70x70", 70, Tile),
                IconVariant::new("mstile-144x144", 144, Tile),
                IconVariant::new("mstile-150x150", 150, Tile),
                IconVariant::new("mstile-310x310", 310, Tile),
                IconVariant::new("apple-touch-icon", 180, Touch),
                IconVariant::new("android-chrome-192x192", 192, Android),
                IconVariant::new("android-chrome-512x512", 512, Android),
            ],
            legacy_size: 32,
        }
    }
}

/// Social-preview (Open Graph) image settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SocialConfig {
    pub width: u32,
    pub height: u32,
    /// Opaque canvas color as `#rrggbb`.
    pub background: String,
    /// Largest fraction of each canvas edge the logo may occupy.
    pub max_fill: f32,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 630,
            background: "#ffffff".to_string(),
            max_fill: 0.8,
        }
    }
}

/// Web-app manifest and tile descriptor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebAppConfig {
    /// Manifest `display` mode.
    pub display: String,
    pub theme_color: String,
    pub background_color: String,
    /// `TileColor` in `browserconfig.xml`.
    pub tile_color: String,
}

impl Default for WebAppConfig {
    fn default() -> Self {
        Self {
            display: "standalone".to_string(),
            theme_color: "#ffffff".to_string(),
            background_color: "#ffffff".to_string(),
            tile_color: "#2b5797".to_string(),
        }
    }
}

/// Upload validation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Size ceiling in bytes.
    pub max_bytes: u64,
    /// Accepted MIME types.
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 5 * 1024 * 1024,
            allowed_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/svg+xml".to_string(),
            ],
        }
    }
}

/// Credit prices per action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreditsConfig {
    /// Credits debited for one description enhancement.
    pub enhance_cost: u32,
}

impl Default for CreditsConfig {
    fn default() -> Self {
        Self { enhance_cost: 1 }
    }
}

/// External text-enhancement endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnhanceConfig {
    /// OpenAI-compatible chat completions URL.
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30,
            max_tokens: 200,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of rasterizer threads.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ForgeConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config does not serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so a user
///   `icons.variants` array replaces the stock catalog rather than extending it.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ForgeConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ForgeConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
pub fn load_config(dir: &Path) -> Result<ForgeConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# seo-forge Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Sessions
# ---------------------------------------------------------------------------
[sessions]
# Parent directory of every per-request namespace.
root = "sessions"

# Namespaces last modified longer ago than this are removed (seconds).
ttl_secs = 7200

# How often the background reclaimer sweeps (seconds).
sweep_interval_secs = 900

# ---------------------------------------------------------------------------
# Icon catalog
# ---------------------------------------------------------------------------
[icons]
# Pixel size rendered into the legacy favicon.ico.
legacy_size = 32

# Square variants, rendered with transparent padding. Setting this key
# replaces the whole list. group is one of: favicon, touch, android, tile.
variants = [
    { name = "favicon-16x16", size = 16, group = "favicon" },
    { name = "favicon-32x32", size = 32, group = "favicon" },
    { name = "favicon-48x48", size = 48, group = "favicon" },
    { name = "favicon-64x64", size = 64, group = "favicon" },
    { name = "favicon-96x96", size = 96, group = "favicon" },
    { name = "favicon-128x128", size = 128, group = "favicon" },
    { name = "favicon-256x256", size = 256, group = "favicon" },
    { name = "mstile-70x70", size = 70, group = "tile" },
    { name = "mstile-144x144", size = 144, group = "tile" },
    { name = "mstile-150x150", size = 150, group = "tile" },
    { name = "mstile-310x310", size = 310, group = "tile" },
    { name = "apple-touch-icon", size = 180, group = "touch" },
    { name = "android-chrome-192x192", size = 192, group = "android" },
    { name = "android-chrome-512x512", size = 512, group = "android" },
]

# ---------------------------------------------------------------------------
# Social preview (og:image)
# ---------------------------------------------------------------------------
[social]
width = 1200
height = 630
# Opaque background behind the centered logo.
background = "#ffffff"
# Largest share of each canvas edge the logo may cover (0-1].
max_fill = 0.8

# ---------------------------------------------------------------------------
# Web app manifest / browserconfig
# ---------------------------------------------------------------------------
[webapp]
display = "standalone"
theme_color = "#ffffff"
background_color = "#ffffff"
tile_color = "#2b5797"

# ---------------------------------------------------------------------------
# Uploads
# ---------------------------------------------------------------------------
[uploads]
max_bytes = 5242880
allowed_types = ["image/jpeg", "image/png", "image/svg+xml"]

# ---------------------------------------------------------------------------
# Credits
# ---------------------------------------------------------------------------
[credits]
# Credits debited per description enhancement.
enhance_cost = 1

# ---------------------------------------------------------------------------
# Description enhancement (OpenAI-compatible chat completions)
# ---------------------------------------------------------------------------
[enhance]
endpoint = "https://api.openai.com/v1/chat/completions"
model = "gpt-4o-mini"
# Environment variable holding the API key.
api_key_env = "OPENAI_API_KEY"
timeout_secs = 30
max_tokens = 200

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum rasterizer threads.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
