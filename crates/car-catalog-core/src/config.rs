use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Upper bound on concurrent renders when `threads` is left on auto
pub const MAX_RENDER_WORKERS: usize = 8;

/// Geometry applied to the primary rendition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SizePolicy {
    /// Keep the source geometry, only convert the format
    #[default]
    Original,

    /// Shrink to fit the box, then pad with white to exactly this size
    Fit { width: u32, height: u32 },
}

impl SizePolicy {
    /// The enumerated set offered by the command surface
    pub const PRESETS: [SizePolicy; 5] = [
        SizePolicy::Original,
        SizePolicy::Fit { width: 250, height: 150 },
        SizePolicy::Fit { width: 512, height: 512 },
        SizePolicy::Fit { width: 1200, height: 800 },
        SizePolicy::Fit { width: 1280, height: 1920 },
    ];

    pub fn is_preset(&self) -> bool {
        Self::PRESETS.contains(self)
    }
}

impl FromStr for SizePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("original") {
            return Ok(Self::Original);
        }

        let (w, h) = s
            .split_once(|c: char| c == 'x' || c == 'X')
            .ok_or_else(|| Error::InvalidSizePolicy(s.to_string()))?;
        let width: u32 = w
            .parse()
            .map_err(|_| Error::InvalidSizePolicy(s.to_string()))?;
        let height: u32 = h
            .parse()
            .map_err(|_| Error::InvalidSizePolicy(s.to_string()))?;

        if width == 0 || height == 0 {
            return Err(Error::InvalidSizePolicy(s.to_string()));
        }

        Ok(Self::Fit { width, height })
    }
}

impl fmt::Display for SizePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original => f.write_str("original"),
            Self::Fit { width, height } => write!(f, "{}x{}", width, height),
        }
    }
}

impl TryFrom<String> for SizePolicy {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SizePolicy> for String {
    fn from(value: SizePolicy) -> Self {
        value.to_string()
    }
}

/// A rendering provider in the priority chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RendererKind {
    /// In-process decode/resize/encode
    Native,

    /// ImageMagick-compatible executable (`magick`, or the legacy `convert`)
    Magick { program: String },
}

/// Public URL prefixes written into catalog records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlConfig {
    /// Prefix of the API resource URL (`url`)
    pub api_base: String,

    /// Prefix of the static primary rendition (`direct_url`)
    pub image_base: String,

    /// Prefix of the static thumbnail (`thumbnail_url`)
    pub thumbnail_base: String,
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            api_base: "/api/cars".to_string(),
            image_base: "/images/cars".to_string(),
            thumbnail_base: "/images/thumbnails".to_string(),
        }
    }
}

/// Connection settings for the relational store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub database: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            database: "cars.db".to_string(),
        }
    }
}

impl StoreConfig {
    /// Read `DB_HOST`, `DB_PORT`, `DB_USER` and `DB_NAME`, loading `.env` first
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let port = match lookup("DB_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Configuration(format!("DB_PORT is not a port: {}", raw)))?,
            None => defaults.port,
        };

        Ok(Self {
            host: lookup("DB_HOST").unwrap_or(defaults.host),
            port,
            user: lookup("DB_USER").unwrap_or(defaults.user),
            database: lookup("DB_NAME").unwrap_or(defaults.database),
        })
    }

    /// Human-readable target used in diagnostics
    pub fn describe(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

/// Log level for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Configuration for an ingestion or retraction run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory tree holding the source photographs
    pub source_root: PathBuf,

    /// Where primary renditions are written
    pub output_dir: PathBuf,

    /// Where thumbnails are written
    pub thumbnail_dir: PathBuf,

    /// Published catalog document
    pub catalog_path: PathBuf,

    /// URL prefixes for catalog records
    pub urls: UrlConfig,

    /// Geometry of the primary rendition
    pub size_policy: SizePolicy,

    /// Edge length of the square thumbnail
    pub thumbnail_size: u32,

    /// WebP quality of the primary rendition (0-100)
    pub quality: f32,

    /// WebP quality of the thumbnail (0-100)
    pub thumbnail_quality: f32,

    /// Accepted input extensions, compared case-insensitively
    pub accepted_extensions: Vec<String>,

    /// Rendering providers in priority order
    pub renderers: Vec<RendererKind>,

    /// Fail the file instead of falling back to a raw copy
    pub strict_render: bool,

    /// Number of worker threads (0 = auto)
    pub threads: usize,

    /// Whether to draw a progress bar
    pub show_progress: bool,

    /// Relational store connection
    pub store: StoreConfig,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("source_images"),
            output_dir: PathBuf::from("public/images/cars"),
            thumbnail_dir: PathBuf::from("public/images/thumbnails"),
            catalog_path: PathBuf::from("public/images.json"),
            urls: UrlConfig::default(),
            size_policy: SizePolicy::Original,
            thumbnail_size: 300,
            quality: 85.0,
            thumbnail_quality: 80.0,
            accepted_extensions: ["jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            renderers: vec![
                RendererKind::Native,
                RendererKind::Magick {
                    program: "magick".to_string(),
                },
                RendererKind::Magick {
                    program: "convert".to_string(),
                },
            ],
            strict_render: false,
            threads: 0, // Auto
            show_progress: true,
            store: StoreConfig::default(),
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Save configuration as pretty JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Replace the store settings with those found in the environment
    pub fn with_env_store(mut self) -> Result<Self> {
        self.store = StoreConfig::from_env()?;
        Ok(self)
    }

    /// Effective worker count, bounded so external renderers are not flooded
    pub fn worker_count(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get().clamp(1, MAX_RENDER_WORKERS)
        } else {
            self.threads
        }
    }

    /// True when `path` carries one of the accepted extensions
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.accepted_extensions
                    .iter()
                    .any(|accepted| accepted.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    /// Reject inconsistent settings before any work starts
    pub fn validate(&self) -> Result<()> {
        if self.output_dir == self.thumbnail_dir {
            return Err(Error::Configuration(
                "output_dir and thumbnail_dir must differ".to_string(),
            ));
        }
        if self.thumbnail_size == 0 {
            return Err(Error::Configuration(
                "thumbnail_size must be positive".to_string(),
            ));
        }
        for quality in [self.quality, self.thumbnail_quality] {
            if !(0.0..=100.0).contains(&quality) {
                return Err(Error::Configuration(format!(
                    "quality {} is outside 0-100",
                    quality
                )));
            }
        }
        if self.accepted_extensions.is_empty() {
            return Err(Error::Configuration(
                "accepted_extensions must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
