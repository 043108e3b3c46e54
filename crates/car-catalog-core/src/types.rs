use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;

/// Category label used for files sitting directly in the source root
pub const ORPHAN_FOLDER: &str = "orphan";

/// Extension of every rendered output
pub const OUTPUT_EXTENSION: &str = "webp";

/// A file discovered under the source root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAsset {
    /// Full path to the source file
    pub path: PathBuf,

    /// Parent folder name, or `orphan` for files at the root
    pub folder: String,
}

impl SourceAsset {
    /// File name including its extension
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Hex-encoded blake3 digest of a file's bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    pub fn from_hash(hash: blake3::Hash) -> Self {
        Self(hash.to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ContentFingerprint {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque 128-bit identifier, assigned once per fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetIdentifier(String);

impl AssetIdentifier {
    /// Mint a fresh identifier from the thread-local CSPRNG
    pub fn generate() -> Self {
        Self(format!("{:032x}", rand::random::<u128>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Output file name shared by the primary rendition and the thumbnail
    pub fn output_file_name(&self) -> String {
        format!("{}.{}", self.0, OUTPUT_EXTENSION)
    }

    /// True for 32 lowercase hex digits, the only shape `generate` produces
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == 32
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

impl FromStr for AssetIdentifier {
    type Err = Error;

    /// Parse an operator-supplied identifier, rejecting anything that is not
    /// safe to use as an output file name
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let id = Self(raw.to_string());
        if !id.is_well_formed() {
            return Err(Error::InvalidIdentifier(raw.to_string()));
        }
        Ok(id)
    }
}

impl From<String> for AssetIdentifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AssetIdentifier {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for AssetIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One published catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: AssetIdentifier,
    pub original_name: String,
    pub filename: String,
    pub extension: String,
    pub url: String,
    pub direct_url: String,
    pub thumbnail_url: String,
    pub hash: ContentFingerprint,
    pub folder: String,
}

/// Records produced by one ingestion run, in discovery order
pub type RecordSet = Vec<CatalogRecord>;

/// The published JSON index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub images: Vec<CatalogRecord>,
    pub total: usize,
    pub generated_at: String,
}

impl Catalog {
    /// Build a catalog stamped with the current UTC time
    pub fn new(images: Vec<CatalogRecord>) -> Self {
        Self {
            total: images.len(),
            images,
            generated_at: chrono::Utc::now()
                .format("%Y-%m-%dT%H:%M:%SZ")
                .to_string(),
        }
    }
}

/// Relational projection of a catalog record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRow {
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub id: AssetIdentifier,
    pub url: String,
}

/// Outcome of pushing a catalog into the relational store
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Rows inserted or updated
    pub upserted: usize,

    /// Per-row failures, each an `Error::StoreRow`
    pub failures: Vec<Error>,
}

impl SyncReport {
    /// True when at least one row could not be written
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Result of one retraction step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Removed,
    Absent,
    Failed(String),
}

/// Per-location outcome of retracting a single asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetractionReport {
    pub primary: StepOutcome,
    pub thumbnail: StepOutcome,
    pub catalog: StepOutcome,
    pub store: StepOutcome,
}

impl RetractionReport {
    /// True when no location reported a failure
    pub fn is_clean(&self) -> bool {
        [&self.primary, &self.thumbnail, &self.catalog, &self.store]
            .iter()
            .all(|s| !matches!(s, StepOutcome::Failed(_)))
    }
}

/// Counts gathered over one `process` run
#[derive(Debug, Default)]
pub struct ProcessSummary {
    /// Files matching the extension allowlist
    pub discovered: usize,

    /// Files that produced a record
    pub processed: usize,

    /// Files isolated because of an error
    pub failed: usize,

    /// Records published after deduplication
    pub cataloged: usize,

    /// Store synchronization outcome, absent when nothing was published
    pub sync: Option<SyncReport>,
}
