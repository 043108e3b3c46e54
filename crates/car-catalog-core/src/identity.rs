//! Content fingerprints and the fingerprint → identifier table.
//!
//! Identifiers are never stored by this module between runs. The table is
//! rebuilt at the start of every run from the published catalog, so the
//! mapping survives exactly as long as the catalog does.

use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Mutex;

use crate::catalog::read_catalog;
use crate::error::Result;
use crate::types::{AssetIdentifier, ContentFingerprint};

/// Compute the blake3 fingerprint of a file's bytes
pub fn compute_fingerprint<P: AsRef<Path>>(path: P) -> Result<ContentFingerprint> {
    let mut file = File::open(&path)?;
    let mut hasher = blake3::Hasher::new();

    let mut buffer = [0; 8192]; // 8KB buffer
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(ContentFingerprint::from_hash(hasher.finalize()))
}

/// Identity assigned to one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub fingerprint: ContentFingerprint,
    pub id: AssetIdentifier,

    /// False when an earlier file in this run already carried the fingerprint
    pub first_in_run: bool,
}

#[derive(Debug, Default)]
struct TableState {
    known: HashMap<ContentFingerprint, AssetIdentifier>,
    seen_this_run: HashSet<ContentFingerprint>,
}

/// Append-only fingerprint → identifier mapping shared by all workers
#[derive(Debug, Default)]
pub struct IdentityTable {
    state: Mutex<TableState>,
}

impl IdentityTable {
    /// Empty table; every fingerprint will mint a new identifier
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the table from the catalog at `catalog_path`.
    ///
    /// Fails open: a missing or unreadable catalog yields an empty table.
    pub fn recover(catalog_path: &Path) -> Self {
        let catalog = match read_catalog(catalog_path) {
            Ok(Some(catalog)) => catalog,
            Ok(None) => {
                debug!("No catalog at {}, starting with empty identity table", catalog_path.display());
                return Self::new();
            }
            Err(e) => {
                warn!(
                    "Catalog {} unreadable, starting with empty identity table: {}",
                    catalog_path.display(),
                    e
                );
                return Self::new();
            }
        };

        let mut known = HashMap::with_capacity(catalog.images.len());
        for record in catalog.images {
            known.entry(record.hash).or_insert(record.id);
        }
        debug!("Recovered {} identifiers from {}", known.len(), catalog_path.display());

        Self {
            state: Mutex::new(TableState {
                known,
                seen_this_run: HashSet::new(),
            }),
        }
    }

    /// Number of known fingerprints
    pub fn len(&self) -> usize {
        self.lock().known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up or mint the identifier for a fingerprint.
    ///
    /// Serialized so two workers holding identical content cannot mint two ids.
    pub fn assign(&self, fingerprint: ContentFingerprint) -> Resolution {
        let mut state = self.lock();
        let id = state
            .known
            .entry(fingerprint.clone())
            .or_insert_with(AssetIdentifier::generate)
            .clone();
        let first_in_run = state.seen_this_run.insert(fingerprint.clone());

        Resolution {
            fingerprint,
            id,
            first_in_run,
        }
    }

    /// Hash `path` and resolve it to an identifier
    pub fn resolve(&self, path: &Path) -> Result<Resolution> {
        let fingerprint = compute_fingerprint(path)?;
        Ok(self.assign(fingerprint))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TableState> {
        // The table only ever grows, so a poisoned guard still holds valid data
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogWriter;
    use crate::types::CatalogRecord;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn record(id: &str, hash: &str) -> CatalogRecord {
        CatalogRecord {
            id: AssetIdentifier::from(id),
            original_name: "Civic.jpg".to_string(),
            filename: format!("{}.webp", id),
            extension: "webp".to_string(),
            url: format!("/api/cars/{}", id),
            direct_url: format!("/images/cars/{}.webp", id),
            thumbnail_url: format!("/images/thumbnails/{}.webp", id),
            hash: ContentFingerprint::from(hash.to_string()),
            folder: "Honda".to_string(),
        }
    }

    #[test]
    fn test_fingerprint_matches_blake3() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, b"car bytes").unwrap();

        let fingerprint = compute_fingerprint(&path).unwrap();
        assert_eq!(fingerprint.as_str(), blake3::hash(b"car bytes").to_hex().as_str());
        assert_eq!(fingerprint.as_str().len(), 64);
    }

    #[test]
    fn test_identical_bytes_share_identifier() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.jpg");
        let b = dir.path().join("b.png");
        std::fs::write(&a, b"same").unwrap();
        std::fs::write(&b, b"same").unwrap();

        let table = IdentityTable::new();
        let first = table.resolve(&a).unwrap();
        let second = table.resolve(&b).unwrap();

        assert_eq!(first.id, second.id);
        assert!(first.first_in_run);
        assert!(!second.first_in_run);
    }

    #[test]
    fn test_recover_reuses_catalog_identifiers() {
        let dir = tempdir().unwrap();
        let catalog_path = dir.path().join("images.json");
        CatalogWriter::new(&catalog_path)
            .write(vec![record("feedface", "aa"), record("cafebabe", "bb")])
            .unwrap();

        let table = IdentityTable::recover(&catalog_path);
        assert_eq!(table.len(), 2);

        let resolution = table.assign(ContentFingerprint::from("bb".to_string()));
        assert_eq!(resolution.id.as_str(), "cafebabe");
        assert!(resolution.first_in_run);
    }

    #[test]
    fn test_recover_fails_open() {
        let dir = tempdir().unwrap();
        let missing = IdentityTable::recover(&dir.path().join("missing.json"));
        assert!(missing.is_empty());

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, b"{ not json").unwrap();
        assert!(IdentityTable::recover(&garbage).is_empty());
    }

    #[test]
    fn test_concurrent_assign_mints_one_identifier() {
        let table = Arc::new(IdentityTable::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = Arc::clone(&table);
                std::thread::spawn(move || table.assign(ContentFingerprint::from("dup".to_string())))
            })
            .collect();

        let resolutions: Vec<Resolution> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(resolutions.iter().all(|r| r.id == resolutions[0].id));
        assert_eq!(resolutions.iter().filter(|r| r.first_in_run).count(), 1);
    }
}
