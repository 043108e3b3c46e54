use log::info;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::logging::log_fs_modification;
use crate::types::{AssetIdentifier, Catalog, CatalogRecord};
use crate::utils::{set_public_permissions, write_atomic};

/// Read the catalog at `path`, `Ok(None)` when no file exists
pub fn read_catalog(path: &Path) -> Result<Option<Catalog>> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&raw)?))
}

/// Keep the first record per fingerprint, preserving input order
pub fn dedup_records(records: Vec<CatalogRecord>) -> Vec<CatalogRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.hash.clone()))
        .collect()
}

/// Publishes the catalog document by write-then-rename
#[derive(Debug, Clone)]
pub struct CatalogWriter {
    path: PathBuf,
}

impl CatalogWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deduplicate `records` and publish them as a fresh catalog
    pub fn write(&self, records: Vec<CatalogRecord>) -> Result<Catalog> {
        let received = records.len();
        let catalog = Catalog::new(dedup_records(records));
        if catalog.total < received {
            info!(
                "Dropped {} duplicate records before publishing",
                received - catalog.total
            );
        }
        self.publish(&catalog)?;
        Ok(catalog)
    }

    /// Replace the destination file with `catalog`
    pub fn publish(&self, catalog: &Catalog) -> Result<()> {
        let body = serde_json::to_vec_pretty(catalog)?;
        write_atomic(&self.path, &body)
            .and_then(|_| set_public_permissions(&self.path))
            .map_err(|source| Error::CatalogWrite {
                path: self.path.clone(),
                source,
            })?;

        log_fs_modification(
            "publish_catalog",
            &self.path,
            Some(&format!("{} records", catalog.total)),
        );
        Ok(())
    }

    /// Drop the record for `id` and republish.
    ///
    /// Returns `NotFound` when the catalog or the record is absent.
    pub fn remove_record(&self, id: &AssetIdentifier) -> Result<CatalogRecord> {
        let catalog = read_catalog(&self.path)?
            .ok_or_else(|| Error::NotFound(format!("catalog {}", self.path.display())))?;

        let (removed, kept): (Vec<_>, Vec<_>) =
            catalog.images.into_iter().partition(|record| &record.id == id);
        let removed = removed
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("catalog record {}", id)))?;

        self.publish(&Catalog::new(kept))?;
        Ok(removed)
    }

    /// Delete the catalog document, returning whether it existed
    pub fn delete(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                log_fs_modification("delete_catalog", &self.path, None);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
