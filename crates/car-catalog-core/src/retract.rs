use log::{info, warn};
use std::path::Path;
use walkdir::WalkDir;

use crate::catalog::CatalogWriter;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::{log_file_error, log_fs_modification};
use crate::store::CatalogStore;
use crate::types::{AssetIdentifier, RetractionReport, StepOutcome};

/// Token the operator must type to confirm a full retraction
pub const CONFIRMATION_TOKEN: &str = "DELETE";

/// Counts from a full retraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    pub primaries_removed: usize,
    pub thumbnails_removed: usize,
    pub catalog_removed: bool,
    pub rows_removed: usize,

    /// Files that could not be deleted
    pub failures: usize,
}

/// Removes assets from the output directories, the catalog and the store
pub struct RetractionManager<'a> {
    config: &'a Config,
    store: &'a dyn CatalogStore,
}

impl<'a> RetractionManager<'a> {
    pub fn new(config: &'a Config, store: &'a dyn CatalogStore) -> Self {
        Self { config, store }
    }

    /// Delete every rendition, the catalog and every store row.
    ///
    /// Nothing is touched unless `confirmation` equals [`CONFIRMATION_TOKEN`].
    pub fn retract_all(&self, confirmation: &str) -> Result<PurgeSummary> {
        if confirmation != CONFIRMATION_TOKEN {
            return Err(Error::ConfirmationRejected);
        }

        let mut summary = PurgeSummary::default();

        let (removed, failed) = purge_files(&self.config.output_dir);
        summary.primaries_removed = removed;
        summary.failures += failed;

        let (removed, failed) = purge_files(&self.config.thumbnail_dir);
        summary.thumbnails_removed = removed;
        summary.failures += failed;

        summary.catalog_removed = CatalogWriter::new(&self.config.catalog_path).delete()?;

        self.store.ensure_schema()?;
        summary.rows_removed = self.store.delete_all()?;

        info!(
            "Retracted everything: {} primaries, {} thumbnails, catalog removed: {}, {} rows",
            summary.primaries_removed,
            summary.thumbnails_removed,
            summary.catalog_removed,
            summary.rows_removed
        );
        Ok(summary)
    }

    /// Remove one asset everywhere; each location is handled independently.
    ///
    /// Fails with `InvalidIdentifier` before touching anything when `id` is
    /// not a well-formed identifier.
    pub fn retract_one(&self, id: &AssetIdentifier) -> Result<RetractionReport> {
        if !id.is_well_formed() {
            return Err(Error::InvalidIdentifier(id.to_string()));
        }
        let file_name = id.output_file_name();

        let report = RetractionReport {
            primary: remove_file(&self.config.output_dir.join(&file_name)),
            thumbnail: remove_file(&self.config.thumbnail_dir.join(&file_name)),
            catalog: self.remove_from_catalog(id),
            store: self.remove_from_store(id),
        };

        info!("Retraction of {}: {:?}", id, report);
        Ok(report)
    }

    fn remove_from_catalog(&self, id: &AssetIdentifier) -> StepOutcome {
        match CatalogWriter::new(&self.config.catalog_path).remove_record(id) {
            Ok(_) => StepOutcome::Removed,
            Err(Error::NotFound(what)) => {
                info!("Nothing to remove from catalog: {} not found", what);
                StepOutcome::Absent
            }
            Err(e) => {
                warn!("Failed to remove {} from catalog: {}", id, e);
                StepOutcome::Failed(e.to_string())
            }
        }
    }

    fn remove_from_store(&self, id: &AssetIdentifier) -> StepOutcome {
        match self.store.ensure_schema().and_then(|_| self.store.delete_one(id)) {
            Ok(true) => StepOutcome::Removed,
            Ok(false) => {
                info!("No store row for {}", id);
                StepOutcome::Absent
            }
            Err(e) => {
                warn!("Failed to remove {} from store: {}", id, e);
                StepOutcome::Failed(e.to_string())
            }
        }
    }
}

fn remove_file(path: &Path) -> StepOutcome {
    match std::fs::remove_file(path) {
        Ok(()) => {
            log_fs_modification("delete", path, None);
            StepOutcome::Removed
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("Nothing to delete at {}", path.display());
            StepOutcome::Absent
        }
        Err(e) => {
            log_file_error(path, "delete", &e);
            StepOutcome::Failed(e.to_string())
        }
    }
}

/// Delete every file below `root`, keeping the directories; returns (removed, failed)
fn purge_files(root: &Path) -> (usize, usize) {
    if !root.is_dir() {
        info!("Nothing to purge, {} does not exist", root.display());
        return (0, 0);
    }

    let mut removed = 0;
    let mut failed = 0;
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cannot read entry under {}: {}", root.display(), e);
                failed += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match std::fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => {
                log_file_error(entry.path(), "purge", &e);
                failed += 1;
            }
        }
    }

    log_fs_modification("purge", root, Some(&format!("{} files", removed)));
    (removed, failed)
}
