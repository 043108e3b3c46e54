//! Core functionality for importing car photographs into a published catalog.
//!
//! This library provides the components of an ingestion run:
//! - Source discovery and content fingerprinting
//! - Primary rendition and thumbnail rendering
//! - Catalog publication and relational store synchronization
//! - Retraction of one or all assets

// -- External Dependencies --
use log::{info, warn};
use std::path::Path;

// -- Internal Modules --
mod error;
mod utils;

// -- Public Re-exports --
pub use catalog::{read_catalog, CatalogWriter};
pub use config::*;
pub use error::{Error, Result};
pub use retract::{PurgeSummary, RetractionManager, CONFIRMATION_TOKEN};
pub use store::{CatalogStore, SqliteStore, StoreSynchronizer};
pub use types::*;

// -- Public Modules --
pub mod catalog;
pub mod config;
pub mod discovery;
pub mod identity;
pub mod logging;
pub mod pipeline;
pub mod render;
pub mod retract;
pub mod store;
pub mod types;

use pipeline::IngestionPipeline;
use render::TransformEngine;

/// Main entry point for ingestion and retraction runs
pub struct CarCatalog {
    config: Config,
    engine: TransformEngine,
}

impl CarCatalog {
    /// Validate the configuration and probe the renderer chain
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let engine = TransformEngine::from_config(&config);
        info!("Renderer chain: {:?}", engine.renderer_names());
        Ok(Self { config, engine })
    }

    /// Use an explicit transform engine
    pub fn with_engine(config: Config, engine: TransformEngine) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, engine })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open the configured store, failing with `StoreUnavailable`
    pub fn connect_store(&self) -> Result<SqliteStore> {
        SqliteStore::connect(&self.config.store)
    }

    /// Run a full ingestion against the configured store.
    ///
    /// The source root and the store are both checked before any file is touched.
    pub fn process(&self, source_root: &Path, policy: SizePolicy) -> Result<ProcessSummary> {
        if !source_root.is_dir() {
            return Err(Error::SourceMissing(source_root.to_path_buf()));
        }
        let store = self.connect_store()?;
        self.process_with_store(&store, source_root, policy)
    }

    /// Ingest `source_root`, publish the catalog and sync it into `store`
    pub fn process_with_store(
        &self,
        store: &dyn CatalogStore,
        source_root: &Path,
        policy: SizePolicy,
    ) -> Result<ProcessSummary> {
        info!("Processing {} with size policy {}", source_root.display(), policy);

        let ingestion = IngestionPipeline::new(&self.config, &self.engine).run(source_root, policy)?;

        let mut summary = ProcessSummary {
            discovered: ingestion.discovered,
            processed: ingestion.records.len(),
            failed: ingestion.failed,
            ..ProcessSummary::default()
        };

        if ingestion.records.is_empty() {
            info!("Nothing to publish");
            return Ok(summary);
        }

        let catalog = CatalogWriter::new(&self.config.catalog_path).write(ingestion.records)?;
        summary.cataloged = catalog.total;

        let report = StoreSynchronizer::new(store).sync(&catalog)?;
        if report.is_degraded() {
            warn!("{} rows failed to sync", report.failures.len());
        }
        summary.sync = Some(report);

        Ok(summary)
    }

    /// Retract every asset; `confirmation` must equal [`CONFIRMATION_TOKEN`]
    pub fn delete_all(&self, store: &dyn CatalogStore, confirmation: &str) -> Result<PurgeSummary> {
        RetractionManager::new(&self.config, store).retract_all(confirmation)
    }

    /// Retract one asset from every location
    pub fn delete_one(
        &self,
        store: &dyn CatalogStore,
        id: &AssetIdentifier,
    ) -> Result<RetractionReport> {
        RetractionManager::new(&self.config, store).retract_one(id)
    }
}
