use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use std::path::Path;
use std::time::Instant;

use crate::config::{Config, SizePolicy, UrlConfig};
use crate::discovery::discover_sources;
use crate::error::{Error, Result};
use crate::identity::{IdentityTable, Resolution};
use crate::logging::log_hash_error;
use crate::render::TransformEngine;
use crate::types::{CatalogRecord, RecordSet, SourceAsset, OUTPUT_EXTENSION};

/// Records and counters produced by one ingestion run
#[derive(Debug, Clone, Default)]
pub struct Ingestion {
    /// One record per successfully processed file, in discovery order
    pub records: RecordSet,

    /// Files matching the extension allowlist
    pub discovered: usize,

    /// Files isolated because of an error
    pub failed: usize,
}

/// Per-file result before the sequential collection pass
struct Processed {
    record: CatalogRecord,

    /// Another file in this run already carried the same content
    duplicate: bool,
}

/// Walks the source tree and renders every accepted file
pub struct IngestionPipeline<'a> {
    config: &'a Config,
    engine: &'a TransformEngine,
}

impl<'a> IngestionPipeline<'a> {
    pub fn new(config: &'a Config, engine: &'a TransformEngine) -> Self {
        Self { config, engine }
    }

    /// Process every accepted file under `source_root`.
    ///
    /// Fails with `SourceMissing` when the root is not a directory. An empty
    /// tree is not an error and yields no records.
    pub fn run(&self, source_root: &Path, policy: SizePolicy) -> Result<Ingestion> {
        let assets = discover_sources(source_root, self.config)?;
        info!("Found {} source files in {}", assets.len(), source_root.display());

        if assets.is_empty() {
            return Ok(Ingestion::default());
        }

        let identities = IdentityTable::recover(&self.config.catalog_path);
        info!("Recovered {} known identifiers", identities.len());

        let start_time = Instant::now();
        let progress = self.progress_bar(assets.len());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_count())
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build thread pool: {}", e)))?;

        let results: Vec<Result<Processed>> = pool.install(|| {
            assets
                .par_iter()
                .map(|asset| {
                    let result = self.process_one(asset, &identities, policy);
                    progress.inc(1);
                    result
                })
                .collect()
        });

        let mut ingestion = Ingestion {
            discovered: assets.len(),
            ..Ingestion::default()
        };

        for (asset, result) in assets.iter().zip(results) {
            match result {
                Ok(processed) => {
                    let primary = self.engine.primary_path(&processed.record.id);
                    if processed.duplicate && !primary.exists() {
                        // The first copy of this content failed to render
                        warn!(
                            "Dropping {}: duplicate of content that has no rendition",
                            asset.path.display()
                        );
                        ingestion.failed += 1;
                        continue;
                    }
                    ingestion.records.push(processed.record);
                }
                Err(e) => {
                    error!("Failed to process {}: {}", asset.path.display(), e);
                    ingestion.failed += 1;
                }
            }
        }

        progress.finish_with_message(format!(
            "Processed {} files in {:.1?}",
            ingestion.discovered,
            start_time.elapsed()
        ));
        info!(
            "Ingestion finished: {} records, {} failures, {:.1?}",
            ingestion.records.len(),
            ingestion.failed,
            start_time.elapsed()
        );

        Ok(ingestion)
    }

    fn process_one(
        &self,
        asset: &SourceAsset,
        identities: &IdentityTable,
        policy: SizePolicy,
    ) -> Result<Processed> {
        let resolution = identities.resolve(&asset.path).map_err(|e| {
            log_hash_error(&asset.path, &e);
            e
        })?;

        if resolution.first_in_run {
            self.engine.render(&asset.path, &resolution.id, policy)?;
        } else {
            debug!(
                "{} duplicates content already handled as {}",
                asset.path.display(),
                resolution.id
            );
        }

        Ok(Processed {
            record: build_record(asset, &resolution, &self.config.urls),
            duplicate: !resolution.first_in_run,
        })
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{eta}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
        {
            progress.set_style(style.progress_chars("##-"));
        }
        progress.set_message("Rendering images...");
        progress
    }
}

/// Catalog record for `asset`, named after its identifier
pub fn build_record(asset: &SourceAsset, resolution: &Resolution, urls: &UrlConfig) -> CatalogRecord {
    let filename = resolution.id.output_file_name();
    CatalogRecord {
        id: resolution.id.clone(),
        original_name: asset.file_name(),
        url: join_url(&urls.api_base, resolution.id.as_str()),
        direct_url: join_url(&urls.image_base, &filename),
        thumbnail_url: join_url(&urls.thumbnail_base, &filename),
        filename,
        extension: OUTPUT_EXTENSION.to_string(),
        hash: resolution.fingerprint.clone(),
        folder: asset.folder.clone(),
    }
}

fn join_url(base: &str, tail: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssetIdentifier, ContentFingerprint};
    use std::path::PathBuf;

    #[test]
    fn test_build_record_derives_names_from_identifier() {
        let asset = SourceAsset {
            path: PathBuf::from("/src/Honda/Civic_2016_red.jpg"),
            folder: "Honda".to_string(),
        };
        let resolution = Resolution {
            fingerprint: ContentFingerprint::from("ff".to_string()),
            id: AssetIdentifier::from("0123"),
            first_in_run: true,
        };
        let urls = UrlConfig {
            api_base: "https://api.example.com/cars/".to_string(),
            ..UrlConfig::default()
        };

        let record = build_record(&asset, &resolution, &urls);
        assert_eq!(record.original_name, "Civic_2016_red.jpg");
        assert_eq!(record.filename, "0123.webp");
        assert_eq!(record.extension, "webp");
        assert_eq!(record.url, "https://api.example.com/cars/0123");
        assert_eq!(record.direct_url, "/images/cars/0123.webp");
        assert_eq!(record.thumbnail_url, "/images/thumbnails/0123.webp");
        assert_eq!(record.folder, "Honda");
        assert_eq!(record.hash.as_str(), "ff");
    }
}
