use log::{info, warn};
use std::path::Path;

use super::CatalogStore;
use crate::error::{Error, Result};
use crate::types::{Catalog, CatalogRecord, StoreRow, SyncReport};

/// Separates the model from the rest of the file stem
const NAME_SEPARATOR: char = '_';

/// Model and year recovered from an original file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub model: String,
    pub year: Option<i32>,
}

/// Split `Civic_2016_red.jpg` into model `Civic` and year `2016`.
///
/// The model is the stem up to the first `_`, reduced to ASCII alphanumerics.
/// The year is the first run of four digits after the separator, if any.
pub fn parse_car_name(original_name: &str) -> ParsedName {
    let stem = Path::new(original_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (model, fragment) = stem.split_once(NAME_SEPARATOR).unwrap_or((stem.as_str(), ""));

    ParsedName {
        model: model.chars().filter(char::is_ascii_alphanumeric).collect(),
        year: first_four_digits(fragment),
    }
}

fn first_four_digits(fragment: &str) -> Option<i32> {
    fragment
        .as_bytes()
        .windows(4)
        .find(|w| w.iter().all(u8::is_ascii_digit))
        .and_then(|w| std::str::from_utf8(w).ok())
        .and_then(|digits| digits.parse().ok())
}

/// Relational projection of a catalog record
pub fn project(record: &CatalogRecord) -> StoreRow {
    let parsed = parse_car_name(&record.original_name);
    StoreRow {
        make: record.folder.clone(),
        model: parsed.model,
        year: parsed.year,
        id: record.id.clone(),
        url: record.direct_url.clone(),
    }
}

/// Pushes catalog records into the relational store
pub struct StoreSynchronizer<'a> {
    store: &'a dyn CatalogStore,
}

impl<'a> StoreSynchronizer<'a> {
    pub fn new(store: &'a dyn CatalogStore) -> Self {
        Self { store }
    }

    /// Upsert every record; row failures are collected, not fatal
    pub fn sync(&self, catalog: &Catalog) -> Result<SyncReport> {
        self.store.ensure_schema()?;

        let mut report = SyncReport::default();
        for record in &catalog.images {
            let row = project(record);
            match self.store.upsert(&row) {
                Ok(()) => report.upserted += 1,
                Err(e) => {
                    warn!("Failed to upsert {} ({}): {}", record.id, record.original_name, e);
                    report.failures.push(Error::StoreRow {
                        id: record.id.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Store sync finished: {} upserted, {} failed",
            report.upserted,
            report.failures.len()
        );
        Ok(report)
    }
}
