mod sqlite;
mod sync;

pub use sqlite::SqliteStore;
pub use sync::{parse_car_name, project, ParsedName, StoreSynchronizer};

use crate::error::Result;
use crate::types::{AssetIdentifier, StoreRow};

/// Relational table holding one row per cataloged car photograph
pub const CARS_TABLE: &str = "cars";

/// Capability interface over the relational store
pub trait CatalogStore {
    /// Round-trip to confirm the store answers
    fn ping(&self) -> Result<()>;

    /// Create the table if it does not exist
    fn ensure_schema(&self) -> Result<()>;

    /// Insert `row`, or overwrite Model/Year/URL of the existing row with the same ID.
    ///
    /// Make and ID are never changed once inserted.
    fn upsert(&self, row: &StoreRow) -> Result<()>;

    /// Delete the row with `id`, returning whether one existed
    fn delete_one(&self, id: &AssetIdentifier) -> Result<bool>;

    /// Delete every row, returning the number removed
    fn delete_all(&self) -> Result<usize>;

    /// Fetch the row with `id`
    fn fetch(&self, id: &AssetIdentifier) -> Result<Option<StoreRow>>;

    /// Number of rows in the table
    fn count(&self) -> Result<usize>;
}
