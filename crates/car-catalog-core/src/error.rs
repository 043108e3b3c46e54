use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error types for the car-catalog library
#[derive(Error, Debug)]
pub enum Error {
    /// Source root does not exist or is not a directory
    #[error("Source directory missing: {0}")]
    SourceMissing(PathBuf),

    /// No rendering provider could produce the output
    #[error("No renderer available for {path}: {reason}")]
    RendererUnavailable { path: PathBuf, reason: String },

    /// A single provider failed to render a file
    #[error("Render error: {0}")]
    Render(String),

    /// Catalog document could not be published
    #[error("Failed to write catalog {path}: {source}")]
    CatalogWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Relational store could not be reached
    #[error("Store unavailable ({target}): {reason}")]
    StoreUnavailable { target: String, reason: String },

    /// A single row could not be written
    #[error("Store row {id} failed: {reason}")]
    StoreRow { id: String, reason: String },

    /// Identifier is not 32 lowercase hex digits
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Retraction target absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Full retraction was not confirmed with the expected token
    #[error("Confirmation rejected, nothing was deleted")]
    ConfirmationRejected,

    /// Size policy string could not be parsed
    #[error("Invalid size policy: {0}")]
    InvalidSizePolicy(String),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// I/O operation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding error
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Catalog (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Relational store error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}
