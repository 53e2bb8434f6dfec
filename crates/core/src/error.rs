//! Error types for deck generation and feed synchronization.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading tables, building a deck, or syncing feeds.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write a local file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The Config table does not exist.
    #[error("Config table '{0}' not found. Create a Config table with Setting and Value columns")]
    ConfigSheetMissing(String),

    /// The Slides table does not exist.
    #[error("Slides table '{0}' not found")]
    SlidesSheetMissing(String),

    /// A column every slide needs is absent from the header row.
    #[error("Required column '{column}' not found in Slides table. Found: {}", found.join(", "))]
    MissingRequiredColumn { column: String, found: Vec<String> },

    /// The Slides table has a header but no data rows.
    #[error("Slides table appears to be empty")]
    EmptySlideTable,

    /// An `order` cell could not be read as a number.
    #[error("Slide row {row} has a non-numeric order value '{value}'")]
    InvalidSlideOrder { row: usize, value: String },

    /// Reading or writing a named table failed.
    #[error("Table store error: {0}")]
    TableError(String),

    /// The document sink rejected an operation.
    #[error("Document error: {0}")]
    DocumentError(String),

    /// A text or paragraph style could not be applied.
    #[error("Style error: {0}")]
    StyleError(String),

    /// An asset could not be located, read or decoded.
    #[error("Asset error: {0}")]
    AssetError(String),

    /// A single HTTP request failed.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Every fetch attempt failed.
    #[error("Failed after {attempts} attempts: {last_error}")]
    FetchExhausted { attempts: u32, last_error: String },

    /// A remote feed could not be interpreted as a table.
    #[error("Malformed feed: {0}")]
    FeedError(String),

    /// The remote version descriptor is not valid JSON of the expected shape.
    #[error("Invalid version descriptor: {0}")]
    VersionError(String),

    /// Backup copies could not be created; live tables were not touched.
    #[error("Backup failed: {0}")]
    BackupError(String),

    /// Durable key/value storage failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// ZIP package error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML error (for PPTX).
    #[error("XML error: {0}")]
    XmlError(String),
}

impl Error {
    /// Whether this error aborts a run before any document exists.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Error::ConfigSheetMissing(_)
                | Error::SlidesSheetMissing(_)
                | Error::MissingRequiredColumn { .. }
                | Error::EmptySlideTable
                | Error::InvalidSlideOrder { .. }
        )
    }
}
