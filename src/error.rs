//! Error types for nzb-scan
//!
//! One error enum for the whole crate. Variants carry the archive path and a
//! reason so failures in host logs can be traced back to the triggering file.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for nzb-scan operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for nzb-scan
#[derive(Debug, Error)]
pub enum Error {
    /// Required host environment variable is not set
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),

    /// Archive could not be opened (corrupt or unsupported contents)
    #[error("failed to open archive {archive}: {reason}")]
    ArchiveOpen {
        /// Path of the archive that failed to open
        archive: PathBuf,
        /// What the underlying archive library reported
        reason: String,
    },

    /// A member of an otherwise readable archive could not be extracted
    #[error("extraction failed for {archive}: {reason}")]
    ExtractionFailed {
        /// Path of the archive being extracted
        archive: PathBuf,
        /// What went wrong, including the member name where known
        reason: String,
    },

    /// Archive member path would escape the destination directory
    #[error("unsafe member path {name:?} in {archive}")]
    UnsafeMemberPath {
        /// Path of the archive carrying the unsafe member
        archive: PathBuf,
        /// The member name as stored in the archive
        name: String,
    },

    /// Metadata table (de)serialization error
    #[error("metadata serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
