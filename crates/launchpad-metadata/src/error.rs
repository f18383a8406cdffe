//! Error types for metadata operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or validating metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata directory does not exist.
    #[error("Metadata directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// Invalid format encountered.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}
