//! App Store metadata management for Launchpad.
//!
//! This crate owns the in-memory [`MetadataBundle`] consumed by the
//! metadata-class delivery stages, the [`MetadataSource`] that loads it from
//! a fastlane-style directory layout, and the [`BundleValidator`] gate that
//! runs before anything is pushed to the store.

pub mod error;
pub mod source;
pub mod types;
pub mod validation;

pub use error::MetadataError;
pub use source::{FilesystemSource, MetadataSource};
pub use types::{
    limits, AppAssets, AppDetails, Dimensions, DisplayType, Locale, LocalizedMetadata,
    MetadataBundle, MetadataLocation, Screenshot,
};
pub use validation::{
    BundleValidator, Severity, StoreValidator, ValidationIssue, ValidationResult,
};

/// Result type alias for metadata operations.
pub type Result<T> = std::result::Result<T, MetadataError>;
