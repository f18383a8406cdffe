//! Error types for Launchpad

use launchpad_metadata::{MetadataError, ValidationIssue};
use launchpad_stores::StoreError;
use std::path::PathBuf;
use thiserror::Error;

use crate::workflow::{CommitState, RunReport, Stage};

/// Result type alias using LaunchpadError
pub type Result<T> = std::result::Result<T, LaunchpadError>;

/// Main error type for Launchpad operations
#[derive(Debug, Error)]
pub enum LaunchpadError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A delivery run failed
    #[error(transparent)]
    Pipeline(#[from] Box<PipelineFailure>),

    /// Metadata-related errors outside a run
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Store-related errors outside a run
    #[error(transparent)]
    Store(#[from] StoreError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found in {0} or its parents")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a pipeline stage failed
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Login or team selection failed
    #[error("authentication failed for {account}: {source}")]
    Authentication {
        account: String,
        #[source]
        source: StoreError,
    },

    /// The target application could not be determined
    #[error("could not resolve target app: {reason}")]
    Resolution {
        reason: String,
        #[source]
        source: Option<StoreError>,
    },

    /// Making the remote version match failed
    #[error("could not reconcile version {version}: {source}")]
    Reconciliation {
        version: String,
        #[source]
        source: StoreError,
    },

    /// The metadata bundle could not be loaded
    #[error("could not load metadata: {0}")]
    MetadataLoad(#[source] MetadataError),

    /// Local validation rejected the bundle
    #[error("validation failed with {} error(s)", .issues.len())]
    Validation { issues: Vec<ValidationIssue> },

    /// A remote mutation was rejected or could not be delivered
    #[error("{stage} failed: {source}")]
    Remote {
        stage: Stage,
        #[source]
        source: StoreError,
    },
}

/// A failed run: the stage it stopped at, why, and what the store now holds.
#[derive(Debug, Error)]
#[error("{} failed ({}): {}", .stage, .commit, .error)]
pub struct PipelineFailure {
    pub stage: Stage,
    #[source]
    pub error: PipelineError,
    pub commit: CommitState,
    /// Everything recorded up to and including the failing stage
    pub report: RunReport,
}

impl PipelineFailure {
    /// Whether the store was left untouched
    pub fn nothing_committed(&self) -> bool {
        matches!(self.commit, CommitState::Nothing)
    }
}
