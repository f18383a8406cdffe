//! Launchpad Core - release delivery orchestration
//!
//! This crate holds the immutable [`ReleaseRequest`], configuration loading,
//! the error taxonomy, and the [`DeliverPipeline`] that sequences a delivery
//! against the collaborators defined in `launchpad-stores`.

pub mod config;
pub mod error;
pub mod types;
pub mod workflow;

pub use error::{ConfigError, LaunchpadError, PipelineError, PipelineFailure, Result};
pub use types::{BinaryArtifact, ReleaseRequest};
pub use workflow::{
    Collaborators, CollectingReporter, CommitState, DeliverPipeline, PipelineEvent,
    PipelineReporter, ReporterRegistry, RunPhase, RunReport, Stage, StageResult, StageStatus,
    TracingReporter, VersionOutcome,
};
