//! Collaborator traits consumed by the delivery pipeline
//!
//! Every remote or filesystem side effect of a delivery goes through one of
//! these seams so the orchestrator can be driven by fakes in tests.

use async_trait::async_trait;
use launchpad_metadata::MetadataBundle;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::*;

/// Opens authenticated sessions
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Authenticate `account` and return a session for this run
    async fn login(&self, account: &str) -> Result<Session>;

    /// Select the team / provider the rest of the run acts on
    async fn select_context(&self, session: &mut Session, team_id: Option<&str>) -> Result<()>;
}

/// The remote application a delivery targets
#[async_trait]
pub trait RemoteApp: Send + Sync {
    /// Resolve a possibly partial reference to a concrete application
    async fn resolve_identity(&self, session: &Session, reference: &AppReference) -> Result<AppIdentity>;

    /// Make the editable store version match `version`.
    ///
    /// This is not a query: it may create or rename a remote version record.
    /// Calling it again with an already matching version reports
    /// `created = false` and changes nothing.
    async fn reconcile_version(
        &self,
        session: &Session,
        app: &AppIdentity,
        platform: Platform,
        version: &str,
    ) -> Result<VersionReconciliation>;
}

/// One metadata-class upload stage (listing, screenshots, pricing, assets)
#[async_trait]
pub trait MetadataStageExecutor: Send + Sync {
    /// Push this stage's part of `bundle`, reporting whether the store changed
    async fn run(
        &self,
        session: &Session,
        app: &AppIdentity,
        platform: Platform,
        bundle: &MetadataBundle,
    ) -> Result<StageEffect>;
}

/// Builds a transport-ready package from a binary artifact
#[async_trait]
pub trait PackageBuilder: Send + Sync {
    /// Generate the package in `staging_dir` and return its path
    async fn generate(&self, app_id: &str, artifact: &Path, staging_dir: &Path) -> Result<PathBuf>;
}

/// Moves a built package to the store
#[async_trait]
pub trait Transporter: Send + Sync {
    async fn upload(&self, session: &Session, app_id: &str, package: &Path) -> Result<()>;
}

/// Submits the prepared version for review
#[async_trait]
pub trait SubmissionService: Send + Sync {
    async fn submit(&self, session: &Session, app: &AppIdentity, platform: Platform) -> Result<()>;
}

/// Reads identifiers out of binary artifacts
#[async_trait]
pub trait ArtifactInspector: Send + Sync {
    async fn inspect_ipa(&self, path: &Path) -> Result<BinaryInfo>;
}
