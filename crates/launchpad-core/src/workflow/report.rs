//! Run state and the report a delivery produces

use launchpad_stores::AppIdentity;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::stage::{Stage, StageResult, StageStatus};

/// Where a run is in its lifecycle.
///
/// `Done` and `Failed` are terminal; `Failed` can follow any other phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Init,
    Authenticated,
    Resolved,
    VersionChecked,
    MetadataCommitted,
    BinaryCommitted,
    Submitted,
    Done,
    Failed(Stage),
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Failed(_))
    }
}

/// Result of version reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionOutcome {
    pub version: String,
    /// The store's version record was created or renamed
    pub created: bool,
}

/// What a run did, stage by stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Resolved application, once known
    pub app: Option<AppIdentity>,
    /// Reconciliation outcome, `None` when no target version was given
    pub version: Option<VersionOutcome>,
    pub stages: Vec<StageResult>,
    pub phase: RunPhase,
    pub binary_uploaded: bool,
    pub submitted: bool,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            app: None,
            version: None,
            stages: Vec::new(),
            phase: RunPhase::Init,
            binary_uploaded: false,
            submitted: false,
        }
    }

    pub fn record(&mut self, result: StageResult) {
        self.stages.push(result);
    }

    /// Flag a succeeded stage as having left the store untouched
    pub fn mark_unchanged(&mut self, stage: Stage) {
        if let Some(result) = self.stages.iter_mut().find(|r| r.stage == stage) {
            result.unchanged = true;
        }
    }

    pub fn result(&self, stage: Stage) -> Option<&StageResult> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    /// Whether the stage was actually invoked (succeeded or failed)
    pub fn invoked(&self, stage: Stage) -> bool {
        self.result(stage)
            .is_some_and(|r| r.status != StageStatus::Skipped)
    }

    /// Stages that were invoked, in order
    pub fn invoked_stages(&self) -> Vec<Stage> {
        self.stages
            .iter()
            .filter(|r| r.status != StageStatus::Skipped)
            .map(|r| r.stage)
            .collect()
    }

    /// Stages whose changes are now live in the store
    pub fn committed_stages(&self) -> Vec<Stage> {
        let mut committed = Vec::new();
        if self.version.as_ref().is_some_and(|v| v.created) {
            committed.push(Stage::ReconcileVersion);
        }
        committed.extend(
            self.stages
                .iter()
                .filter(|r| r.succeeded() && !r.unchanged && r.stage.is_remote_mutation())
                .map(|r| r.stage),
        );
        committed
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        match self.phase {
            RunPhase::Failed(stage) => Some(stage),
            _ => None,
        }
    }
}

/// What the store holds after a failed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CommitState {
    /// The failure happened before any remote change
    Nothing,
    /// Earlier stages are committed and were not rolled back
    Partial { committed: Vec<Stage> },
    /// Metadata and binary are in place; only the review submission failed
    AwaitingSubmission,
}

impl CommitState {
    /// Classify the store's state after `failed` stopped the run
    pub fn after_failure(report: &RunReport, failed: Stage) -> Self {
        let committed = report.committed_stages();
        if failed == Stage::Submission {
            CommitState::AwaitingSubmission
        } else if committed.is_empty() {
            CommitState::Nothing
        } else {
            CommitState::Partial { committed }
        }
    }
}

impl fmt::Display for CommitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitState::Nothing => f.write_str("nothing was committed"),
            CommitState::Partial { committed } => {
                let names: Vec<&str> = committed.iter().map(Stage::name).collect();
                write!(f, "partial commit: {} already applied", names.join(", "))
            }
            CommitState::AwaitingSubmission => {
                f.write_str("release is in the store but not submitted for review")
            }
        }
    }
}
