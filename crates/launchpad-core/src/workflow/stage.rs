//! Pipeline stages and their recorded outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

/// One discrete step of a delivery, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Authenticate,
    Resolve,
    ReconcileVersion,
    LoadMetadata,
    Validate,
    MetadataUpload,
    ScreenshotUpload,
    PriceTierUpload,
    AssetUpload,
    BinaryUpload,
    Submission,
}

impl Stage {
    /// Metadata-class upload stages in the order they run
    pub const METADATA_UPLOADS: [Stage; 4] = [
        Stage::MetadataUpload,
        Stage::ScreenshotUpload,
        Stage::PriceTierUpload,
        Stage::AssetUpload,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Authenticate => "authentication",
            Stage::Resolve => "app resolution",
            Stage::ReconcileVersion => "version reconciliation",
            Stage::LoadMetadata => "metadata loading",
            Stage::Validate => "validation",
            Stage::MetadataUpload => "metadata upload",
            Stage::ScreenshotUpload => "screenshot upload",
            Stage::PriceTierUpload => "price tier upload",
            Stage::AssetUpload => "asset upload",
            Stage::BinaryUpload => "binary upload",
            Stage::Submission => "review submission",
        }
    }

    /// Whether a successful run of this stage leaves changes in the store.
    ///
    /// Version reconciliation is excluded: whether it changed anything is
    /// only known from its outcome.
    pub fn is_remote_mutation(&self) -> bool {
        matches!(
            self,
            Stage::MetadataUpload
                | Stage::ScreenshotUpload
                | Stage::PriceTierUpload
                | Stage::AssetUpload
                | Stage::BinaryUpload
                | Stage::Submission
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Succeeded,
    Failed,
    Skipped,
}

/// Outcome of one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: Stage,
    pub status: StageStatus,
    /// Failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Extra context: skip reason, reconciliation outcome, package path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub duration_ms: u64,
    /// Succeeded without writing anything to the store
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unchanged: bool,
}

impl StageResult {
    pub fn completed(stage: Stage, duration_ms: u64, detail: Option<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Succeeded,
            error: None,
            detail,
            duration_ms,
            unchanged: false,
        }
    }

    pub fn failed(stage: Stage, duration_ms: u64, error: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            error: Some(error.into()),
            detail: None,
            duration_ms,
            unchanged: false,
        }
    }

    pub fn skipped(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped,
            error: None,
            detail: Some(reason.into()),
            duration_ms: 0,
            unchanged: false,
        }
    }

    pub fn stage_name(&self) -> &'static str {
        self.stage.name()
    }

    pub fn succeeded(&self) -> bool {
        self.status == StageStatus::Succeeded
    }
}
