//! Exit codes for the CLI

use launchpad_core::{CommitState, LaunchpadError, PipelineFailure, Stage};

use crate::cli::commands::ValidationFailed;

/// Success
pub const SUCCESS: u8 = 0;

/// General error
pub const ERROR: u8 = 1;

/// Configuration error
pub const CONFIG_ERROR: u8 = 2;

/// Login or team selection failed
pub const AUTH_ERROR: u8 = 3;

/// The app or its version could not be resolved
pub const RESOLUTION_ERROR: u8 = 4;

/// Metadata could not be loaded or failed validation
pub const VALIDATION_ERROR: u8 = 5;

/// Some stages committed before the failure
pub const PARTIAL_COMMIT: u8 = 6;

/// Everything but the review submission is in the store
pub const SUBMISSION_ERROR: u8 = 7;

/// Exit code for an error returned by a command
pub fn for_error(error: &anyhow::Error) -> u8 {
    if let Some(error) = error.downcast_ref::<LaunchpadError>() {
        return match error {
            LaunchpadError::Config(_) => CONFIG_ERROR,
            LaunchpadError::Pipeline(failure) => for_failure(failure),
            _ => ERROR,
        };
    }
    if error.downcast_ref::<ValidationFailed>().is_some() {
        return VALIDATION_ERROR;
    }
    ERROR
}

/// Exit code for a failed delivery
pub fn for_failure(failure: &PipelineFailure) -> u8 {
    match failure.commit {
        CommitState::AwaitingSubmission => SUBMISSION_ERROR,
        CommitState::Partial { .. } => PARTIAL_COMMIT,
        CommitState::Nothing => match failure.stage {
            Stage::Authenticate => AUTH_ERROR,
            Stage::Resolve | Stage::ReconcileVersion => RESOLUTION_ERROR,
            Stage::LoadMetadata | Stage::Validate => VALIDATION_ERROR,
            _ => ERROR,
        },
    }
}
