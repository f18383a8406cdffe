//! Filling in what the request leaves implicit, before the store is asked

use launchpad_stores::{AppReference, ArtifactInspector, BinaryInfo, Platform};
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::types::{BinaryArtifact, ReleaseRequest};

/// Values worked out from the request and its artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub reference: AppReference,
    pub platform: Platform,
    /// Identifiers read from the ipa, when it was inspected
    pub binary: Option<BinaryInfo>,
}

/// Work out the app reference and platform for `request`.
///
/// A missing bundle id is read from the ipa. The ipa's version is only
/// compared against the target version; it never becomes the target.
pub async fn detect(
    request: &ReleaseRequest,
    inspector: &dyn ArtifactInspector,
) -> Result<Detection, PipelineError> {
    let mut reference = request.app.clone();
    let needs_bundle_id = reference.bundle_id.is_none() && reference.apple_id.is_none();

    let binary = match &request.artifact {
        BinaryArtifact::Ipa(path) if needs_bundle_id || request.target_version().is_some() => {
            match inspector.inspect_ipa(path).await {
                Ok(info) => Some(info),
                Err(e) if needs_bundle_id => {
                    return Err(PipelineError::Resolution {
                        reason: format!("could not read bundle id from {}", path.display()),
                        source: Some(e),
                    })
                }
                Err(e) => {
                    warn!("Could not inspect {}: {}", path.display(), e);
                    None
                }
            }
        }
        _ => None,
    };

    if let Some(info) = &binary {
        if reference.bundle_id.is_none() {
            debug!(bundle_id = %info.bundle_id, "bundle id taken from ipa");
            reference.bundle_id = Some(info.bundle_id.clone());
        }
        if let (Some(target), Some(found)) = (request.target_version(), info.version.as_deref()) {
            if target != found {
                warn!(
                    "Target version {} differs from the ipa's CFBundleShortVersionString {}",
                    target, found
                );
            }
        }
    }

    if reference.is_empty() {
        return Err(PipelineError::Resolution {
            reason: "no app identifier or apple id given, and no ipa to read one from".to_string(),
            source: None,
        });
    }

    let platform = request
        .platform
        .or_else(|| request.artifact.implied_platform())
        .unwrap_or_default();

    Ok(Detection {
        reference,
        platform,
        binary,
    })
}
