//! Release request types

use launchpad_metadata::MetadataLocation;
use launchpad_stores::{AppReference, Platform};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// The binary, if any, that a release ships
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum BinaryArtifact {
    #[default]
    None,
    /// iOS / tvOS application archive
    Ipa(PathBuf),
    /// macOS installer package
    Pkg(PathBuf),
}

impl BinaryArtifact {
    /// Build from the two optional paths a configuration carries.
    ///
    /// Setting both is rejected rather than silently preferring one.
    pub fn from_paths(ipa: Option<PathBuf>, pkg: Option<PathBuf>) -> Result<Self, ConfigError> {
        match (ipa, pkg) {
            (Some(_), Some(_)) => Err(ConfigError::InvalidValue {
                field: "ipa/pkg".to_string(),
                message: "only one of ipa and pkg may be set".to_string(),
            }),
            (Some(ipa), None) => Ok(BinaryArtifact::Ipa(ipa)),
            (None, Some(pkg)) => Ok(BinaryArtifact::Pkg(pkg)),
            (None, None) => Ok(BinaryArtifact::None),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            BinaryArtifact::None => None,
            BinaryArtifact::Ipa(path) | BinaryArtifact::Pkg(path) => Some(path),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, BinaryArtifact::None)
    }

    /// Platform implied by the artifact kind
    pub fn implied_platform(&self) -> Option<Platform> {
        match self {
            BinaryArtifact::None => None,
            BinaryArtifact::Ipa(_) => Some(Platform::Ios),
            BinaryArtifact::Pkg(_) => Some(Platform::Osx),
        }
    }
}

impl std::fmt::Display for BinaryArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryArtifact::None => f.write_str("none"),
            BinaryArtifact::Ipa(path) => write!(f, "ipa {}", path.display()),
            BinaryArtifact::Pkg(path) => write!(f, "pkg {}", path.display()),
        }
    }
}

/// Everything one delivery intends to do.
///
/// Built once per invocation and never mutated; values the pipeline works
/// out along the way live in the run's own state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRequest {
    /// Account the session is opened for (the API key id)
    pub account: String,
    /// Team / provider to act on
    pub team_id: Option<String>,
    /// Target application, possibly partial
    pub app: AppReference,
    /// Version the store should end up with
    pub app_version: Option<String>,
    /// Explicit platform, otherwise implied by the artifact
    pub platform: Option<Platform>,
    pub artifact: BinaryArtifact,
    pub metadata: MetadataLocation,
    /// Where binary packages are built, a temporary directory if unset
    pub staging_dir: Option<PathBuf>,
    pub skip_binary_upload: bool,
    /// Skip local validation before uploading
    pub force: bool,
    pub submit_for_review: bool,
}

impl ReleaseRequest {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            team_id: None,
            app: AppReference::default(),
            app_version: None,
            platform: None,
            artifact: BinaryArtifact::None,
            metadata: MetadataLocation::default(),
            staging_dir: None,
            skip_binary_upload: false,
            force: false,
            submit_for_review: false,
        }
    }

    /// Target version, treating blank strings as unset
    pub fn target_version(&self) -> Option<&str> {
        self.app_version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Whether the binary stage has anything to do
    pub fn uploads_binary(&self) -> bool {
        !self.skip_binary_upload && !self.artifact.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_from_paths() {
        assert_eq!(BinaryArtifact::from_paths(None, None).unwrap(), BinaryArtifact::None);
        assert_eq!(
            BinaryArtifact::from_paths(Some("a.ipa".into()), None).unwrap(),
            BinaryArtifact::Ipa("a.ipa".into())
        );
        assert_eq!(
            BinaryArtifact::from_paths(None, Some("a.pkg".into())).unwrap(),
            BinaryArtifact::Pkg("a.pkg".into())
        );
        assert!(BinaryArtifact::from_paths(Some("a.ipa".into()), Some("a.pkg".into())).is_err());
    }

    #[test]
    fn test_implied_platform() {
        assert_eq!(BinaryArtifact::Ipa("a.ipa".into()).implied_platform(), Some(Platform::Ios));
        assert_eq!(BinaryArtifact::Pkg("a.pkg".into()).implied_platform(), Some(Platform::Osx));
        assert_eq!(BinaryArtifact::None.implied_platform(), None);
    }

    #[test]
    fn test_blank_version_is_unset() {
        let mut request = ReleaseRequest::new("KEY");
        assert_eq!(request.target_version(), None);
        request.app_version = Some("  ".to_string());
        assert_eq!(request.target_version(), None);
        request.app_version = Some("2.0".to_string());
        assert_eq!(request.target_version(), Some("2.0"));
    }

    #[test]
    fn test_uploads_binary() {
        let mut request = ReleaseRequest::new("KEY");
        assert!(!request.uploads_binary());
        request.artifact = BinaryArtifact::Ipa("a.ipa".into());
        assert!(request.uploads_binary());
        request.skip_binary_upload = true;
        assert!(!request.uploads_binary());
    }

    #[test]
    fn test_artifact_serialization() {
        let json = serde_json::to_value(BinaryArtifact::Ipa("a.ipa".into())).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "ipa", "path": "a.ipa" }));
        let json = serde_json::to_value(BinaryArtifact::None).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "none" }));
    }
}
