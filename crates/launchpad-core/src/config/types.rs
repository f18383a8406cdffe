//! Configuration types

use launchpad_metadata::MetadataLocation;
use launchpad_stores::{AppReference, Platform};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults::{DEFAULT_METADATA_PATH, DEFAULT_SCREENSHOTS_PATH};
use crate::error::{ConfigError, Result};
use crate::types::{BinaryArtifact, ReleaseRequest};

/// Root of a `launchpad.toml` / `launchpad.yaml` file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverConfig {
    /// Account the session is opened for, defaults to the API key id
    pub account: Option<String>,

    /// Team / provider id
    pub team_id: Option<String>,

    /// Bundle identifier of the app
    pub app_identifier: Option<String>,

    /// Numeric App Store Connect id of the app
    pub apple_id: Option<String>,

    /// Version the store should end up with
    pub app_version: Option<String>,

    /// `ios`, `osx` or `appletvos`
    pub platform: Option<String>,

    pub ipa: Option<PathBuf>,
    pub pkg: Option<PathBuf>,

    pub metadata_path: PathBuf,
    pub screenshots_path: PathBuf,

    pub skip_binary_upload: bool,
    pub force: bool,
    pub submit_for_review: bool,

    /// App Store Connect price point id
    pub price_tier: Option<String>,
    pub app_icon: Option<PathBuf>,
    pub apple_watch_app_icon: Option<PathBuf>,

    /// Where transport packages are built
    pub staging_dir: Option<PathBuf>,

    pub api_key: ApiKeyConfig,
}

impl Default for DeliverConfig {
    fn default() -> Self {
        Self {
            account: None,
            team_id: None,
            app_identifier: None,
            apple_id: None,
            app_version: None,
            platform: None,
            ipa: None,
            pkg: None,
            metadata_path: PathBuf::from(DEFAULT_METADATA_PATH),
            screenshots_path: PathBuf::from(DEFAULT_SCREENSHOTS_PATH),
            skip_binary_upload: false,
            force: false,
            submit_for_review: false,
            price_tier: None,
            app_icon: None,
            apple_watch_app_icon: None,
            staging_dir: None,
            api_key: ApiKeyConfig::default(),
        }
    }
}

/// App Store Connect API key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeyConfig {
    pub key_id: Option<String>,
    pub issuer_id: Option<String>,
    /// Path to the `.p8` private key
    pub key_path: Option<PathBuf>,
}

impl DeliverConfig {
    /// Parsed platform, `None` when not configured
    pub fn platform(&self) -> Result<Option<Platform>> {
        let Some(platform) = self.platform.as_deref() else {
            return Ok(None);
        };
        platform.parse::<Platform>().map(Some).map_err(|_| {
            ConfigError::InvalidValue {
                field: "platform".to_string(),
                message: format!(
                    "unsupported platform '{}', expected ios, osx or appletvos",
                    platform
                ),
            }
            .into()
        })
    }

    pub fn metadata_location(&self) -> MetadataLocation {
        MetadataLocation {
            metadata_path: self.metadata_path.clone(),
            screenshots_path: self.screenshots_path.clone(),
            price_tier: self.price_tier.clone(),
            app_icon: self.app_icon.clone(),
            apple_watch_app_icon: self.apple_watch_app_icon.clone(),
        }
    }

    /// Build the immutable request for one delivery
    pub fn into_request(self) -> Result<ReleaseRequest> {
        let platform = self.platform()?;
        let metadata = self.metadata_location();
        let artifact = BinaryArtifact::from_paths(self.ipa, self.pkg)?;
        let account = self
            .account
            .or(self.api_key.key_id)
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField("account".to_string()))?;

        Ok(ReleaseRequest {
            account,
            team_id: self.team_id,
            app: AppReference {
                bundle_id: self.app_identifier,
                apple_id: self.apple_id,
            },
            app_version: self.app_version,
            platform,
            artifact,
            metadata,
            staging_dir: self.staging_dir,
            skip_binary_upload: self.skip_binary_upload,
            force: self.force,
            submit_for_review: self.submit_for_review,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LaunchpadError;

    #[test]
    fn test_default_paths() {
        let config = DeliverConfig::default();
        assert_eq!(config.metadata_path, PathBuf::from("./metadata"));
        assert_eq!(config.screenshots_path, PathBuf::from("./screenshots"));
        assert!(!config.force);
    }

    #[test]
    fn test_into_request() {
        let config = DeliverConfig {
            team_id: Some("118923741".to_string()),
            app_identifier: Some("com.example.rocket".to_string()),
            app_version: Some("2.0".to_string()),
            pkg: Some("build/Rocket.pkg".into()),
            price_tier: Some("tier-10".to_string()),
            submit_for_review: true,
            api_key: ApiKeyConfig {
                key_id: Some("KEY123".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let request = config.into_request().unwrap();
        assert_eq!(request.account, "KEY123");
        assert_eq!(request.app.bundle_id.as_deref(), Some("com.example.rocket"));
        assert_eq!(request.artifact, BinaryArtifact::Pkg("build/Rocket.pkg".into()));
        assert_eq!(request.metadata.price_tier.as_deref(), Some("tier-10"));
        assert_eq!(request.platform, None);
        assert!(request.submit_for_review);
    }

    #[test]
    fn test_into_request_rejects_both_artifacts() {
        let config = DeliverConfig {
            account: Some("KEY123".to_string()),
            ipa: Some("a.ipa".into()),
            pkg: Some("a.pkg".into()),
            ..Default::default()
        };
        assert!(matches!(
            config.into_request(),
            Err(LaunchpadError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_into_request_requires_account() {
        let result = DeliverConfig::default().into_request();
        assert!(matches!(
            result,
            Err(LaunchpadError::Config(ConfigError::MissingField(field))) if field == "account"
        ));
    }

    #[test]
    fn test_platform_parsing() {
        let mut config = DeliverConfig {
            platform: Some("appletvos".to_string()),
            ..Default::default()
        };
        assert_eq!(config.platform().unwrap(), Some(Platform::AppleTvOs));

        config.platform = Some("watchos".to_string());
        assert!(config.platform().is_err());
    }
}
