//! Common types for store collaborators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StoreError};

/// Target platform of a delivery
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// iOS / iPadOS
    #[default]
    Ios,
    /// macOS
    Osx,
    /// tvOS
    #[serde(rename = "appletvos")]
    AppleTvOs,
}

impl Platform {
    /// Platform identifier used by the App Store Connect API
    pub fn asc_name(&self) -> &'static str {
        match self {
            Platform::Ios => "IOS",
            Platform::Osx => "MAC_OS",
            Platform::AppleTvOs => "TV_OS",
        }
    }

    /// Platform identifier used in `.itmsp` package metadata
    pub fn package_name(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Osx => "osx",
            Platform::AppleTvOs => "appletvos",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.package_name())
    }
}

impl FromStr for Platform {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "osx" | "macos" => Ok(Platform::Osx),
            "appletvos" | "tvos" => Ok(Platform::AppleTvOs),
            other => Err(StoreError::ConfigurationError(format!(
                "unknown platform '{}', expected ios, osx or appletvos",
                other
            ))),
        }
    }
}

/// What the caller knows about the target application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppReference {
    /// Bundle identifier (e.g. com.example.app)
    pub bundle_id: Option<String>,
    /// Numeric App Store Connect app id
    pub apple_id: Option<String>,
}

impl AppReference {
    pub fn is_empty(&self) -> bool {
        self.bundle_id.is_none() && self.apple_id.is_none()
    }
}

/// A fully resolved remote application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIdentity {
    /// Numeric App Store Connect app id, used to key uploads
    pub apple_id: String,
    /// Bundle identifier
    pub bundle_id: String,
    /// App name as shown in App Store Connect
    pub name: String,
}

impl fmt::Display for AppIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.bundle_id, self.apple_id)
    }
}

/// Outcome of reconciling the target version with the store.
///
/// `created` is true when reconciliation changed remote state, either by
/// creating a new version record or by renaming the editable one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionReconciliation {
    pub created: bool,
}

/// Whether a metadata-class stage changed anything in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageEffect {
    /// Remote state was written
    Applied,
    /// Nothing to send, or the stage only checked local files
    Unchanged,
}

/// Identifiers read out of a binary artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryInfo {
    pub bundle_id: String,
    pub version: Option<String>,
    pub build_number: Option<String>,
}

/// An authenticated App Store Connect session.
///
/// Owned by a single delivery run and never shared between runs.
#[derive(Clone)]
pub struct Session {
    account: String,
    token: String,
    expires_at: DateTime<Utc>,
    context: Option<String>,
}

impl Session {
    pub fn new(account: impl Into<String>, token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            account: account.into(),
            token: token.into(),
            expires_at,
            context: None,
        }
    }

    /// Account (API key id) the session was opened for
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Bearer token for API requests, failing once the session has expired
    pub fn bearer(&self) -> Result<&str> {
        if self.is_expired() {
            return Err(StoreError::AuthenticationFailed(format!(
                "session for {} expired at {}",
                self.account, self.expires_at
            )));
        }
        Ok(&self.token)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Selected team / provider, if any
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn set_context(&mut self, context: Option<String>) {
        self.context = context;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("account", &self.account)
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("context", &self.context)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_platform_parsing() {
        assert_eq!("ios".parse::<Platform>().unwrap(), Platform::Ios);
        assert_eq!("macOS".parse::<Platform>().unwrap(), Platform::Osx);
        assert_eq!("appletvos".parse::<Platform>().unwrap(), Platform::AppleTvOs);
        assert!("android".parse::<Platform>().is_err());
        assert_eq!(Platform::Osx.asc_name(), "MAC_OS");
    }

    #[test]
    fn test_platform_serde_names() {
        let json = serde_json::to_string(&Platform::AppleTvOs).unwrap();
        assert_eq!(json, "\"appletvos\"");
        let parsed: Platform = serde_json::from_str("\"osx\"").unwrap();
        assert_eq!(parsed, Platform::Osx);
    }

    #[test]
    fn test_session_expiry() {
        let live = Session::new("KEY", "token", Utc::now() + Duration::minutes(10));
        assert_eq!(live.bearer().unwrap(), "token");

        let expired = Session::new("KEY", "token", Utc::now() - Duration::minutes(1));
        assert!(matches!(
            expired.bearer(),
            Err(StoreError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn test_session_debug_hides_token() {
        let session = Session::new("KEY", "secret-token", Utc::now());
        let rendered = format!("{:?}", session);
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("KEY"));
    }
}
