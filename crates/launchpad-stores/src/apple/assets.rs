//! App icon handling
//!
//! App Store Connect takes icons from the uploaded binary's asset catalog,
//! so this stage only checks that configured icon files exist and says
//! where they will actually come from.

use async_trait::async_trait;
use launchpad_metadata::MetadataBundle;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::traits::MetadataStageExecutor;
use crate::types::*;

#[derive(Debug, Clone, Default)]
pub struct ConnectAssetUploader;

impl ConnectAssetUploader {
    pub fn new() -> Self {
        Self
    }
}

async fn check_icon(kind: &str, path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {
            warn!(
                "{} {} is not uploaded; App Store Connect uses the icon from the binary's asset catalog",
                kind,
                path.display()
            );
            Ok(())
        }
        Ok(_) => Err(StoreError::InvalidArtifact(format!(
            "{} {} is not a file",
            kind,
            path.display()
        ))),
        Err(e) => Err(StoreError::InvalidArtifact(format!(
            "{} {}: {}",
            kind,
            path.display(),
            e
        ))),
    }
}

#[async_trait]
impl MetadataStageExecutor for ConnectAssetUploader {
    async fn run(
        &self,
        _session: &Session,
        _app: &AppIdentity,
        _platform: Platform,
        bundle: &MetadataBundle,
    ) -> Result<StageEffect> {
        if bundle.assets.is_empty() {
            debug!("No icon assets configured");
            return Ok(StageEffect::Unchanged);
        }

        if let Some(icon) = &bundle.assets.app_icon {
            check_icon("App icon", icon).await?;
        }
        if let Some(icon) = &bundle.assets.apple_watch_app_icon {
            check_icon("Apple Watch app icon", icon).await?;
        }

        // Icons come from the binary, so the store is never written here
        info!("Asset checks complete");
        Ok(StageEffect::Unchanged)
    }
}
