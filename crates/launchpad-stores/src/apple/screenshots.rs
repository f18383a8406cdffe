//! Screenshot uploads
//!
//! App Store Connect takes screenshots in three steps: reserve an
//! `appScreenshots` resource (which returns upload operations), send the
//! bytes to the returned URLs, then commit with the file's MD5 checksum.
//!
//! Sets that already exist are emptied first, so after a run each set holds
//! exactly the bundle's screenshots no matter how often the stage is re-run.

use async_trait::async_trait;
use launchpad_metadata::{DisplayType, MetadataBundle, Screenshot};
use md5::{Digest, Md5};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::client::{ConnectClient, Document, Resource};
use crate::error::{Result, StoreError};
use crate::traits::MetadataStageExecutor;
use crate::types::*;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScreenshotSetAttributes {
    screenshot_display_type: String,
}

/// Existing screenshot, only its id matters
#[derive(Debug, Deserialize)]
struct ScreenshotRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RequestHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadOperation {
    method: String,
    url: String,
    length: usize,
    offset: usize,
    #[serde(default)]
    request_headers: Vec<RequestHeader>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScreenshotAttributes {
    #[serde(default)]
    upload_operations: Vec<UploadOperation>,
}

/// Hex MD5 of a file's contents, as the commit request expects
pub(crate) fn md5_hex(bytes: &[u8]) -> String {
    format!("{:x}", Md5::digest(bytes))
}

/// Uploads screenshot sets for every locale of the editable version
pub struct ConnectScreenshotUploader {
    client: Arc<ConnectClient>,
}

impl ConnectScreenshotUploader {
    pub fn new(client: Arc<ConnectClient>) -> Self {
        Self { client }
    }

    /// The set for `display_type`, created if missing and emptied if not
    async fn prepare_set(
        &self,
        session: &Session,
        localization_id: &str,
        display_type: DisplayType,
    ) -> Result<String> {
        let sets: Document<Vec<Resource<ScreenshotSetAttributes>>> = self
            .client
            .get(
                session,
                &format!("/appStoreVersionLocalizations/{}/appScreenshotSets", localization_id),
                &[],
            )
            .await?;

        if let Some(set) = sets
            .data
            .into_iter()
            .find(|s| s.attributes.screenshot_display_type == display_type.asc_name())
        {
            self.clear_set(session, &set.id).await?;
            return Ok(set.id);
        }

        debug!("Creating screenshot set {} for {}", display_type, localization_id);
        let body = serde_json::json!({
            "data": {
                "type": "appScreenshotSets",
                "attributes": { "screenshotDisplayType": display_type.asc_name() },
                "relationships": {
                    "appStoreVersionLocalization": {
                        "data": { "type": "appStoreVersionLocalizations", "id": localization_id }
                    }
                }
            }
        });
        let created: Document<Resource<ScreenshotSetAttributes>> =
            self.client.post(session, "/appScreenshotSets", body).await?;
        Ok(created.data.id)
    }

    async fn clear_set(&self, session: &Session, set_id: &str) -> Result<()> {
        let existing: Document<Vec<ScreenshotRef>> = self
            .client
            .get(
                session,
                &format!("/appScreenshotSets/{}/appScreenshots", set_id),
                &[("limit", "200")],
            )
            .await?;

        for screenshot in &existing.data {
            debug!("Deleting screenshot {} from set {}", screenshot.id, set_id);
            self.client
                .delete(session, &format!("/appScreenshots/{}", screenshot.id))
                .await?;
        }
        Ok(())
    }

    async fn upload_one(&self, session: &Session, set_id: &str, screenshot: &Screenshot) -> Result<()> {
        let bytes = tokio::fs::read(&screenshot.path).await?;
        let file_name = screenshot
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                StoreError::InvalidArtifact(format!("bad screenshot path {}", screenshot.path.display()))
            })?;

        let body = serde_json::json!({
            "data": {
                "type": "appScreenshots",
                "attributes": { "fileName": file_name, "fileSize": bytes.len() },
                "relationships": {
                    "appScreenshotSet": { "data": { "type": "appScreenshotSets", "id": set_id } }
                }
            }
        });
        let reserved: Document<Resource<ScreenshotAttributes>> =
            self.client.post(session, "/appScreenshots", body).await?;

        for op in &reserved.data.attributes.upload_operations {
            let part = op
                .offset
                .checked_add(op.length)
                .and_then(|end| bytes.get(op.offset..end))
                .ok_or_else(|| {
                    StoreError::UploadFailed(format!(
                        "upload operation at offset {} with length {} is outside {} ({} bytes)",
                        op.offset,
                        op.length,
                        file_name,
                        bytes.len()
                    ))
                })?;
            let headers: Vec<(String, String)> = op
                .request_headers
                .iter()
                .map(|h| (h.name.clone(), h.value.clone()))
                .collect();
            self.client
                .upload_part(&op.method, &op.url, &headers, part.to_vec())
                .await?;
        }

        let commit = serde_json::json!({
            "data": {
                "type": "appScreenshots",
                "id": reserved.data.id,
                "attributes": { "uploaded": true, "sourceFileChecksum": md5_hex(&bytes) }
            }
        });
        self.client
            .patch(session, &format!("/appScreenshots/{}", reserved.data.id), commit)
            .await?;

        debug!("Uploaded screenshot {}", file_name);
        Ok(())
    }
}

#[async_trait]
impl MetadataStageExecutor for ConnectScreenshotUploader {
    #[instrument(skip_all, fields(app = %app.apple_id))]
    async fn run(
        &self,
        session: &Session,
        app: &AppIdentity,
        platform: Platform,
        bundle: &MetadataBundle,
    ) -> Result<StageEffect> {
        let sets = bundle.screenshot_sets();
        if sets.is_empty() {
            info!("No screenshots to upload");
            return Ok(StageEffect::Unchanged);
        }

        let version = self
            .client
            .require_editable_version(session, &app.apple_id, platform)
            .await?;
        let localizations: HashMap<String, String> = self
            .client
            .version_localizations(session, &version.id)
            .await?
            .into_iter()
            .map(|l| (l.attributes.locale, l.id))
            .collect();

        let mut uploaded = 0;
        for ((locale, display_type), screenshots) in sets {
            let localization_id = localizations.get(&locale.code()).ok_or_else(|| {
                StoreError::UploadFailed(format!(
                    "no {} localization on version {} for screenshots",
                    locale, version.attributes.version_string
                ))
            })?;

            let set_id = self
                .prepare_set(session, localization_id, display_type)
                .await?;
            for screenshot in screenshots {
                self.upload_one(session, &set_id, screenshot).await?;
                uploaded += 1;
            }
        }

        info!("Uploaded {} screenshot(s)", uploaded);
        Ok(StageEffect::Applied)
    }
}
