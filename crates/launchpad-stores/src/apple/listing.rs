//! Store listing text: version localizations, app info localizations and copyright

use async_trait::async_trait;
use launchpad_metadata::{LocalizedMetadata, MetadataBundle};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::client::{ConnectClient, Document, LocalizationAttributes, Resource};
use crate::error::{Result, StoreError};
use crate::traits::MetadataStageExecutor;
use crate::types::*;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppInfoAttributes {
    #[serde(default)]
    app_store_state: Option<String>,
}

/// Pushes localized listing text for the editable version
pub struct ConnectListingUploader {
    client: Arc<ConnectClient>,
}

fn insert(attributes: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        attributes.insert(key.to_string(), Value::String(value.clone()));
    }
}

/// Attributes owned by `appStoreVersionLocalizations`
fn version_attributes(metadata: &LocalizedMetadata) -> Map<String, Value> {
    let mut attributes = Map::new();
    insert(&mut attributes, "description", &metadata.description);
    insert(&mut attributes, "keywords", &metadata.keywords);
    insert(&mut attributes, "whatsNew", &metadata.release_notes);
    insert(&mut attributes, "promotionalText", &metadata.promotional_text);
    insert(&mut attributes, "supportUrl", &metadata.support_url);
    insert(&mut attributes, "marketingUrl", &metadata.marketing_url);
    attributes
}

/// Attributes owned by `appInfoLocalizations`
fn app_info_attributes(metadata: &LocalizedMetadata) -> Map<String, Value> {
    let mut attributes = Map::new();
    insert(&mut attributes, "name", &metadata.name);
    insert(&mut attributes, "subtitle", &metadata.subtitle);
    insert(&mut attributes, "privacyPolicyUrl", &metadata.privacy_url);
    attributes
}

impl ConnectListingUploader {
    pub fn new(client: Arc<ConnectClient>) -> Self {
        Self { client }
    }

    /// Update existing localizations in place and create missing ones,
    /// returning how many were written.
    ///
    /// `resource` is the localization resource type, `parent` the
    /// relationship name and resource it hangs off.
    async fn upsert_localizations(
        &self,
        session: &Session,
        existing: Vec<Resource<LocalizationAttributes>>,
        resource: &str,
        parent: (&str, &str, &str),
        updates: Vec<(String, Map<String, Value>)>,
    ) -> Result<usize> {
        let existing: HashMap<String, String> = existing
            .into_iter()
            .map(|l| (l.attributes.locale, l.id))
            .collect();
        let (relationship, parent_type, parent_id) = parent;

        let mut written = 0;
        for (locale, mut attributes) in updates {
            if attributes.is_empty() {
                continue;
            }

            match existing.get(&locale) {
                Some(id) => {
                    debug!("Updating {} {} ({})", resource, id, locale);
                    let body = serde_json::json!({
                        "data": { "type": resource, "id": id, "attributes": attributes }
                    });
                    self.client
                        .patch(session, &format!("/{}/{}", resource, id), body)
                        .await?;
                }
                None => {
                    debug!("Creating {} for {}", resource, locale);
                    attributes.insert("locale".to_string(), Value::String(locale));
                    let body = serde_json::json!({
                        "data": {
                            "type": resource,
                            "attributes": attributes,
                            "relationships": {
                                relationship: { "data": { "type": parent_type, "id": parent_id } }
                            }
                        }
                    });
                    let _: Value = self.client.post(session, &format!("/{}", resource), body).await?;
                }
            }
            written += 1;
        }
        Ok(written)
    }

    /// The app info record that is still editable (not live)
    async fn editable_app_info(&self, session: &Session, app_id: &str) -> Result<String> {
        let response: Document<Vec<Resource<AppInfoAttributes>>> = self
            .client
            .get(session, &format!("/apps/{}/appInfos", app_id), &[])
            .await?;

        let mut infos = response.data;
        if infos.is_empty() {
            return Err(StoreError::AppNotFound(format!("no app info for app {}", app_id)));
        }
        let editable = infos
            .iter()
            .position(|info| info.attributes.app_store_state.as_deref() != Some("READY_FOR_SALE"))
            .unwrap_or(0);
        Ok(infos.swap_remove(editable).id)
    }
}

#[async_trait]
impl MetadataStageExecutor for ConnectListingUploader {
    #[instrument(skip_all, fields(app = %app.apple_id))]
    async fn run(
        &self,
        session: &Session,
        app: &AppIdentity,
        platform: Platform,
        bundle: &MetadataBundle,
    ) -> Result<StageEffect> {
        let version = self
            .client
            .require_editable_version(session, &app.apple_id, platform)
            .await?;

        let version_updates = bundle
            .localizations
            .iter()
            .map(|(locale, metadata)| (locale.code(), version_attributes(metadata)))
            .collect();
        let existing = self.client.version_localizations(session, &version.id).await?;
        let mut written = self
            .upsert_localizations(
                session,
                existing,
                "appStoreVersionLocalizations",
                ("appStoreVersion", "appStoreVersions", &version.id),
                version_updates,
            )
            .await?;

        let info_updates: Vec<_> = bundle
            .localizations
            .iter()
            .map(|(locale, metadata)| (locale.code(), app_info_attributes(metadata)))
            .filter(|(_, attributes)| !attributes.is_empty())
            .collect();
        if !info_updates.is_empty() {
            let app_info_id = self.editable_app_info(session, &app.apple_id).await?;
            let existing: Document<Vec<Resource<LocalizationAttributes>>> = self
                .client
                .get(
                    session,
                    &format!("/appInfos/{}/appInfoLocalizations", app_info_id),
                    &[("limit", "200")],
                )
                .await?;
            written += self
                .upsert_localizations(
                    session,
                    existing.data,
                    "appInfoLocalizations",
                    ("appInfo", "appInfos", &app_info_id),
                    info_updates,
                )
                .await?;
        }

        if let Some(copyright) = &bundle.details.copyright {
            let body = serde_json::json!({
                "data": {
                    "type": "appStoreVersions",
                    "id": version.id,
                    "attributes": { "copyright": copyright }
                }
            });
            self.client
                .patch(session, &format!("/appStoreVersions/{}", version.id), body)
                .await?;
            written += 1;
        }

        if written == 0 {
            debug!("No listing text to upload");
            return Ok(StageEffect::Unchanged);
        }
        info!(
            "Uploaded listing text for {} locale(s)",
            bundle.localizations.len()
        );
        Ok(StageEffect::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::super::client::test_support::{client, session};
    use super::*;
    use launchpad_metadata::{AppDetails, Locale};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app() -> AppIdentity {
        AppIdentity {
            apple_id: "42".to_string(),
            bundle_id: "com.example.rocket".to_string(),
            name: "Rocket".to_string(),
        }
    }

    fn bundle() -> MetadataBundle {
        let mut bundle = MetadataBundle::default();
        bundle.localizations.insert(
            Locale::new("en-US").unwrap(),
            LocalizedMetadata {
                name: Some("Rocket".to_string()),
                description: Some("Launch things.".to_string()),
                release_notes: Some("Faster launches.".to_string()),
                ..Default::default()
            },
        );
        bundle.localizations.insert(
            Locale::new("de-DE").unwrap(),
            LocalizedMetadata {
                description: Some("Dinge starten.".to_string()),
                ..Default::default()
            },
        );
        bundle.details = AppDetails {
            copyright: Some("2026 Example Inc.".to_string()),
            ..Default::default()
        };
        bundle
    }

    #[test]
    fn test_attribute_split() {
        let metadata = LocalizedMetadata {
            name: Some("Rocket".to_string()),
            keywords: Some("space,launch".to_string()),
            release_notes: Some("Bug fixes".to_string()),
            privacy_url: Some("https://example.com/privacy".to_string()),
            ..Default::default()
        };

        let version = version_attributes(&metadata);
        assert_eq!(version.get("keywords"), Some(&Value::from("space,launch")));
        assert_eq!(version.get("whatsNew"), Some(&Value::from("Bug fixes")));
        assert!(!version.contains_key("name"));

        let info = app_info_attributes(&metadata);
        assert_eq!(info.get("name"), Some(&Value::from("Rocket")));
        assert!(info.contains_key("privacyPolicyUrl"));
        assert!(!info.contains_key("description"));
    }

    #[tokio::test]
    async fn test_updates_existing_and_creates_missing_localizations() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apps/42/appStoreVersions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "id": "v1", "attributes": { "versionString": "2.0" } }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/appStoreVersions/v1/appStoreVersionLocalizations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "id": "loc-en", "attributes": { "locale": "en-US" } }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/appStoreVersionLocalizations/loc-en"))
            .and(body_partial_json(serde_json::json!({
                "data": { "attributes": { "whatsNew": "Faster launches." } }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/appStoreVersionLocalizations"))
            .and(body_partial_json(serde_json::json!({
                "data": { "attributes": { "locale": "de-DE" } }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/apps/42/appInfos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "id": "info-live", "attributes": { "appStoreState": "READY_FOR_SALE" } },
                    { "id": "info-next", "attributes": { "appStoreState": "PREPARE_FOR_SUBMISSION" } }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/appInfos/info-next/appInfoLocalizations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "id": "info-en", "attributes": { "locale": "en-US" } }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/appInfoLocalizations/info-en"))
            .and(body_partial_json(serde_json::json!({
                "data": { "attributes": { "name": "Rocket" } }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/appStoreVersions/v1"))
            .and(body_partial_json(serde_json::json!({
                "data": { "attributes": { "copyright": "2026 Example Inc." } }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let effect = ConnectListingUploader::new(client(&server.uri()))
            .run(&session(), &app(), Platform::Ios, &bundle())
            .await
            .unwrap();
        assert_eq!(effect, StageEffect::Applied);
    }

    #[tokio::test]
    async fn test_empty_listing_leaves_store_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apps/42/appStoreVersions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "id": "v1", "attributes": { "versionString": "2.0" } }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/appStoreVersions/v1/appStoreVersionLocalizations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
            .mount(&server)
            .await;

        let effect = ConnectListingUploader::new(client(&server.uri()))
            .run(&session(), &app(), Platform::Ios, &MetadataBundle::default())
            .await
            .unwrap();

        assert_eq!(effect, StageEffect::Unchanged);
        let requests = server.received_requests().await.unwrap_or_default();
        assert!(requests.iter().all(|r| r.method.as_str() == "GET"));
    }

    #[tokio::test]
    async fn test_missing_editable_version_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apps/42/appStoreVersions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
            .mount(&server)
            .await;

        let err = ConnectListingUploader::new(client(&server.uri()))
            .run(&session(), &app(), Platform::Ios, &bundle())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NoEditableVersion(_)));
    }
}
