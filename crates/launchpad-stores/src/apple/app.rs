//! Remote application lookup and version reconciliation

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};

use super::client::{ConnectClient, Document, Resource};
use crate::error::{Result, StoreError};
use crate::traits::RemoteApp;
use crate::types::*;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppAttributes {
    name: String,
    bundle_id: String,
}

impl From<Resource<AppAttributes>> for AppIdentity {
    fn from(resource: Resource<AppAttributes>) -> Self {
        AppIdentity {
            apple_id: resource.id,
            bundle_id: resource.attributes.bundle_id,
            name: resource.attributes.name,
        }
    }
}

/// [`RemoteApp`] backed by the `apps` and `appStoreVersions` resources
pub struct ConnectRemoteApp {
    client: Arc<ConnectClient>,
}

impl ConnectRemoteApp {
    pub fn new(client: Arc<ConnectClient>) -> Self {
        Self { client }
    }

    async fn app_by_id(&self, session: &Session, apple_id: &str) -> Result<AppIdentity> {
        let response: Document<Resource<AppAttributes>> = self
            .client
            .get(session, &format!("/apps/{}", apple_id), &[])
            .await
            .map_err(|e| match e {
                StoreError::ApiError { status: 404, .. } => StoreError::AppNotFound(apple_id.to_string()),
                other => other,
            })?;
        Ok(response.data.into())
    }

    async fn app_by_bundle_id(&self, session: &Session, bundle_id: &str) -> Result<AppIdentity> {
        let response: Document<Vec<Resource<AppAttributes>>> = self
            .client
            .get(session, "/apps", &[("filter[bundleId]", bundle_id)])
            .await?;

        // The filter is a prefix match on some accounts
        response
            .data
            .into_iter()
            .find(|app| app.attributes.bundle_id == bundle_id)
            .map(AppIdentity::from)
            .ok_or_else(|| StoreError::AppNotFound(bundle_id.to_string()))
    }
}

#[async_trait]
impl RemoteApp for ConnectRemoteApp {
    #[instrument(skip(self, session))]
    async fn resolve_identity(&self, session: &Session, reference: &AppReference) -> Result<AppIdentity> {
        let app = match (&reference.apple_id, &reference.bundle_id) {
            (Some(apple_id), expected) => {
                let app = self.app_by_id(session, apple_id).await?;
                if let Some(bundle_id) = expected {
                    if &app.bundle_id != bundle_id {
                        return Err(StoreError::AppNotFound(format!(
                            "app {} has bundle id {}, expected {}",
                            apple_id, app.bundle_id, bundle_id
                        )));
                    }
                }
                app
            }
            (None, Some(bundle_id)) => self.app_by_bundle_id(session, bundle_id).await?,
            (None, None) => {
                return Err(StoreError::AppNotFound(
                    "neither a bundle id nor an apple id was given".to_string(),
                ))
            }
        };

        info!("Resolved app {}", app);
        Ok(app)
    }

    #[instrument(skip(self, session, app), fields(app = %app.apple_id))]
    async fn reconcile_version(
        &self,
        session: &Session,
        app: &AppIdentity,
        platform: Platform,
        version: &str,
    ) -> Result<VersionReconciliation> {
        let editable = self
            .client
            .editable_version(session, &app.apple_id, platform)
            .await?;

        match editable {
            Some(current) if current.attributes.version_string == version => {
                info!("App Store version {} already in place", version);
                Ok(VersionReconciliation { created: false })
            }
            Some(current) => {
                info!(
                    "Renaming editable version {} to {}",
                    current.attributes.version_string, version
                );
                let body = serde_json::json!({
                    "data": {
                        "type": "appStoreVersions",
                        "id": current.id,
                        "attributes": { "versionString": version }
                    }
                });
                self.client
                    .patch(session, &format!("/appStoreVersions/{}", current.id), body)
                    .await?;
                Ok(VersionReconciliation { created: true })
            }
            None => {
                info!("Creating App Store version {} for {}", version, platform);
                let body = serde_json::json!({
                    "data": {
                        "type": "appStoreVersions",
                        "attributes": {
                            "platform": platform.asc_name(),
                            "versionString": version
                        },
                        "relationships": {
                            "app": { "data": { "type": "apps", "id": app.apple_id } }
                        }
                    }
                });
                let _: serde_json::Value = self.client.post(session, "/appStoreVersions", body).await?;
                Ok(VersionReconciliation { created: true })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::client::test_support::{client, session};
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app() -> AppIdentity {
        AppIdentity {
            apple_id: "42".to_string(),
            bundle_id: "com.example.rocket".to_string(),
            name: "Rocket".to_string(),
        }
    }

    async fn mount_editable(server: &MockServer, versions: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/apps/42/appStoreVersions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": versions })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_resolve_by_bundle_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apps"))
            .and(query_param("filter[bundleId]", "com.example.rocket"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "id": "41", "attributes": { "name": "Rocket Pro", "bundleId": "com.example.rocket.pro" } },
                    { "id": "42", "attributes": { "name": "Rocket", "bundleId": "com.example.rocket" } }
                ]
            })))
            .mount(&server)
            .await;

        let remote = ConnectRemoteApp::new(client(&server.uri()));
        let reference = AppReference {
            bundle_id: Some("com.example.rocket".to_string()),
            apple_id: None,
        };

        let resolved = remote.resolve_identity(&session(), &reference).await.unwrap();
        assert_eq!(resolved, app());
    }

    #[tokio::test]
    async fn test_resolve_unknown_apple_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apps/999"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let remote = ConnectRemoteApp::new(client(&server.uri()));
        let reference = AppReference {
            bundle_id: None,
            apple_id: Some("999".to_string()),
        };

        let err = remote.resolve_identity(&session(), &reference).await.unwrap_err();
        assert!(matches!(err, StoreError::AppNotFound(_)));
    }

    #[tokio::test]
    async fn test_resolve_requires_some_reference() {
        let server = MockServer::start().await;
        let remote = ConnectRemoteApp::new(client(&server.uri()));

        let err = remote
            .resolve_identity(&session(), &AppReference::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AppNotFound(_)));
    }

    #[tokio::test]
    async fn test_reconcile_matching_version_is_a_noop() {
        let server = MockServer::start().await;
        mount_editable(
            &server,
            serde_json::json!([{ "id": "v1", "attributes": { "versionString": "2.0" } }]),
        )
        .await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let remote = ConnectRemoteApp::new(client(&server.uri()));
        for _ in 0..2 {
            let outcome = remote
                .reconcile_version(&session(), &app(), Platform::Ios, "2.0")
                .await
                .unwrap();
            assert!(!outcome.created);
        }
    }

    #[tokio::test]
    async fn test_reconcile_renames_editable_version() {
        let server = MockServer::start().await;
        mount_editable(
            &server,
            serde_json::json!([{ "id": "v1", "attributes": { "versionString": "1.9" } }]),
        )
        .await;
        Mock::given(method("PATCH"))
            .and(path("/appStoreVersions/v1"))
            .and(body_partial_json(serde_json::json!({
                "data": { "attributes": { "versionString": "2.0" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let remote = ConnectRemoteApp::new(client(&server.uri()));
        let outcome = remote
            .reconcile_version(&session(), &app(), Platform::Ios, "2.0")
            .await
            .unwrap();
        assert!(outcome.created);
    }

    #[tokio::test]
    async fn test_reconcile_creates_missing_version() {
        let server = MockServer::start().await;
        mount_editable(&server, serde_json::json!([])).await;
        Mock::given(method("POST"))
            .and(path("/appStoreVersions"))
            .and(body_partial_json(serde_json::json!({
                "data": { "attributes": { "platform": "MAC_OS", "versionString": "3.1" } }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": { "id": "v2", "attributes": { "versionString": "3.1" } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let remote = ConnectRemoteApp::new(client(&server.uri()));
        let outcome = remote
            .reconcile_version(&session(), &app(), Platform::Osx, "3.1")
            .await
            .unwrap();
        assert!(outcome.created);
    }
}
