//! Review submission

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

use super::client::{ConnectClient, Document, Resource};
use crate::error::Result;
use crate::traits::SubmissionService;
use crate::types::*;

/// Submits the editable version through `reviewSubmissions`
pub struct ConnectReviewSubmitter {
    client: Arc<ConnectClient>,
}

impl ConnectReviewSubmitter {
    pub fn new(client: Arc<ConnectClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SubmissionService for ConnectReviewSubmitter {
    #[instrument(skip(self, session, app), fields(app = %app.apple_id))]
    async fn submit(&self, session: &Session, app: &AppIdentity, platform: Platform) -> Result<()> {
        let version = self
            .client
            .require_editable_version(session, &app.apple_id, platform)
            .await?;

        let submission: Document<Resource<serde_json::Value>> = self
            .client
            .post(
                session,
                "/reviewSubmissions",
                serde_json::json!({
                    "data": {
                        "type": "reviewSubmissions",
                        "attributes": { "platform": platform.asc_name() },
                        "relationships": {
                            "app": { "data": { "type": "apps", "id": app.apple_id } }
                        }
                    }
                }),
            )
            .await?;
        let submission_id = submission.data.id;

        let _: serde_json::Value = self
            .client
            .post(
                session,
                "/reviewSubmissionItems",
                serde_json::json!({
                    "data": {
                        "type": "reviewSubmissionItems",
                        "relationships": {
                            "reviewSubmission": {
                                "data": { "type": "reviewSubmissions", "id": submission_id }
                            },
                            "appStoreVersion": {
                                "data": { "type": "appStoreVersions", "id": version.id }
                            }
                        }
                    }
                }),
            )
            .await?;

        self.client
            .patch(
                session,
                &format!("/reviewSubmissions/{}", submission_id),
                serde_json::json!({
                    "data": {
                        "type": "reviewSubmissions",
                        "id": submission_id,
                        "attributes": { "submitted": true }
                    }
                }),
            )
            .await?;

        info!(
            "Submitted version {} of {} for review",
            version.attributes.version_string, app.name
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::client::test_support::{client, session};
    use super::*;
    use crate::StoreError;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app() -> AppIdentity {
        AppIdentity {
            apple_id: "42".to_string(),
            bundle_id: "com.example.rocket".to_string(),
            name: "Rocket".to_string(),
        }
    }

    async fn mount_version(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/apps/42/appStoreVersions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "id": "v1", "attributes": { "versionString": "2.0" } }]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_submission_flow() {
        let server = MockServer::start().await;
        mount_version(&server).await;
        Mock::given(method("POST"))
            .and(path("/reviewSubmissions"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": { "id": "sub-1", "attributes": { "state": "READY_FOR_REVIEW" } }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/reviewSubmissionItems"))
            .and(body_partial_json(serde_json::json!({
                "data": { "relationships": { "appStoreVersion": { "data": { "id": "v1" } } } }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": { "id": "item-1" }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/reviewSubmissions/sub-1"))
            .and(body_partial_json(serde_json::json!({
                "data": { "attributes": { "submitted": true } }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        ConnectReviewSubmitter::new(client(&server.uri()))
            .submit(&session(), &app(), Platform::Ios)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rejected_submission_is_an_error() {
        let server = MockServer::start().await;
        mount_version(&server).await;
        Mock::given(method("POST"))
            .and(path("/reviewSubmissions"))
            .respond_with(ResponseTemplate::new(409).set_body_string("STATE_ERROR"))
            .mount(&server)
            .await;

        let err = ConnectReviewSubmitter::new(client(&server.uri()))
            .submit(&session(), &app(), Platform::Ios)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ApiError { status: 409, .. }));
    }
}
