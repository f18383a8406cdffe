//! App Store Connect API client
//!
//! Thin JSON:API wrapper shared by every App Store Connect collaborator.
//! Requests authenticate with the bearer token carried by a [`Session`];
//! only [`ConnectClient::mint_token`] touches the API key itself.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::types::{Platform, Session};

/// Production API root
pub const API_BASE_URL: &str = "https://api.appstoreconnect.apple.com/v1";

/// App Store states in which a version can still be edited
pub const EDITABLE_VERSION_STATES: &[&str] = &[
    "PREPARE_FOR_SUBMISSION",
    "DEVELOPER_REJECTED",
    "REJECTED",
    "METADATA_REJECTED",
    "INVALID_BINARY",
];

const TOKEN_LIFETIME_MINUTES: i64 = 20;

/// JWT claims for App Store Connect API
#[derive(Debug, Serialize)]
struct Claims {
    iss: String,
    iat: i64,
    exp: i64,
    aud: String,
}

/// API key credentials
#[derive(Clone)]
pub struct AppStoreConnectConfig {
    /// API key id (also the account identifier of a session)
    pub key_id: String,
    /// Issuer id
    pub issuer_id: String,
    /// PEM contents of the `.p8` key, or a path to it
    pub private_key: String,
    /// API root, overridable for tests
    pub base_url: String,
}

impl AppStoreConnectConfig {
    pub fn new(
        key_id: impl Into<String>,
        issuer_id: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            issuer_id: issuer_id.into(),
            private_key: private_key.into(),
            base_url: API_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn key_pem(&self) -> Result<String> {
        if tokio::fs::metadata(&self.private_key)
            .await
            .is_ok_and(|meta| meta.is_file())
        {
            tokio::fs::read_to_string(&self.private_key)
                .await
                .map_err(|e| StoreError::ConfigurationError(format!("Failed to read API key: {}", e)))
        } else {
            Ok(self.private_key.clone())
        }
    }
}

impl std::fmt::Debug for AppStoreConnectConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppStoreConnectConfig")
            .field("key_id", &self.key_id)
            .field("issuer_id", &self.issuer_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// JSON:API top-level document
#[derive(Debug, Deserialize)]
pub struct Document<T> {
    pub data: T,
}

/// JSON:API resource object
#[derive(Debug, Deserialize)]
pub struct Resource<A> {
    pub id: String,
    pub attributes: A,
}

/// Attributes of an `appStoreVersions` resource
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionAttributes {
    pub version_string: String,
    #[serde(default)]
    pub app_store_state: Option<String>,
}

/// Attributes of a localization resource (version or app info)
#[derive(Debug, Clone, Deserialize)]
pub struct LocalizationAttributes {
    pub locale: String,
}

/// HTTP client for the App Store Connect API
pub struct ConnectClient {
    config: AppStoreConnectConfig,
    http: Client,
}

impl ConnectClient {
    pub fn new(config: AppStoreConnectConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    pub fn config(&self) -> &AppStoreConnectConfig {
        &self.config
    }

    /// Sign a fresh ES256 token with the configured API key
    pub async fn mint_token(&self) -> Result<(String, DateTime<Utc>)> {
        let now = Utc::now();
        let expires_at = now + Duration::minutes(TOKEN_LIFETIME_MINUTES);

        let claims = Claims {
            iss: self.config.issuer_id.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            aud: "appstoreconnect-v1".to_string(),
        };

        let encoding_key = EncodingKey::from_ec_pem(self.config.key_pem().await?.as_bytes())
            .map_err(|e| StoreError::InvalidCredentials(format!("Invalid API key: {}", e)))?;

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.config.key_id.clone());

        let token = encode(&header, &claims, &encoding_key)?;
        Ok((token, expires_at))
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url, endpoint)
    }

    /// Map non-success responses onto store errors
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let message = response.text().await.unwrap_or_default();

        Err(match status.as_u16() {
            401 | 403 => StoreError::AuthenticationFailed(message),
            429 => StoreError::RateLimited { retry_after },
            code => StoreError::ApiError {
                status: code,
                message,
            },
        })
    }

    async fn send(
        &self,
        token: &str,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        body: Option<serde_json::Value>,
    ) -> Result<Response> {
        let url = self.url(endpoint);
        debug!("API request: {} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .header("Authorization", format!("Bearer {}", token));

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        Self::check(request.send().await?).await
    }

    /// GET with an explicit token, used before a session exists
    pub(crate) async fn get_with_token<T: DeserializeOwned>(
        &self,
        token: &str,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self.send(token, Method::GET, endpoint, query, None).await?;
        Ok(response.json().await?)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        session: &Session,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        self.get_with_token(session.bearer()?, endpoint, query).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        session: &Session,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let response = self
            .send(session.bearer()?, Method::POST, endpoint, &[], Some(body))
            .await?;
        Ok(response.json().await?)
    }

    /// PATCH a resource, ignoring the response body
    pub async fn patch(&self, session: &Session, endpoint: &str, body: serde_json::Value) -> Result<()> {
        self.send(session.bearer()?, Method::PATCH, endpoint, &[], Some(body))
            .await?;
        Ok(())
    }

    pub async fn delete(&self, session: &Session, endpoint: &str) -> Result<()> {
        self.send(session.bearer()?, Method::DELETE, endpoint, &[], None)
            .await?;
        Ok(())
    }

    /// Send one part of a reserved upload.
    ///
    /// Upload operation URLs are pre-signed, so no bearer token is attached.
    pub async fn upload_part(
        &self,
        method: &str,
        url: &str,
        headers: &[(String, String)],
        bytes: Vec<u8>,
    ) -> Result<()> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| StoreError::UploadFailed(format!("invalid upload method: {}", e)))?;
        debug!("Upload part: {} {} ({} bytes)", method, url, bytes.len());

        let mut request = self.http.request(method, url).body(bytes);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(StoreError::UploadFailed(format!(
                "upload part rejected with status {}",
                response.status().as_u16()
            )));
        }
        Ok(())
    }

    /// The version of `app_id` that can still be edited on `platform`, if any
    pub async fn editable_version(
        &self,
        session: &Session,
        app_id: &str,
        platform: Platform,
    ) -> Result<Option<Resource<VersionAttributes>>> {
        let states = EDITABLE_VERSION_STATES.join(",");
        let response: Document<Vec<Resource<VersionAttributes>>> = self
            .get(
                session,
                &format!("/apps/{}/appStoreVersions", app_id),
                &[
                    ("filter[platform]", platform.asc_name()),
                    ("filter[appStoreState]", states.as_str()),
                    ("limit", "1"),
                ],
            )
            .await?;
        Ok(response.data.into_iter().next())
    }

    /// Like [`editable_version`](Self::editable_version) but absence is an error
    pub async fn require_editable_version(
        &self,
        session: &Session,
        app_id: &str,
        platform: Platform,
    ) -> Result<Resource<VersionAttributes>> {
        self.editable_version(session, app_id, platform)
            .await?
            .ok_or_else(|| StoreError::NoEditableVersion(app_id.to_string()))
    }

    /// Localizations of an App Store version
    pub async fn version_localizations(
        &self,
        session: &Session,
        version_id: &str,
    ) -> Result<Vec<Resource<LocalizationAttributes>>> {
        let response: Document<Vec<Resource<LocalizationAttributes>>> = self
            .get(
                session,
                &format!("/appStoreVersions/{}/appStoreVersionLocalizations", version_id),
                &[("limit", "200")],
            )
            .await?;
        Ok(response.data)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_mint_token_uses_key_id_header() {
        let client = client("http://localhost");
        let (token, expires_at) = client.mint_token().await.unwrap();

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::ES256);
        assert_eq!(header.kid.as_deref(), Some("KEY123"));
        assert!(expires_at > Utc::now() + Duration::minutes(19));
    }

    #[tokio::test]
    async fn test_invalid_key_is_invalid_credentials() {
        let client = ConnectClient::new(AppStoreConnectConfig::new("KEY", "issuer", "not a key"));
        assert!(matches!(
            client.mint_token().await,
            Err(StoreError::InvalidCredentials(_))
        ));
    }

    #[tokio::test]
    async fn test_mint_token_reads_key_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let key_path = temp.path().join("AuthKey_KEY123.p8");
        std::fs::write(&key_path, TEST_PRIVATE_KEY).unwrap();

        let client = ConnectClient::new(AppStoreConnectConfig::new(
            "KEY123",
            "issuer-1",
            key_path.to_string_lossy(),
        ));
        let (token, _) = client.mint_token().await.unwrap();
        assert_eq!(
            jsonwebtoken::decode_header(&token).unwrap().kid.as_deref(),
            Some("KEY123")
        );
    }

    #[test]
    fn test_config_debug_hides_key() {
        let config = AppStoreConnectConfig::new("KEY", "issuer", TEST_PRIVATE_KEY);
        assert!(!format!("{:?}", config).contains("PRIVATE KEY"));
    }

    #[tokio::test]
    async fn test_editable_version_filters_by_platform_and_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apps/42/appStoreVersions"))
            .and(query_param("filter[platform]", "IOS"))
            .and(query_param("filter[appStoreState]", EDITABLE_VERSION_STATES.join(",")))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{
                    "id": "ver-1",
                    "attributes": { "versionString": "1.2.0", "appStoreState": "PREPARE_FOR_SUBMISSION" }
                }]
            })))
            .mount(&server)
            .await;

        let version = client(&server.uri())
            .editable_version(&session(), "42", Platform::Ios)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(version.id, "ver-1");
        assert_eq!(version.attributes.version_string, "1.2.0");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apps/unauthorized"))
            .respond_with(ResponseTemplate::new(401).set_body_string("NOT_AUTHORIZED"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/apps/busy"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/apps/broken"))
            .respond_with(ResponseTemplate::new(409).set_body_string("ENTITY_ERROR"))
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let session = session();

        let err = client
            .get::<serde_json::Value>(&session, "/apps/unauthorized", &[])
            .await
            .unwrap_err();
        assert!(err.is_auth());

        let err = client
            .get::<serde_json::Value>(&session, "/apps/busy", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::RateLimited { retry_after: Some(30) }));

        let err = client
            .get::<serde_json::Value>(&session, "/apps/broken", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ApiError { status: 409, .. }));
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_before_sending() {
        let server = MockServer::start().await;
        let expired = Session::new("KEY123", "t", Utc::now() - Duration::minutes(1));

        let err = client(&server.uri())
            .get::<serde_json::Value>(&expired, "/apps", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::AuthenticationFailed(_)));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }
}
