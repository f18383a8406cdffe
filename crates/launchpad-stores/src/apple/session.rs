//! API key sessions

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::client::ConnectClient;
use crate::error::{Result, StoreError};
use crate::traits::SessionProvider;
use crate::types::Session;

/// Opens sessions by signing a token with the configured API key and
/// checking it against the API once.
pub struct ConnectSessionProvider {
    client: Arc<ConnectClient>,
}

impl ConnectSessionProvider {
    pub fn new(client: Arc<ConnectClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SessionProvider for ConnectSessionProvider {
    #[instrument(skip(self))]
    async fn login(&self, account: &str) -> Result<Session> {
        if account != self.client.config().key_id {
            return Err(StoreError::InvalidCredentials(format!(
                "no API key configured for account '{}'",
                account
            )));
        }

        let (token, expires_at) = self.client.mint_token().await?;

        // Any authenticated request proves the key; one app is enough
        let _: serde_json::Value = self
            .client
            .get_with_token(&token, "/apps", &[("limit", "1")])
            .await
            .map_err(|e| match e {
                StoreError::ApiError { status, message } => StoreError::AuthenticationFailed(
                    format!("token check failed with status {}: {}", status, message),
                ),
                other => other,
            })?;

        info!("Authenticated with App Store Connect as {}", account);
        Ok(Session::new(account, token, expires_at))
    }

    async fn select_context(&self, session: &mut Session, team_id: Option<&str>) -> Result<()> {
        match team_id {
            Some(team) => {
                info!("Using team {}", team);
                session.set_context(Some(team.to_string()));
            }
            None => debug!("No team selected, using the API key's team"),
        }
        Ok(())
    }
}
