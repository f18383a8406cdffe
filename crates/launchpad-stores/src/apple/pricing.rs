//! Price tier uploads via `appPriceSchedules`

use async_trait::async_trait;
use launchpad_metadata::MetadataBundle;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::client::ConnectClient;
use crate::error::Result;
use crate::traits::MetadataStageExecutor;
use crate::types::*;

/// Territory the price point is defined against
pub const BASE_TERRITORY: &str = "USA";

/// Replaces the app's price schedule with a single manual price
pub struct ConnectPriceTierUploader {
    client: Arc<ConnectClient>,
}

impl ConnectPriceTierUploader {
    pub fn new(client: Arc<ConnectClient>) -> Self {
        Self { client }
    }
}

fn price_schedule_body(app_id: &str, price_point: &str) -> serde_json::Value {
    // Inline resources are referenced by a local id
    let local_id = "${price-1}";
    serde_json::json!({
        "data": {
            "type": "appPriceSchedules",
            "relationships": {
                "app": { "data": { "type": "apps", "id": app_id } },
                "baseTerritory": { "data": { "type": "territories", "id": BASE_TERRITORY } },
                "manualPrices": { "data": [{ "type": "appPrices", "id": local_id }] }
            }
        },
        "included": [{
            "type": "appPrices",
            "id": local_id,
            "attributes": { "startDate": null },
            "relationships": {
                "appPricePoint": { "data": { "type": "appPricePoints", "id": price_point } }
            }
        }]
    })
}

#[async_trait]
impl MetadataStageExecutor for ConnectPriceTierUploader {
    #[instrument(skip_all, fields(app = %app.apple_id))]
    async fn run(
        &self,
        session: &Session,
        app: &AppIdentity,
        _platform: Platform,
        bundle: &MetadataBundle,
    ) -> Result<StageEffect> {
        let Some(price_point) = bundle.price_tier.as_deref() else {
            debug!("No price tier set, leaving pricing untouched");
            return Ok(StageEffect::Unchanged);
        };

        let _: serde_json::Value = self
            .client
            .post(session, "/appPriceSchedules", price_schedule_body(&app.apple_id, price_point))
            .await?;

        info!("Set price point {} for {}", price_point, app.name);
        Ok(StageEffect::Applied)
    }
}
