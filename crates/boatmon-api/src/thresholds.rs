// Threshold endpoints: read is public, mutations need the settings password.

use tracing::info;

use crate::client::BackendClient;
use crate::error::Error;
use crate::models::{ThresholdSet, ThresholdsBody};

impl BackendClient {
    /// `GET /thresholds`
    pub async fn get_thresholds(&self) -> Result<ThresholdSet, Error> {
        let url = self.api_url(&["thresholds"])?;
        let body: ThresholdsBody = self.get(url).await?;
        Ok(body.into_inner())
    }

    /// `PUT /thresholds`, returning the set the backend stored.
    pub async fn update_thresholds(&self, thresholds: &ThresholdSet) -> Result<ThresholdSet, Error> {
        let url = self.api_url(&["thresholds"])?;
        let body: ThresholdsBody = self
            .send_protected(reqwest::Method::PUT, url, Some(thresholds), "PUT /thresholds")
            .await?;
        let stored = body.into_inner();
        info!(?stored, "thresholds updated");
        Ok(stored)
    }

    /// `POST /thresholds/reset`, returning the defaults now in force.
    pub async fn reset_thresholds(&self) -> Result<ThresholdSet, Error> {
        let url = self.api_url(&["thresholds", "reset"])?;
        let body: ThresholdsBody = self
            .send_protected(
                reqwest::Method::POST,
                url,
                None::<&()>,
                "POST /thresholds/reset",
            )
            .await?;
        info!("thresholds reset to backend defaults");
        Ok(body.into_inner())
    }
}
