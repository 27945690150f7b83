// Calibration endpoints. Both directions are settings-protected.

use crate::client::BackendClient;
use crate::error::Error;
use crate::models::{Calibration, CalibrationBody};

impl BackendClient {
    /// `GET /calibration`
    pub async fn get_calibration(&self) -> Result<Calibration, Error> {
        let url = self.api_url(&["calibration"])?;
        let body: CalibrationBody = self
            .send_protected(reqwest::Method::GET, url, None::<&()>, "GET /calibration")
            .await?;
        Ok(body.into_inner())
    }

    /// `PUT /calibration`. The backend replaces the whole table.
    pub async fn update_calibration(&self, calibration: &Calibration) -> Result<Calibration, Error> {
        let url = self.api_url(&["calibration"])?;
        let body: CalibrationBody = self
            .send_protected(
                reqwest::Method::PUT,
                url,
                Some(calibration),
                "PUT /calibration",
            )
            .await?;
        Ok(body.into_inner())
    }
}
