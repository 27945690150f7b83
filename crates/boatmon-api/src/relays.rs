// Relay endpoints: listing, on/off commands, and configuration.

use tracing::{debug, info};

use crate::client::BackendClient;
use crate::error::Error;
use crate::models::{RelayCommandResponse, RelayConfigUpdate, RelayListResponse, RelayRecord};

impl BackendClient {
    /// `GET /relays`
    pub async fn list_relays(&self) -> Result<Vec<RelayRecord>, Error> {
        let url = self.api_url(&["relays"])?;
        let body: RelayListResponse = self.get(url).await?;
        debug!(count = body.relays.len(), "listed relays");
        Ok(body.relays)
    }

    /// `POST /relays/{id}/on`
    pub async fn relay_on(&self, relay_id: &str) -> Result<Option<RelayRecord>, Error> {
        self.relay_command(relay_id, "on").await
    }

    /// `POST /relays/{id}/off`
    pub async fn relay_off(&self, relay_id: &str) -> Result<Option<RelayRecord>, Error> {
        self.relay_command(relay_id, "off").await
    }

    /// `PUT /relays/{id}`. Only the populated fields of `update` are sent.
    pub async fn update_relay(
        &self,
        relay_id: &str,
        update: &RelayConfigUpdate,
    ) -> Result<Option<RelayRecord>, Error> {
        let url = self.api_url(&["relays", relay_id])?;
        let body: RelayCommandResponse = self.put(url, update).await?;
        Self::check_success(relay_id, "configure", body)
    }

    async fn relay_command(
        &self,
        relay_id: &str,
        action: &'static str,
    ) -> Result<Option<RelayRecord>, Error> {
        let url = self.api_url(&["relays", relay_id, action])?;
        let body: RelayCommandResponse = self.post(url).await?;
        Self::check_success(relay_id, action, body)
    }

    fn check_success(
        relay_id: &str,
        action: &str,
        body: RelayCommandResponse,
    ) -> Result<Option<RelayRecord>, Error> {
        if !body.success {
            return Err(Error::Api {
                status: 200,
                message: format!("backend reported failure for {action} on {relay_id}"),
            });
        }
        info!(relay_id, action, "relay command accepted");
        Ok(body.relay)
    }
}
