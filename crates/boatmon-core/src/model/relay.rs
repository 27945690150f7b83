// ── Relay domain type ──

use serde::{Deserialize, Serialize};

use boatmon_api::{RelayMode, RelayRecord};

/// Cached copy of a backend relay. The backend holds the authoritative state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayDevice {
    pub id: String,
    pub board_id: u32,
    pub relay_number: u32,
    pub name: String,
    pub enabled: bool,
    pub mode: RelayMode,
    pub state: bool,
    /// Only meaningful when `mode` is `flash`.
    pub flash_interval_seconds: Option<f64>,
    /// Only meaningful when `mode` is `timed`.
    pub timed_duration_seconds: Option<f64>,
}

impl From<RelayRecord> for RelayDevice {
    fn from(r: RelayRecord) -> Self {
        Self {
            id: r.id,
            board_id: r.board_id,
            relay_number: r.relay_number,
            name: r.name,
            enabled: r.enabled,
            mode: r.mode,
            state: r.state,
            flash_interval_seconds: r.flash_interval_seconds,
            timed_duration_seconds: r.timed_duration_seconds,
        }
    }
}

impl RelayDevice {
    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}
