use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    alignment::DEFAULT_ALIGNMENT_THRESHOLD,
    geo::{Coordinate, Degrees},
    target::DEFAULT_TARGET_ID,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type)]
/// Where the compass points when the store has no record
pub struct DefaultTarget {
    pub latitude: Degrees,
    pub longitude: Degrees,
    pub address: String,
    pub maps_url: Option<String>,
}

impl DefaultTarget {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

impl Default for DefaultTarget {
    fn default() -> Self {
        Self {
            latitude: 12.308367,
            longitude: 76.645467,
            address: "Avadhoota Datta Peetham".to_string(),
            maps_url: Some("https://maps.google.com/?q=12.308367,76.645467".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type)]
/// Tunables for a compass session
pub struct SessionSettings {
    /// Max angle between heading and target bearing that still counts as aligned
    pub alignment_threshold_degrees: Degrees,
    /// Minimum time between two haptic pulses
    pub haptic_debounce_ms: u32,
    /// How often the target record is fetched again
    pub target_refresh_seconds: u32,
    /// Cadence requested from the heading provider
    pub heading_interval_ms: u32,
    /// Key of the target record in the store
    pub target_id: String,
    /// Used when the store has no record for `target_id`
    pub default_target: DefaultTarget,
}

impl SessionSettings {
    pub fn haptic_debounce(&self) -> Duration {
        Duration::from_millis(self.haptic_debounce_ms as u64)
    }

    pub fn target_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.target_refresh_seconds as u64)
    }

    pub fn heading_interval(&self) -> Duration {
        Duration::from_millis(self.heading_interval_ms as u64)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            alignment_threshold_degrees: DEFAULT_ALIGNMENT_THRESHOLD,
            haptic_debounce_ms: 2000,
            target_refresh_seconds: 30,
            heading_interval_ms: 100,
            target_id: DEFAULT_TARGET_ID.to_string(),
            default_target: DefaultTarget::default(),
        }
    }
}
